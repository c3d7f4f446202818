mod quote_api;
mod ride_api;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::api::API;
use crate::dispatch::{Dispatcher, Notifier, PaymentGateway};
use crate::fare::{Demand, FareEngine};
use crate::store::{MemoryStore, QuoteStore, RideStore};

/// Marketplace pressure provider consulted at quote time.
pub trait DemandSource: Send + Sync {
    fn snapshot(&self) -> Demand;
}

/// Lock-free demand gauge for deployments that track the marketplace
/// themselves (the simulation keeps one current).
#[derive(Default)]
pub struct DemandGauge {
    active_rides: AtomicU32,
    available_drivers: AtomicU32,
}

impl DemandGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available_drivers(&self, count: u32) {
        self.available_drivers.store(count, Ordering::Relaxed);
    }

    pub fn ride_opened(&self) {
        self.active_rides.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ride_closed(&self) {
        let _ = self
            .active_rides
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                count.checked_sub(1)
            });
    }

    pub fn driver_busy(&self) {
        let _ =
            self.available_drivers
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                    count.checked_sub(1)
                });
    }

    pub fn driver_free(&self) {
        self.available_drivers.fetch_add(1, Ordering::Relaxed);
    }
}

impl DemandSource for DemandGauge {
    fn snapshot(&self) -> Demand {
        Demand {
            active_rides: self.active_rides.load(Ordering::Relaxed),
            available_drivers: self.available_drivers.load(Ordering::Relaxed),
        }
    }
}

/// The service core: fare engine, stores, demand signal, and the effect
/// dispatcher, behind the `API` traits. Transition decisions stay pure; this
/// layer supplies the ride's current state atomically and rejects stale
/// writes through the store's version check.
pub struct Engine {
    quotes: Arc<dyn QuoteStore>,
    rides: Arc<dyn RideStore>,
    fare: FareEngine,
    demand: Arc<dyn DemandSource>,
    dispatcher: Dispatcher,
}

impl Engine {
    pub fn new(
        fare: FareEngine,
        quotes: Arc<dyn QuoteStore>,
        rides: Arc<dyn RideStore>,
        demand: Arc<dyn DemandSource>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            quotes,
            rides,
            fare,
            demand,
            dispatcher,
        }
    }

    /// Engine over the in-memory store, for local runs and tests.
    pub fn in_memory(
        fare: FareEngine,
        demand: Arc<dyn DemandSource>,
        notifier: Arc<dyn Notifier>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());

        Self::new(
            fare,
            store.clone(),
            store,
            demand,
            Dispatcher::new(notifier, payments),
        )
    }
}

impl API for Engine {}
