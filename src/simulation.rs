use async_channel::{Receiver, Sender};
use rand_distr::{Binomial, Distribution, Normal, Uniform};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{CreateRideParams, QuoteAPI, RideAPI};
use crate::auth::Actor;
use crate::engine::{DemandGauge, Engine};
use crate::entities::{Coordinate, PaymentMethod, RideStatus, StatusUpdate, VehicleClass};
use crate::error::Error;
use crate::fare::QuoteRequest;

// downtown San Francisco
const CITY_CENTER: (f64, f64) = (37.7749, -122.4194);

fn handle_invocation_error<T>(result: Result<T, Error>) {
    match result {
        Ok(_) => {}
        Err(err) => {
            if err.code < 100 {
                panic!("unexpected error: {:?}", err);
            }

            tracing::warn!(code = err.code, "rejected invocation: {}", err.message);
        }
    }
}

fn sample_binomial(n: u64, p: f64) -> u64 {
    let bin = Binomial::new(n, p).unwrap();
    bin.sample(&mut rand::thread_rng())
}

fn sample_coordinate() -> Coordinate {
    let mut rng = rand::thread_rng();
    let lat_dist = Normal::new(CITY_CENTER.0, 0.02).unwrap();
    let lng_dist = Normal::new(CITY_CENTER.1, 0.02).unwrap();

    Coordinate::new(lat_dist.sample(&mut rng), lng_dist.sample(&mut rng)).unwrap()
}

fn sample_vehicle_class() -> VehicleClass {
    let die = Uniform::from(0..VehicleClass::ALL.len());
    VehicleClass::ALL[die.sample(&mut rand::thread_rng())]
}

/// Drives a fleet of simulated riders and drivers through the engine: riders
/// quote and book, drivers accept, start, and complete, and the shared demand
/// gauge feeds surge pricing the whole time.
pub struct Simulation {
    engine: Arc<Engine>,
    demand: Arc<DemandGauge>,
    riders: u32,
    drivers: u32,
}

impl Simulation {
    pub fn new(engine: Arc<Engine>, demand: Arc<DemandGauge>, riders: u32, drivers: u32) -> Self {
        Self {
            engine,
            demand,
            riders,
            drivers,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn run(&self) {
        self.demand.set_available_drivers(self.drivers);

        let (tx, rx): (Sender<Uuid>, Receiver<Uuid>) = async_channel::unbounded();

        let mut handles = vec![];

        for _ in 0..self.drivers {
            let engine = self.engine.clone();
            let demand = self.demand.clone();
            let rx = rx.clone();

            handles.push(tokio::spawn(async move {
                drive(engine, demand, rx).await;
            }));
        }

        for _ in 0..self.riders {
            let engine = self.engine.clone();
            let demand = self.demand.clone();
            let tx = tx.clone();

            handles.push(tokio::spawn(async move {
                request_ride(engine, demand, tx).await;
            }));
        }

        // rider tasks hold the only remaining senders; once they are done the
        // channel closes and the driver loops drain out
        drop(tx);

        futures::future::join_all(handles).await;

        tracing::info!("simulation complete");
    }
}

#[tracing::instrument(skip_all)]
async fn request_ride(engine: Arc<Engine>, demand: Arc<DemandGauge>, tx: Sender<Uuid>) {
    let rider = Actor::rider(Uuid::new_v4());

    let request = QuoteRequest {
        pickup: sample_coordinate(),
        dropoff: sample_coordinate(),
        vehicle_class: sample_vehicle_class(),
        currency: "USD".into(),
        event_multiplier: 1.0,
    };

    let quote = match engine.create_quote(rider, request).await {
        Ok(quote) => quote,
        Err(err) => {
            tracing::warn!(code = err.code, "failed to get quote: {}", err.message);
            return;
        }
    };

    tracing::info!(
        fare = quote.final_fare,
        surge = quote.surge_multiplier,
        distance_km = quote.distance_km,
        "received quote"
    );

    let params = CreateRideParams {
        quote_token: quote.token,
        payment_method: PaymentMethod::Card,
    };

    let ride = match engine.create_ride(rider, params).await {
        Ok(ride) => ride,
        Err(err) => {
            tracing::warn!(code = err.code, "failed to book ride: {}", err.message);
            return;
        }
    };

    demand.ride_opened();

    // some riders bail before a driver shows up
    if sample_binomial(1, 0.1) > 0 {
        let update = StatusUpdate {
            status: RideStatus::Cancelled,
            cancellation_reason: Some("changed my mind".into()),
        };

        handle_invocation_error(engine.update_ride_status(rider, ride.id, update).await);
        demand.ride_closed();
        return;
    }

    tx.send(ride.id).await.unwrap();
}

#[tracing::instrument(skip_all)]
async fn drive(engine: Arc<Engine>, demand: Arc<DemandGauge>, rx: Receiver<Uuid>) {
    let driver = Actor::driver(Uuid::new_v4());

    while let Ok(ride_id) = rx.recv().await {
        demand.driver_busy();

        let accept = StatusUpdate {
            status: RideStatus::Accepted,
            cancellation_reason: None,
        };

        let result = engine.update_ride_status(driver, ride_id, accept).await;

        if result.is_err() {
            // the rider may have cancelled first
            handle_invocation_error(result);
            demand.driver_free();
            continue;
        }

        if sample_binomial(1, 0.95) > 0 {
            let start = StatusUpdate {
                status: RideStatus::Started,
                cancellation_reason: None,
            };
            handle_invocation_error(engine.update_ride_status(driver, ride_id, start).await);

            tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

            let complete = StatusUpdate {
                status: RideStatus::Completed,
                cancellation_reason: None,
            };
            handle_invocation_error(engine.update_ride_status(driver, ride_id, complete).await);
        } else {
            let cancel = StatusUpdate {
                status: RideStatus::Cancelled,
                cancellation_reason: Some("passenger did not show up".into()),
            };
            handle_invocation_error(engine.update_ride_status(driver, ride_id, cancel).await);
        }

        demand.ride_closed();
        demand.driver_free();
    }
}
