use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::entities::{FareQuote, Ride};
use crate::error::{conflict_error, invalid_input_error, Error};

pub type Version = u64;

#[derive(Clone, Debug)]
pub struct VersionedRide {
    pub ride: Ride,
    pub version: Version,
}

/// Storage seam for rides. Implementations must make `update_ride` a
/// compare-and-swap on the version so that at most one transition per ride
/// wins at a time; stale writers observe a conflict and may re-read.
#[async_trait]
pub trait RideStore: Send + Sync {
    async fn insert_ride(&self, ride: &Ride) -> Result<(), Error>;
    async fn fetch_ride(&self, id: Uuid) -> Result<VersionedRide, Error>;
    async fn update_ride(&self, ride: &Ride, expected_version: Version) -> Result<Version, Error>;
    async fn active_rides(&self) -> Result<Vec<Ride>, Error>;
}

#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn insert_quote(&self, quote: &FareQuote) -> Result<(), Error>;
    async fn fetch_quote(&self, token: Uuid) -> Result<FareQuote, Error>;
}

#[derive(Default)]
pub struct MemoryStore {
    rides: RwLock<HashMap<Uuid, VersionedRide>>,
    quotes: RwLock<HashMap<Uuid, FareQuote>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RideStore for MemoryStore {
    #[tracing::instrument(skip(self, ride), fields(ride_id = %ride.id))]
    async fn insert_ride(&self, ride: &Ride) -> Result<(), Error> {
        let mut rides = self.rides.write().await;

        if rides.contains_key(&ride.id) {
            return Err(conflict_error());
        }

        rides.insert(
            ride.id,
            VersionedRide {
                ride: ride.clone(),
                version: 1,
            },
        );

        Ok(())
    }

    async fn fetch_ride(&self, id: Uuid) -> Result<VersionedRide, Error> {
        let rides = self.rides.read().await;

        rides.get(&id).cloned().ok_or_else(|| invalid_input_error())
    }

    #[tracing::instrument(skip(self, ride), fields(ride_id = %ride.id))]
    async fn update_ride(&self, ride: &Ride, expected_version: Version) -> Result<Version, Error> {
        let mut rides = self.rides.write().await;

        let current = rides.get_mut(&ride.id).ok_or_else(|| invalid_input_error())?;

        if current.version != expected_version {
            tracing::warn!(
                expected_version,
                current_version = current.version,
                "rejecting stale ride write"
            );
            return Err(conflict_error());
        }

        current.ride = ride.clone();
        current.version += 1;

        Ok(current.version)
    }

    async fn active_rides(&self) -> Result<Vec<Ride>, Error> {
        let rides = self.rides.read().await;

        Ok(rides
            .values()
            .filter(|versioned| versioned.ride.is_active())
            .map(|versioned| versioned.ride.clone())
            .collect())
    }
}

#[async_trait]
impl QuoteStore for MemoryStore {
    async fn insert_quote(&self, quote: &FareQuote) -> Result<(), Error> {
        let mut quotes = self.quotes.write().await;
        quotes.insert(quote.token, quote.clone());

        Ok(())
    }

    async fn fetch_quote(&self, token: Uuid) -> Result<FareQuote, Error> {
        let quotes = self.quotes.read().await;

        quotes
            .get(&token)
            .cloned()
            .ok_or_else(|| invalid_input_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{test_ride, RideStatus};
    use crate::error;

    #[tokio::test]
    async fn stale_version_loses() {
        let store = MemoryStore::new();
        let ride = test_ride(Uuid::new_v4());

        store.insert_ride(&ride).await.unwrap();

        let VersionedRide {
            ride: mut first,
            version,
        } = store.fetch_ride(ride.id).await.unwrap();
        assert_eq!(version, 1);

        first.status = RideStatus::Cancelled;
        let new_version = store.update_ride(&first, version).await.unwrap();
        assert_eq!(new_version, 2);

        // a second writer that read version 1 must not also win
        let mut second = ride.clone();
        second.status = RideStatus::Accepted;
        let err = store.update_ride(&second, version).await.unwrap_err();
        assert_eq!(err.code, error::CONFLICT);

        let stored = store.fetch_ride(ride.id).await.unwrap();
        assert_eq!(stored.ride.status, RideStatus::Cancelled);
    }

    #[tokio::test]
    async fn missing_ride_is_invalid_input() {
        let store = MemoryStore::new();

        let err = store.fetch_ride(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.code, error::INVALID_INPUT);
    }

    #[tokio::test]
    async fn active_rides_excludes_terminal() {
        let store = MemoryStore::new();

        let open = test_ride(Uuid::new_v4());
        store.insert_ride(&open).await.unwrap();

        let mut done = test_ride(Uuid::new_v4());
        done.status = RideStatus::Completed;
        store.insert_ride(&done).await.unwrap();

        let active = store.active_rides().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, open.id);
    }
}
