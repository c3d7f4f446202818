use super::Engine;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    api::{CreateRideParams, QuoteAPI, RideAPI},
    auth::{Actor, Role},
    entities::{Ride, StatusUpdate},
    error::{unauthorized_error, Error},
    store::VersionedRide,
};

#[async_trait]
impl RideAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn create_ride(&self, actor: Actor, params: CreateRideParams) -> Result<Ride, Error> {
        if actor.role != Role::Rider {
            return Err(unauthorized_error());
        }

        let quote = self.find_quote(actor, params.quote_token).await?;
        let ride = Ride::new(actor.id, params.payment_method, quote);

        self.rides.insert_ride(&ride).await?;

        tracing::info!(ride_id = %ride.id, "ride created, dispatching creation effects");

        self.dispatcher.dispatch(ride.creation_effects()).await?;

        Ok(ride)
    }

    #[tracing::instrument(skip(self))]
    async fn find_ride(&self, actor: Actor, id: Uuid) -> Result<Ride, Error> {
        let VersionedRide { ride, .. } = self.rides.fetch_ride(id).await?;

        if !ride.is_party(&actor) {
            return Err(unauthorized_error());
        }

        Ok(ride)
    }

    #[tracing::instrument(skip(self))]
    async fn update_ride_status(
        &self,
        actor: Actor,
        id: Uuid,
        update: StatusUpdate,
    ) -> Result<Ride, Error> {
        let VersionedRide { ride, version } = self.rides.fetch_ride(id).await?;

        let transition = ride.request_transition(&update, &actor, Utc::now())?;

        if transition.ride.status == ride.status {
            tracing::info!("status already {}, nothing to apply", ride.status.name());
            return Ok(transition.ride);
        }

        // the version check serializes concurrent transitions per ride; a
        // loser gets a conflict and must re-read
        self.rides.update_ride(&transition.ride, version).await?;

        self.dispatcher.dispatch(transition.effects).await?;

        Ok(transition.ride)
    }

    #[tracing::instrument(skip(self))]
    async fn list_active_rides(&self, actor: Actor) -> Result<Vec<Ride>, Error> {
        let rides = self.rides.active_rides().await?;

        Ok(rides
            .into_iter()
            .filter(|ride| ride.is_party(&actor))
            .collect())
    }
}
