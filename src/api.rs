use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::Actor;
use crate::entities::{FareQuote, PaymentMethod, Ride, StatusUpdate};
use crate::error::Error;
use crate::fare::QuoteRequest;

#[async_trait]
pub trait QuoteAPI {
    async fn create_quote(&self, actor: Actor, request: QuoteRequest) -> Result<FareQuote, Error>;
    async fn find_quote(&self, actor: Actor, token: Uuid) -> Result<FareQuote, Error>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateRideParams {
    pub quote_token: Uuid,
    pub payment_method: PaymentMethod,
}

#[async_trait]
pub trait RideAPI {
    async fn create_ride(&self, actor: Actor, params: CreateRideParams) -> Result<Ride, Error>;
    async fn find_ride(&self, actor: Actor, id: Uuid) -> Result<Ride, Error>;
    async fn update_ride_status(
        &self,
        actor: Actor,
        id: Uuid,
        update: StatusUpdate,
    ) -> Result<Ride, Error>;
    async fn list_active_rides(&self, actor: Actor) -> Result<Vec<Ride>, Error>;
}

pub trait API: QuoteAPI + RideAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
