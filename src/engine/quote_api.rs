use super::Engine;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    api::QuoteAPI, auth::Actor, entities::FareQuote, error::Error, fare::QuoteRequest,
};

#[async_trait]
impl QuoteAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn create_quote(&self, _actor: Actor, request: QuoteRequest) -> Result<FareQuote, Error> {
        let demand = self.demand.snapshot();

        tracing::info!(
            active_rides = demand.active_rides,
            available_drivers = demand.available_drivers,
            "pricing quote under current demand"
        );

        let quote = self.fare.quote(&request, demand, Utc::now())?;

        self.quotes.insert_quote(&quote).await?;

        Ok(quote)
    }

    #[tracing::instrument(skip(self))]
    async fn find_quote(&self, _actor: Actor, token: Uuid) -> Result<FareQuote, Error> {
        self.quotes.fetch_quote(token).await
    }
}
