use std::sync::Arc;

use ridelink::dispatch::{LogNotifier, LogPaymentGateway};
use ridelink::engine::{DemandGauge, Engine};
use ridelink::external::exchange_rates;
use ridelink::fare::{FareEngine, PricingConfig, RateTable};
use ridelink::simulation::Simulation;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let rates = match exchange_rates::fetch_rate_table().await {
        Ok(table) => table,
        Err(err) => {
            tracing::warn!(code = err.code, "falling back to static exchange rates");
            RateTable::default()
        }
    };

    let fare = FareEngine::new(PricingConfig::default(), Box::new(rates));

    let demand = Arc::new(DemandGauge::new());
    let engine = Arc::new(Engine::in_memory(
        fare,
        demand.clone(),
        Arc::new(LogNotifier),
        Arc::new(LogPaymentGateway),
    ));

    Simulation::new(engine, demand, 50, 10).run().await;
}
