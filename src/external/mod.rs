pub mod exchange_rates;
