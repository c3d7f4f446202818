use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;

use crate::error::{invalid_input_error, upstream_error, Error};
use crate::fare::RateTable;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Response {
    result: String,
    conversion_rates: Option<HashMap<String, f64>>,
}

/// Fetch a fresh USD-pivot rate table from the configured FX provider.
///
/// The fare engine only consumes the returned snapshot; it performs no I/O of
/// its own, so refresh cadence and retry policy live with the caller.
#[tracing::instrument]
pub async fn fetch_rate_table() -> Result<RateTable, Error> {
    let api_base = env::var("EXCHANGE_RATE_API_BASE")?;
    let key = env::var("EXCHANGE_RATE_API_KEY")?;
    let url = format!("https://{}/v6/{}/latest/USD", api_base, key);

    let res = reqwest::Client::new().get(url).send().await?;

    let status_code = res.status().as_u16();

    if status_code >= 400 && status_code < 500 {
        return Err(invalid_input_error());
    } else if status_code != 200 {
        return Err(upstream_error());
    }

    let data: Response = res.json().await?;

    if data.result != "success" {
        return Err(upstream_error());
    }

    let rates = data.conversion_rates.ok_or_else(|| upstream_error())?;

    Ok(RateTable::new(rates))
}
