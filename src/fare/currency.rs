use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{unsupported_currency_error, Error};

/// The FX capability the fare engine depends on. A static table satisfies it;
/// so does a snapshot refreshed from a live provider (see
/// `external::exchange_rates`).
pub trait RateSource: Send + Sync {
    /// Units of `to` per one unit of `from`.
    fn rate(&self, from: &str, to: &str) -> Result<f64, Error>;
}

/// A bidirectional rate table pivoted on USD: each entry is how many units of
/// the currency one USD buys.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateTable {
    rates: HashMap<String, f64>,
}

impl RateTable {
    pub fn new(rates: HashMap<String, f64>) -> Self {
        Self { rates }
    }

    pub fn supports(&self, code: &str) -> bool {
        self.rates.contains_key(code)
    }

    fn per_usd(&self, from: &str, to: &str, code: &str) -> Result<f64, Error> {
        match self.rates.get(code) {
            Some(rate) if *rate > 0.0 => Ok(*rate),
            _ => Err(unsupported_currency_error(from, to)),
        }
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::new(HashMap::from([
            ("USD".into(), 1.0),
            ("EUR".into(), 0.85),
            ("GBP".into(), 0.73),
            ("INR".into(), 83.0),
        ]))
    }
}

impl RateSource for RateTable {
    fn rate(&self, from: &str, to: &str) -> Result<f64, Error> {
        if from == to {
            return Ok(1.0);
        }

        let from_rate = self.per_usd(from, to, from)?;
        let to_rate = self.per_usd(from, to, to)?;

        Ok(to_rate / from_rate)
    }
}

/// Convert an amount between currencies. Identity when the codes match; fails
/// with a typed error when the source has no path between them.
pub fn convert(rates: &dyn RateSource, amount: f64, from: &str, to: &str) -> Result<f64, Error> {
    if from == to {
        return Ok(amount);
    }

    Ok(amount * rates.rate(from, to)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error;

    #[test]
    fn identity_conversion() {
        let table = RateTable::default();
        let converted = convert(&table, 12.34, "USD", "USD").unwrap();
        assert_eq!(converted, 12.34);
    }

    #[test]
    fn round_trips_within_tolerance() {
        let table = RateTable::default();

        for code in ["EUR", "GBP", "INR"] {
            let there = convert(&table, 100.0, "USD", code).unwrap();
            let back = convert(&table, there, code, "USD").unwrap();
            assert!((back - 100.0).abs() < 1e-9, "{} round trip drifted", code);
        }
    }

    #[test]
    fn cross_rates_pivot_through_usd() {
        let table = RateTable::default();
        let eur_to_inr = convert(&table, 1.0, "EUR", "INR").unwrap();
        assert!((eur_to_inr - 83.0 / 0.85).abs() < 1e-9);
    }

    #[test]
    fn unknown_code_fails_typed() {
        let table = RateTable::default();
        let err = convert(&table, 1.0, "USD", "XYZ").unwrap_err();
        assert_eq!(err.code, error::UNSUPPORTED_CURRENCY);

        let err = convert(&table, 1.0, "XYZ", "USD").unwrap_err();
        assert_eq!(err.code, error::UNSUPPORTED_CURRENCY);
    }
}
