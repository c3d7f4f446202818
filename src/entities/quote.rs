use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Coordinate, VehicleClass};

/// A priced fare estimate. Immutable once produced: re-quoting mints a new
/// token, it never mutates an existing quote.
///
/// The breakdown is kept in engine-canonical USD regardless of the display
/// currency so it stays diagnostically meaningful; only `final_fare` and
/// `currency` reflect the requested currency.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FareQuote {
    pub token: Uuid,
    pub pickup: Coordinate,
    pub dropoff: Coordinate,
    pub vehicle_class: VehicleClass,
    pub distance_km: f64,
    pub duration_min: f64,
    pub base_fare: f64,
    pub surge_multiplier: f64,
    pub final_fare: f64,
    pub currency: String,
    pub breakdown: FareBreakdown,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FareBreakdown {
    pub base_charge: f64,
    pub distance_charge: f64,
    pub time_charge: f64,
    pub surge_charge: f64,
}
