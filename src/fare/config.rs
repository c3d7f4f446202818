use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entities::{VehicleClass, VehiclePricing};
use crate::error::Error;

/// A time-of-day window during which a fixed multiplier applies on top of
/// demand surge. Hours are 24h; the end hour is exclusive.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PeakWindow {
    pub start_hour: u32,
    pub end_hour: u32,
    pub multiplier: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SurgeThreshold {
    pub min_ratio: f64,
    pub multiplier: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SurgePolicy {
    pub thresholds: Vec<SurgeThreshold>,
    pub no_driver_multiplier: f64,
    pub cap: f64,
}

impl SurgePolicy {
    /// Demand-ratio component of the surge multiplier: the strongest
    /// threshold the ratio satisfies, 1.0 when none match.
    pub fn demand_multiplier(&self, ratio: f64) -> f64 {
        self.thresholds
            .iter()
            .filter(|threshold| ratio >= threshold.min_ratio)
            .map(|threshold| threshold.multiplier)
            .fold(1.0, f64::max)
    }
}

impl Default for SurgePolicy {
    fn default() -> Self {
        Self {
            thresholds: vec![
                SurgeThreshold {
                    min_ratio: 2.0,
                    multiplier: 2.0,
                },
                SurgeThreshold {
                    min_ratio: 1.5,
                    multiplier: 1.75,
                },
                SurgeThreshold {
                    min_ratio: 1.0,
                    multiplier: 1.5,
                },
            ],
            no_driver_multiplier: 2.0,
            cap: 3.0,
        }
    }
}

/// Pricing knobs for the fare engine. Injected at construction so alternative
/// policies can be exercised without touching fare math.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PricingConfig {
    pub vehicles: HashMap<VehicleClass, VehiclePricing>,
    pub peak_windows: Vec<PeakWindow>,
    pub surge: SurgePolicy,
    pub average_speed_kmh: f64,
}

impl PricingConfig {
    pub fn pricing(&self, class: VehicleClass) -> Result<&VehiclePricing, Error> {
        self.vehicles
            .get(&class)
            .ok_or_else(|| crate::error::unknown_vehicle_class_error(&class.name()))
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        let vehicles = HashMap::from([
            (
                VehicleClass::Standard,
                VehiclePricing {
                    base_fare: 5.00,
                    per_km_rate: 2.50,
                    per_minute_rate: 0.50,
                    minimum_fare: 10.00,
                },
            ),
            (
                VehicleClass::Suv,
                VehiclePricing {
                    base_fare: 7.00,
                    per_km_rate: 3.50,
                    per_minute_rate: 0.75,
                    minimum_fare: 15.00,
                },
            ),
            (
                VehicleClass::Luxury,
                VehiclePricing {
                    base_fare: 10.00,
                    per_km_rate: 5.00,
                    per_minute_rate: 1.00,
                    minimum_fare: 20.00,
                },
            ),
            (
                VehicleClass::Van,
                VehiclePricing {
                    base_fare: 8.00,
                    per_km_rate: 4.00,
                    per_minute_rate: 0.85,
                    minimum_fare: 18.00,
                },
            ),
            (
                VehicleClass::Sedan,
                VehiclePricing {
                    base_fare: 6.00,
                    per_km_rate: 3.00,
                    per_minute_rate: 0.60,
                    minimum_fare: 12.00,
                },
            ),
            (
                VehicleClass::Electric,
                VehiclePricing {
                    base_fare: 6.50,
                    per_km_rate: 2.75,
                    per_minute_rate: 0.55,
                    minimum_fare: 12.00,
                },
            ),
        ]);

        Self {
            vehicles,
            peak_windows: vec![
                // morning peak
                PeakWindow {
                    start_hour: 7,
                    end_hour: 9,
                    multiplier: 1.3,
                },
                // evening peak
                PeakWindow {
                    start_hour: 17,
                    end_hour: 19,
                    multiplier: 1.3,
                },
            ],
            surge: SurgePolicy::default(),
            average_speed_kmh: 30.0,
        }
    }
}
