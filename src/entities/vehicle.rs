use serde::{Deserialize, Serialize};

use crate::error::{unknown_vehicle_class_error, Error};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleClass {
    Standard,
    Suv,
    Luxury,
    Van,
    Sedan,
    Electric,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 6] = [
        Self::Standard,
        Self::Suv,
        Self::Luxury,
        Self::Van,
        Self::Sedan,
        Self::Electric,
    ];

    pub fn name(&self) -> String {
        match self {
            Self::Standard => "standard".into(),
            Self::Suv => "suv".into(),
            Self::Luxury => "luxury".into(),
            Self::Van => "van".into(),
            Self::Sedan => "sedan".into(),
            Self::Electric => "electric".into(),
        }
    }

    pub fn parse(value: &str) -> Result<Self, Error> {
        match value {
            "standard" => Ok(Self::Standard),
            "suv" => Ok(Self::Suv),
            "luxury" => Ok(Self::Luxury),
            "van" => Ok(Self::Van),
            "sedan" => Ok(Self::Sedan),
            "electric" => Ok(Self::Electric),
            _ => Err(unknown_vehicle_class_error(value)),
        }
    }
}

/// Per-class pricing row. Lives in an injected [`PricingConfig`] table, not a
/// module-level constant.
///
/// [`PricingConfig`]: crate::fare::PricingConfig
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct VehiclePricing {
    pub base_fare: f64,
    pub per_km_rate: f64,
    pub per_minute_rate: f64,
    pub minimum_fare: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error;

    #[test]
    fn parse_round_trips_names() {
        for class in VehicleClass::ALL {
            assert_eq!(VehicleClass::parse(&class.name()).unwrap(), class);
        }
    }

    #[test]
    fn parse_rejects_unknown_classes() {
        let err = VehicleClass::parse("rickshaw").unwrap_err();
        assert_eq!(err.code, error::UNKNOWN_VEHICLE_CLASS);
    }
}
