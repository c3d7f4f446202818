mod config;
mod currency;

pub use config::{PeakWindow, PricingConfig, SurgePolicy, SurgeThreshold};
pub use currency::{convert, RateSource, RateTable};

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Coordinate, FareBreakdown, FareQuote, VehicleClass};
use crate::error::Error;

/// Fares are computed in USD and converted to the requested display currency
/// as the last step.
pub const CANONICAL_CURRENCY: &str = "USD";

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates. Symmetric, zero for
/// identical points.
pub fn haversine_distance_km(origin: Coordinate, destination: Coordinate) -> f64 {
    let lat1 = origin.latitude().to_radians();
    let lat2 = destination.latitude().to_radians();
    let delta_lat = (destination.latitude() - origin.latitude()).to_radians();
    let delta_lon = (destination.longitude() - origin.longitude()).to_radians();

    let sin_dlat = (delta_lat * 0.5).sin();
    let sin_dlon = (delta_lon * 0.5).sin();
    let a = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Half-up rounding to whole cents.
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// A point-in-time snapshot of marketplace pressure.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Demand {
    pub active_rides: u32,
    pub available_drivers: u32,
}

impl Demand {
    /// Rides per available driver; `None` when no drivers are available.
    pub fn ratio(&self) -> Option<f64> {
        if self.available_drivers == 0 {
            return None;
        }

        Some(self.active_rides as f64 / self.available_drivers as f64)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub pickup: Coordinate,
    pub dropoff: Coordinate,
    pub vehicle_class: VehicleClass,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_event_multiplier")]
    pub event_multiplier: f64,
}

fn default_currency() -> String {
    CANONICAL_CURRENCY.into()
}

fn default_event_multiplier() -> f64 {
    1.0
}

/// Deterministic fare computation over an injected pricing policy and FX
/// capability. Stateless apart from configuration: safe to share across
/// callers, no I/O, the clock is always passed in.
pub struct FareEngine {
    config: PricingConfig,
    rates: Box<dyn RateSource>,
}

impl FareEngine {
    pub fn new(config: PricingConfig, rates: Box<dyn RateSource>) -> Self {
        Self { config, rates }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn estimate_distance_km(&self, origin: Coordinate, destination: Coordinate) -> f64 {
        haversine_distance_km(origin, destination)
    }

    pub fn estimate_duration_min(&self, distance_km: f64) -> f64 {
        distance_km / self.config.average_speed_kmh * 60.0
    }

    pub fn is_peak_hour(&self, now: DateTime<Utc>) -> bool {
        self.peak_multiplier(now).is_some()
    }

    fn peak_multiplier(&self, now: DateTime<Utc>) -> Option<f64> {
        let hour = now.hour();

        self.config
            .peak_windows
            .iter()
            .find(|window| hour >= window.start_hour && hour < window.end_hour)
            .map(|window| window.multiplier)
    }

    /// Demand-based surge multiplier, always within `[1.0, cap]`.
    ///
    /// No available drivers short-circuits to the configured no-driver
    /// multiplier; otherwise the demand ratio is mapped through the policy's
    /// threshold ladder, then scaled by the peak-hour and event multipliers.
    pub fn surge_multiplier(
        &self,
        demand: Demand,
        event_multiplier: f64,
        now: DateTime<Utc>,
    ) -> f64 {
        let policy = &self.config.surge;

        let ratio = match demand.ratio() {
            None => return policy.no_driver_multiplier.clamp(1.0, policy.cap),
            Some(ratio) => ratio,
        };

        let mut surge = policy.demand_multiplier(ratio);

        if let Some(peak) = self.peak_multiplier(now) {
            surge *= peak;
        }

        surge *= event_multiplier;

        surge.clamp(1.0, policy.cap)
    }

    /// Metered fare before surge, floored at the class minimum.
    pub fn base_fare(
        &self,
        distance_km: f64,
        duration_min: f64,
        class: VehicleClass,
    ) -> Result<f64, Error> {
        let pricing = self.config.pricing(class)?;
        let total = pricing.base_fare
            + distance_km * pricing.per_km_rate
            + duration_min * pricing.per_minute_rate;

        Ok(total.max(pricing.minimum_fare))
    }

    /// Produce a full quote: distance, duration, base fare, surge, rounding,
    /// currency conversion. The breakdown stays in USD regardless of the
    /// requested currency.
    #[tracing::instrument(skip(self))]
    pub fn quote(
        &self,
        request: &QuoteRequest,
        demand: Demand,
        now: DateTime<Utc>,
    ) -> Result<FareQuote, Error> {
        let pricing = *self.config.pricing(request.vehicle_class)?;

        let distance_km = self.estimate_distance_km(request.pickup, request.dropoff);
        let duration_min = self.estimate_duration_min(distance_km);
        let base_fare = self.base_fare(distance_km, duration_min, request.vehicle_class)?;
        let surge_multiplier = self.surge_multiplier(demand, request.event_multiplier, now);

        let final_usd = round_to_cents(base_fare * surge_multiplier);
        let final_fare = convert(
            self.rates.as_ref(),
            final_usd,
            CANONICAL_CURRENCY,
            &request.currency,
        )?;

        Ok(FareQuote {
            token: Uuid::new_v4(),
            pickup: request.pickup,
            dropoff: request.dropoff,
            vehicle_class: request.vehicle_class,
            distance_km,
            duration_min,
            base_fare,
            surge_multiplier,
            final_fare,
            currency: request.currency.clone(),
            breakdown: FareBreakdown {
                base_charge: pricing.base_fare,
                distance_charge: distance_km * pricing.per_km_rate,
                time_charge: duration_min * pricing.per_minute_rate,
                surge_charge: base_fare * (surge_multiplier - 1.0),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error;
    use chrono::TimeZone;

    fn engine() -> FareEngine {
        FareEngine::new(PricingConfig::default(), Box::new(RateTable::default()))
    }

    fn off_peak() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn peak() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap()
    }

    fn downtown_pair() -> (Coordinate, Coordinate) {
        (
            Coordinate::new(37.7749, -122.4194).unwrap(),
            Coordinate::new(37.7833, -122.4167).unwrap(),
        )
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_identity() {
        let (a, b) = downtown_pair();

        assert_eq!(haversine_distance_km(a, b), haversine_distance_km(b, a));
        assert_eq!(haversine_distance_km(a, a), 0.0);
        assert_eq!(haversine_distance_km(b, b), 0.0);
    }

    #[test]
    fn short_downtown_trip_floors_at_minimum_fare() {
        let engine = engine();
        let (pickup, dropoff) = downtown_pair();

        let distance = engine.estimate_distance_km(pickup, dropoff);
        assert!(distance > 0.5 && distance < 1.5, "distance {}", distance);

        let request = QuoteRequest {
            pickup,
            dropoff,
            vehicle_class: VehicleClass::Standard,
            currency: "USD".into(),
            event_multiplier: 1.0,
        };
        let demand = Demand {
            active_rides: 1,
            available_drivers: 1,
        };

        let quote = engine.quote(&request, demand, off_peak()).unwrap();

        assert_eq!(quote.surge_multiplier, 1.0);
        assert!(quote.final_fare >= 10.0);
        assert!(quote.base_fare >= 10.0);
    }

    #[test]
    fn duration_follows_average_speed() {
        let engine = engine();
        // 30 km at 30 km/h is an hour
        assert_eq!(engine.estimate_duration_min(30.0), 60.0);
        assert_eq!(engine.estimate_duration_min(0.0), 0.0);
    }

    #[test]
    fn peak_hours_honor_window_bounds() {
        let engine = engine();

        for (hour, expected) in [
            (6, false),
            (7, true),
            (8, true),
            (9, false),
            (12, false),
            (17, true),
            (18, true),
            (19, false),
        ] {
            let now = Utc.with_ymd_and_hms(2026, 3, 10, hour, 30, 0).unwrap();
            assert_eq!(engine.is_peak_hour(now), expected, "hour {}", hour);
        }
    }

    #[test]
    fn surge_ladder_maps_demand_ratio() {
        let engine = engine();
        let now = off_peak();

        let cases = [
            (0, 1, 1.0),
            (1, 2, 1.0),
            (1, 1, 1.5),
            (3, 2, 1.5),
            (15, 10, 1.75),
            (2, 1, 2.0),
            (10, 2, 2.0),
        ];

        for (active_rides, available_drivers, expected) in cases {
            let demand = Demand {
                active_rides,
                available_drivers,
            };
            assert_eq!(
                engine.surge_multiplier(demand, 1.0, now),
                expected,
                "demand {:?}",
                demand
            );
        }
    }

    #[test]
    fn no_available_drivers_hits_configured_ceiling() {
        let engine = engine();
        let demand = Demand {
            active_rides: 5,
            available_drivers: 0,
        };

        assert_eq!(engine.surge_multiplier(demand, 1.0, off_peak()), 2.0);
    }

    #[test]
    fn surge_is_always_within_bounds() {
        let engine = engine();
        let cap = engine.config().surge.cap;

        for active_rides in [0, 1, 3, 10, 100] {
            for available_drivers in [0, 1, 2, 10] {
                for event_multiplier in [0.0, 1.0, 1.3, 5.0] {
                    for now in [off_peak(), peak()] {
                        let demand = Demand {
                            active_rides,
                            available_drivers,
                        };
                        let surge = engine.surge_multiplier(demand, event_multiplier, now);
                        assert!(
                            (1.0..=cap).contains(&surge),
                            "surge {} out of bounds for {:?}",
                            surge,
                            demand
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn heavy_demand_quote_scales_with_surge() {
        let engine = engine();
        let (pickup, dropoff) = downtown_pair();

        let request = QuoteRequest {
            pickup,
            dropoff,
            vehicle_class: VehicleClass::Standard,
            currency: "USD".into(),
            event_multiplier: 1.0,
        };

        let calm = Demand {
            active_rides: 1,
            available_drivers: 1,
        };
        let pressed = Demand {
            active_rides: 10,
            available_drivers: 2,
        };

        let baseline = engine.quote(&request, calm, off_peak()).unwrap();
        let surged = engine.quote(&request, pressed, off_peak()).unwrap();

        assert_eq!(surged.surge_multiplier, 2.0);
        assert!((surged.final_fare - baseline.final_fare * 2.0).abs() < 0.01);
        assert!(surged.breakdown.surge_charge > 0.0);
    }

    #[test]
    fn peak_hour_compounds_with_demand() {
        let engine = engine();
        let demand = Demand {
            active_rides: 1,
            available_drivers: 1,
        };

        // 1.5 from the ladder, times the 1.3 morning window
        let surge = engine.surge_multiplier(demand, 1.0, peak());
        assert!((surge - 1.95).abs() < 1e-9);
    }

    #[test]
    fn breakdown_stays_in_usd_when_converting() {
        let engine = engine();
        let (pickup, dropoff) = downtown_pair();

        let usd_request = QuoteRequest {
            pickup,
            dropoff,
            vehicle_class: VehicleClass::Standard,
            currency: "USD".into(),
            event_multiplier: 1.0,
        };
        let eur_request = QuoteRequest {
            currency: "EUR".into(),
            ..usd_request.clone()
        };

        let demand = Demand {
            active_rides: 1,
            available_drivers: 1,
        };

        let usd = engine.quote(&usd_request, demand, off_peak()).unwrap();
        let eur = engine.quote(&eur_request, demand, off_peak()).unwrap();

        assert_eq!(eur.currency, "EUR");
        assert!((eur.final_fare - usd.final_fare * 0.85).abs() < 1e-9);

        // breakdown values are identical: they are USD diagnostics
        assert_eq!(eur.breakdown.base_charge, usd.breakdown.base_charge);
        assert_eq!(eur.breakdown.distance_charge, usd.breakdown.distance_charge);
        assert_eq!(eur.breakdown.time_charge, usd.breakdown.time_charge);
    }

    #[test]
    fn missing_pricing_row_fails_typed() {
        let mut config = PricingConfig::default();
        config.vehicles.remove(&VehicleClass::Van);
        let engine = FareEngine::new(config, Box::new(RateTable::default()));

        let (pickup, dropoff) = downtown_pair();
        let request = QuoteRequest {
            pickup,
            dropoff,
            vehicle_class: VehicleClass::Van,
            currency: "USD".into(),
            event_multiplier: 1.0,
        };

        let err = engine
            .quote(&request, Demand::default(), off_peak())
            .unwrap_err();
        assert_eq!(err.code, error::UNKNOWN_VEHICLE_CLASS);
    }

    #[test]
    fn unsupported_currency_fails_typed() {
        let engine = engine();
        let (pickup, dropoff) = downtown_pair();

        let request = QuoteRequest {
            pickup,
            dropoff,
            vehicle_class: VehicleClass::Standard,
            currency: "JPY".into(),
            event_multiplier: 1.0,
        };

        let err = engine
            .quote(
                &request,
                Demand {
                    active_rides: 1,
                    available_drivers: 1,
                },
                off_peak(),
            )
            .unwrap_err();
        assert_eq!(err.code, error::UNSUPPORTED_CURRENCY);
    }

    #[test]
    fn rounding_is_half_up_to_cents() {
        assert_eq!(round_to_cents(10.144), 10.14);
        assert_eq!(round_to_cents(10.146), 10.15);
        // 0.125 is exactly representable, so the half-up tie is observable
        assert_eq!(round_to_cents(0.125), 0.13);
        assert_eq!(round_to_cents(10.0), 10.0);
    }
}
