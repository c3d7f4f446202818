mod coordinate;
mod effect;
mod quote;
mod ride;
mod vehicle;

pub use coordinate::Coordinate;
pub use effect::{Effect, NotificationKind, PaymentMethod, PaymentStatus};
pub use quote::{FareBreakdown, FareQuote};
pub use ride::{Ride, Status as RideStatus, StatusUpdate, Transition};
pub use vehicle::{VehicleClass, VehiclePricing};

#[cfg(test)]
pub(crate) use ride::test_ride;
