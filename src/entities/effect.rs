use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Cash,
    Wallet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn name(&self) -> String {
        match self {
            Self::Pending => "pending".into(),
            Self::Completed => "completed".into(),
            Self::Failed => "failed".into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RideRequested,
    RideAccepted,
    RideStarted,
    RideCompleted,
    RideCancelled,
}

impl NotificationKind {
    pub fn name(&self) -> String {
        match self {
            Self::RideRequested => "ride_requested".into(),
            Self::RideAccepted => "ride_accepted".into(),
            Self::RideStarted => "ride_started".into(),
            Self::RideCompleted => "ride_completed".into(),
            Self::RideCancelled => "ride_cancelled".into(),
        }
    }
}

/// A side effect required by a ride transition, described but not performed.
/// The decision functions return these for a separate executor to act on, so
/// transition logic stays testable without email/push/payment doubles.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Effect {
    NotifyUser {
        user_id: Uuid,
        kind: NotificationKind,
        ride_id: Uuid,
        payload: Value,
    },
    UpdatePaymentStatus {
        ride_id: Uuid,
        status: PaymentStatus,
    },
    PersistRide {
        ride_id: Uuid,
    },
}
