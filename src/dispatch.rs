use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::entities::{Effect, NotificationKind, PaymentStatus};
use crate::error::Error;

/// Notification transport seam. Email/push delivery lives behind it, outside
/// this crate.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        ride_id: Uuid,
        payload: Value,
    ) -> Result<(), Error>;
}

/// Payment collaborator seam. The real implementation talks to the payment
/// provider; the core only tells it which status a ride's payment should have.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn update_payment_status(&self, ride_id: Uuid, status: PaymentStatus)
        -> Result<(), Error>;
}

/// Executes effect descriptors against the collaborators. `PersistRide` is
/// satisfied upstream by the engine's versioned write and skipped here.
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    payments: Arc<dyn PaymentGateway>,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, payments: Arc<dyn PaymentGateway>) -> Self {
        Self { notifier, payments }
    }

    #[tracing::instrument(skip(self, effects))]
    pub async fn dispatch(&self, effects: Vec<Effect>) -> Result<(), Error> {
        for effect in effects {
            match effect {
                Effect::NotifyUser {
                    user_id,
                    kind,
                    ride_id,
                    payload,
                } => {
                    self.notifier
                        .notify(user_id, kind, ride_id, payload)
                        .await?;
                }
                Effect::UpdatePaymentStatus { ride_id, status } => {
                    self.payments.update_payment_status(ride_id, status).await?;
                }
                Effect::PersistRide { ride_id } => {
                    tracing::trace!(%ride_id, "ride already persisted");
                }
            }
        }

        Ok(())
    }
}

/// Tracing-only notifier for local runs and the simulation.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        ride_id: Uuid,
        _payload: Value,
    ) -> Result<(), Error> {
        tracing::info!(%user_id, %ride_id, "notification: {}", kind.name());

        Ok(())
    }
}

/// Tracing-only payment gateway for local runs and the simulation.
pub struct LogPaymentGateway;

#[async_trait]
impl PaymentGateway for LogPaymentGateway {
    async fn update_payment_status(
        &self,
        ride_id: Uuid,
        status: PaymentStatus,
    ) -> Result<(), Error> {
        tracing::info!(%ride_id, "payment status: {}", status.name());

        Ok(())
    }
}
