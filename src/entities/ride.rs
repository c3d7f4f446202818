use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::{Actor, Role};
use crate::entities::{
    Coordinate, Effect, FareQuote, NotificationKind, PaymentMethod, PaymentStatus, VehicleClass,
};
use crate::error::{
    data_consistency_error, invalid_input_error, invalid_transition_error, unauthorized_error,
    Error,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ride {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub pickup: Coordinate,
    pub dropoff: Coordinate,
    pub vehicle_class: VehicleClass,
    pub payment_method: PaymentMethod,
    pub quote: FareQuote,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Accepted,
    Started,
    Completed,
    Cancelled,
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Pending => "pending".into(),
            Self::Accepted => "accepted".into(),
            Self::Started => "started".into(),
            Self::Completed => "completed".into(),
            Self::Cancelled => "cancelled".into(),
        }
    }

    /// The forward transition table. `cancelled` and `completed` admit nothing.
    pub fn allowed_next(&self) -> &'static [Status] {
        match self {
            Self::Pending => &[Self::Accepted, Self::Cancelled],
            Self::Accepted => &[Self::Started, Self::Cancelled],
            Self::Started => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

/// An inbound status-update request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: Status,
    pub cancellation_reason: Option<String>,
}

/// The outcome of an accepted transition: the ride's next state plus the side
/// effects the caller must execute against its collaborators.
#[derive(Clone, Debug)]
pub struct Transition {
    pub ride: Ride,
    pub effects: Vec<Effect>,
}

impl Ride {
    pub fn new(rider_id: Uuid, payment_method: PaymentMethod, quote: FareQuote) -> Self {
        Self {
            id: Uuid::new_v4(),
            rider_id,
            driver_id: None,
            pickup: quote.pickup,
            dropoff: quote.dropoff,
            vehicle_class: quote.vehicle_class,
            payment_method,
            quote,
            status: Status::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            cancellation_reason: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Effects owed as soon as a ride is created: the rider's confirmation and
    /// the pending payment record.
    pub fn creation_effects(&self) -> Vec<Effect> {
        vec![
            Effect::NotifyUser {
                user_id: self.rider_id,
                kind: NotificationKind::RideRequested,
                ride_id: self.id,
                payload: json!({
                    "estimated_fare": self.quote.final_fare,
                    "currency": self.quote.currency,
                }),
            },
            Effect::UpdatePaymentStatus {
                ride_id: self.id,
                status: PaymentStatus::Pending,
            },
            Effect::PersistRide { ride_id: self.id },
        ]
    }

    /// True when the actor is a party to this ride: its rider, its assigned
    /// driver, or an administrator.
    pub fn is_party(&self, actor: &Actor) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Rider => actor.id == self.rider_id,
            Role::Driver => self.driver_id == Some(actor.id),
        }
    }

    /// The pure transition decision. Validates the move against the transition
    /// table and the actor's allowances, then returns the next ride state and
    /// the effect descriptors to execute. Performs no I/O; persistence and
    /// dispatch are the caller's problem.
    ///
    /// Re-requesting the current status is a no-op success with no effects, so
    /// retried deliveries stay safe, including against terminal states.
    #[tracing::instrument]
    pub fn request_transition(
        &self,
        update: &StatusUpdate,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Transition, Error> {
        if update.status == self.status {
            if !self.is_party(actor) {
                return Err(unauthorized_error());
            }

            return Ok(Transition {
                ride: self.clone(),
                effects: vec![],
            });
        }

        // Table legality is checked before authorization: a driver asking to
        // start a pending ride learns the move is invalid, not that they are
        // unauthorized.
        if !self.status.allowed_next().contains(&update.status) {
            return Err(invalid_transition_error(
                &self.status.name(),
                &update.status.name(),
            ));
        }

        match update.status {
            Status::Accepted => self.accept(actor),
            Status::Started => self.start(actor, now),
            Status::Completed => self.complete(actor, now),
            Status::Cancelled => self.cancel(actor, update.cancellation_reason.as_deref()),
            // pending is initial and never in an allowed-next set
            Status::Pending => Err(invalid_transition_error(
                &self.status.name(),
                &update.status.name(),
            )),
        }
    }

    fn accept(&self, actor: &Actor) -> Result<Transition, Error> {
        if actor.role != Role::Driver {
            return Err(unauthorized_error());
        }

        let mut ride = self.clone();
        ride.status = Status::Accepted;
        ride.driver_id = Some(actor.id);

        let effects = vec![
            Effect::NotifyUser {
                user_id: ride.rider_id,
                kind: NotificationKind::RideAccepted,
                ride_id: ride.id,
                payload: json!({ "driver_id": actor.id }),
            },
            Effect::PersistRide { ride_id: ride.id },
        ];

        Ok(Transition { ride, effects })
    }

    fn start(&self, actor: &Actor, now: DateTime<Utc>) -> Result<Transition, Error> {
        if actor.role != Role::Driver || self.driver_id != Some(actor.id) {
            return Err(unauthorized_error());
        }

        let mut ride = self.clone();
        ride.status = Status::Started;
        ride.started_at = Some(now);

        let effects = vec![
            Effect::NotifyUser {
                user_id: ride.rider_id,
                kind: NotificationKind::RideStarted,
                ride_id: ride.id,
                payload: json!({ "started_at": now }),
            },
            Effect::PersistRide { ride_id: ride.id },
        ];

        Ok(Transition { ride, effects })
    }

    fn complete(&self, actor: &Actor, now: DateTime<Utc>) -> Result<Transition, Error> {
        let allowed = match actor.role {
            Role::Admin => true,
            Role::Driver => self.driver_id == Some(actor.id),
            Role::Rider => false,
        };

        if !allowed {
            return Err(unauthorized_error());
        }

        if self.started_at.is_none() {
            return Err(data_consistency_error("ride completed without starting"));
        }

        let driver_id = self
            .driver_id
            .ok_or_else(|| data_consistency_error("started ride has no driver"))?;

        let mut ride = self.clone();
        ride.status = Status::Completed;
        ride.completed_at = Some(now);

        let payload = json!({
            "fare": ride.quote.final_fare,
            "currency": ride.quote.currency,
            "completed_at": now,
        });

        let effects = vec![
            Effect::NotifyUser {
                user_id: ride.rider_id,
                kind: NotificationKind::RideCompleted,
                ride_id: ride.id,
                payload: payload.clone(),
            },
            Effect::NotifyUser {
                user_id: driver_id,
                kind: NotificationKind::RideCompleted,
                ride_id: ride.id,
                payload,
            },
            Effect::UpdatePaymentStatus {
                ride_id: ride.id,
                status: PaymentStatus::Completed,
            },
            Effect::PersistRide { ride_id: ride.id },
        ];

        Ok(Transition { ride, effects })
    }

    fn cancel(&self, actor: &Actor, reason: Option<&str>) -> Result<Transition, Error> {
        if !self.is_party(actor) {
            return Err(unauthorized_error());
        }

        let reason = reason
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .ok_or_else(|| invalid_input_error())?;

        let mut ride = self.clone();
        ride.status = Status::Cancelled;
        ride.cancellation_reason = Some(reason.into());

        let mut effects = vec![Effect::NotifyUser {
            user_id: ride.rider_id,
            kind: NotificationKind::RideCancelled,
            ride_id: ride.id,
            payload: json!({ "reason": reason }),
        }];

        if let Some(driver_id) = ride.driver_id {
            effects.push(Effect::NotifyUser {
                user_id: driver_id,
                kind: NotificationKind::RideCancelled,
                ride_id: ride.id,
                payload: json!({ "reason": reason }),
            });
        }

        effects.push(Effect::UpdatePaymentStatus {
            ride_id: ride.id,
            status: PaymentStatus::Failed,
        });
        effects.push(Effect::PersistRide { ride_id: ride.id });

        Ok(Transition { ride, effects })
    }
}

#[cfg(test)]
pub(crate) fn test_quote() -> FareQuote {
    use crate::entities::FareBreakdown;

    FareQuote {
        token: Uuid::new_v4(),
        pickup: Coordinate::new(37.7749, -122.4194).unwrap(),
        dropoff: Coordinate::new(37.7833, -122.4167).unwrap(),
        vehicle_class: VehicleClass::Standard,
        distance_km: 0.96,
        duration_min: 1.93,
        base_fare: 10.0,
        surge_multiplier: 1.0,
        final_fare: 10.0,
        currency: "USD".into(),
        breakdown: FareBreakdown {
            base_charge: 5.0,
            distance_charge: 2.41,
            time_charge: 0.96,
            surge_charge: 0.0,
        },
    }
}

#[cfg(test)]
pub(crate) fn test_ride(rider_id: Uuid) -> Ride {
    Ride::new(rider_id, PaymentMethod::Card, test_quote())
}

#[test]
fn transition_table_test() {
    use crate::error;

    let admin = Actor::new_admin();

    for from in [
        Status::Pending,
        Status::Accepted,
        Status::Started,
        Status::Completed,
        Status::Cancelled,
    ] {
        let mut ride = test_ride(Uuid::new_v4());
        ride.status = from;

        for to in [
            Status::Pending,
            Status::Accepted,
            Status::Started,
            Status::Completed,
            Status::Cancelled,
        ] {
            if to == from || from.allowed_next().contains(&to) {
                continue;
            }

            let update = StatusUpdate {
                status: to,
                cancellation_reason: Some("no longer needed".into()),
            };

            let err = ride
                .request_transition(&update, &admin, Utc::now())
                .unwrap_err();
            assert_eq!(err.code, error::INVALID_TRANSITION);
        }
    }
}

#[test]
fn full_lifecycle_test() {
    let rider_id = Uuid::new_v4();
    let rider = Actor::rider(rider_id);
    let driver = Actor::driver(Uuid::new_v4());

    let ride = test_ride(rider_id);
    assert_eq!(ride.status, Status::Pending);
    assert!(ride.is_party(&rider));
    assert!(!ride.is_party(&driver));

    // driver accepts
    let update = StatusUpdate {
        status: Status::Accepted,
        cancellation_reason: None,
    };
    let transition = ride
        .request_transition(&update, &driver, Utc::now())
        .unwrap();
    let ride = transition.ride;
    assert_eq!(ride.status, Status::Accepted);
    assert_eq!(ride.driver_id, Some(driver.id));
    assert!(ride.is_party(&driver));

    // driver starts
    let update = StatusUpdate {
        status: Status::Started,
        cancellation_reason: None,
    };
    let transition = ride
        .request_transition(&update, &driver, Utc::now())
        .unwrap();
    let ride = transition.ride;
    assert_eq!(ride.status, Status::Started);
    assert!(ride.started_at.is_some());

    // driver completes
    let update = StatusUpdate {
        status: Status::Completed,
        cancellation_reason: None,
    };
    let transition = ride
        .request_transition(&update, &driver, Utc::now())
        .unwrap();
    assert_eq!(transition.ride.status, Status::Completed);
    assert!(transition.ride.completed_at.is_some());

    let mut notified = vec![];
    let mut payment_synced = false;

    for effect in &transition.effects {
        match effect {
            Effect::NotifyUser { user_id, kind, .. } => {
                assert_eq!(*kind, NotificationKind::RideCompleted);
                notified.push(*user_id);
            }
            Effect::UpdatePaymentStatus { status, .. } => {
                assert_eq!(*status, PaymentStatus::Completed);
                payment_synced = true;
            }
            Effect::PersistRide { .. } => {}
        }
    }

    assert!(notified.contains(&rider_id));
    assert!(notified.contains(&driver.id));
    assert!(payment_synced);
}

#[test]
fn start_requires_accept_first_test() {
    use crate::error;

    let ride = test_ride(Uuid::new_v4());
    let driver = Actor::driver(Uuid::new_v4());

    let update = StatusUpdate {
        status: Status::Started,
        cancellation_reason: None,
    };

    let err = ride
        .request_transition(&update, &driver, Utc::now())
        .unwrap_err();
    assert_eq!(err.code, error::INVALID_TRANSITION);
}

#[test]
fn only_assigned_driver_starts_test() {
    use crate::error;

    let rider_id = Uuid::new_v4();
    let rider = Actor::rider(rider_id);
    let other_driver = Actor::driver(Uuid::new_v4());

    let mut ride = test_ride(rider_id);
    ride.status = Status::Accepted;
    ride.driver_id = Some(Uuid::new_v4());

    let update = StatusUpdate {
        status: Status::Started,
        cancellation_reason: None,
    };

    let err = ride
        .request_transition(&update, &rider, Utc::now())
        .unwrap_err();
    assert_eq!(err.code, error::UNAUTHORIZED);

    let err = ride
        .request_transition(&update, &other_driver, Utc::now())
        .unwrap_err();
    assert_eq!(err.code, error::UNAUTHORIZED);
}

#[test]
fn complete_without_start_test() {
    use crate::error;

    let driver_id = Uuid::new_v4();
    let driver = Actor::driver(driver_id);

    // a ride forced into started without a start timestamp must not complete
    let mut ride = test_ride(Uuid::new_v4());
    ride.status = Status::Started;
    ride.driver_id = Some(driver_id);

    let update = StatusUpdate {
        status: Status::Completed,
        cancellation_reason: None,
    };

    let err = ride
        .request_transition(&update, &driver, Utc::now())
        .unwrap_err();
    assert_eq!(err.code, error::DATA_CONSISTENCY);
}

#[test]
fn cancellation_reason_test() {
    use crate::error;

    let rider_id = Uuid::new_v4();
    let rider = Actor::rider(rider_id);
    let ride = test_ride(rider_id);

    let update = StatusUpdate {
        status: Status::Cancelled,
        cancellation_reason: None,
    };
    let err = ride
        .request_transition(&update, &rider, Utc::now())
        .unwrap_err();
    assert_eq!(err.code, error::INVALID_INPUT);

    let update = StatusUpdate {
        status: Status::Cancelled,
        cancellation_reason: Some("  ".into()),
    };
    let err = ride
        .request_transition(&update, &rider, Utc::now())
        .unwrap_err();
    assert_eq!(err.code, error::INVALID_INPUT);

    let update = StatusUpdate {
        status: Status::Cancelled,
        cancellation_reason: Some("driver took too long".into()),
    };
    let transition = ride
        .request_transition(&update, &rider, Utc::now())
        .unwrap();
    assert_eq!(transition.ride.status, Status::Cancelled);
    assert_eq!(
        transition.ride.cancellation_reason.as_deref(),
        Some("driver took too long")
    );

    let failed_payment = transition.effects.iter().any(|effect| {
        matches!(
            effect,
            Effect::UpdatePaymentStatus {
                status: PaymentStatus::Failed,
                ..
            }
        )
    });
    assert!(failed_payment);
}

#[test]
fn terminal_states_test() {
    use crate::error;

    let rider_id = Uuid::new_v4();
    let rider = Actor::rider(rider_id);

    let mut ride = test_ride(rider_id);
    ride.status = Status::Completed;

    // identity no-op succeeds with no effects
    let update = StatusUpdate {
        status: Status::Completed,
        cancellation_reason: None,
    };
    let transition = ride
        .request_transition(&update, &rider, Utc::now())
        .unwrap();
    assert_eq!(transition.ride.status, Status::Completed);
    assert!(transition.effects.is_empty());

    // any other target fails, including the other terminal state
    let update = StatusUpdate {
        status: Status::Cancelled,
        cancellation_reason: Some("too late".into()),
    };
    let err = ride
        .request_transition(&update, &rider, Utc::now())
        .unwrap_err();
    assert_eq!(err.code, error::INVALID_TRANSITION);
}

#[test]
fn stranger_is_unauthorized_test() {
    use crate::error;

    let ride = test_ride(Uuid::new_v4());
    let stranger = Actor::rider(Uuid::new_v4());

    let update = StatusUpdate {
        status: Status::Cancelled,
        cancellation_reason: Some("not my ride".into()),
    };
    let err = ride
        .request_transition(&update, &stranger, Utc::now())
        .unwrap_err();
    assert_eq!(err.code, error::UNAUTHORIZED);

    // the no-op path is gated the same way
    let update = StatusUpdate {
        status: Status::Pending,
        cancellation_reason: None,
    };
    let err = ride
        .request_transition(&update, &stranger, Utc::now())
        .unwrap_err();
    assert_eq!(err.code, error::UNAUTHORIZED);
}
