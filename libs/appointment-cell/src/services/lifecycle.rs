// libs/appointment-cell/src/services/lifecycle.rs
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn, Instrument};
use uuid::Uuid;

use shared_models::auth::{Actor, ActorRole};
use shared_utils::clock::Clock;

use crate::models::{Appointment, AppointmentError, StatusFacets};
use crate::services::coordinator::ReservationCoordinator;
use crate::services::notification::LifecycleNotifier;
use crate::services::store::{AppointmentStore, StoreError};

const MAX_STATUS_WRITE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Cancel,
    Complete,
    MarkPaid,
}

impl Transition {
    /// Facets after applying this transition to `current`.
    ///
    /// | current   | cancel    | complete  | mark paid |
    /// |-----------|-----------|-----------|-----------|
    /// | booked    | cancelled | completed | paid      |
    /// | completed | terminal  | terminal  | paid      |
    /// | cancelled | terminal  | terminal  | terminal  |
    pub fn apply(self, current: StatusFacets) -> Result<StatusFacets, AppointmentError> {
        let status = current.status();

        match self {
            Transition::Cancel | Transition::Complete if status.is_terminal() => {
                Err(AppointmentError::AlreadyTerminal(status))
            }
            Transition::Cancel => Ok(StatusFacets { cancelled: true, ..current }),
            Transition::Complete => Ok(StatusFacets { completed: true, ..current }),
            Transition::MarkPaid if current.cancelled => Err(AppointmentError::AlreadyTerminal(status)),
            Transition::MarkPaid => Ok(StatusFacets { paid: true, ..current }),
        }
    }

    fn authorize(self, actor: &Actor, appointment: &Appointment) -> Result<(), AppointmentError> {
        let owning_patient = actor.is(ActorRole::Patient, appointment.patient_id);
        let owning_provider = actor.is(ActorRole::Provider, appointment.provider_id);

        let permitted = match self {
            Transition::Cancel => owning_patient || owning_provider || actor.is_admin(),
            Transition::Complete => owning_provider,
            Transition::MarkPaid => owning_patient || actor.role == ActorRole::System,
        };

        if permitted {
            Ok(())
        } else {
            Err(AppointmentError::Forbidden(format!(
                "{} may not {} appointment {}",
                actor.role, self, appointment.id
            )))
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Cancel => write!(f, "cancel"),
            Transition::Complete => write!(f, "complete"),
            Transition::MarkPaid => write!(f, "mark paid"),
        }
    }
}

/// Applies status transitions to persisted appointments.
///
/// Status writes are conditional on the facets that were read, so of two
/// racing terminal transitions exactly one commits; the loser re-reads and
/// reports `AlreadyTerminal`. A committed cancel frees the slot before any
/// notification is attempted.
///
/// Each transition runs to completion on its own task. Dropping the caller's
/// future after the status write has committed still frees the slot.
#[derive(Clone)]
pub struct LifecycleManager {
    store: Arc<dyn AppointmentStore>,
    coordinator: Arc<ReservationCoordinator>,
    notifier: Arc<dyn LifecycleNotifier>,
    clock: Arc<dyn Clock>,
}

impl LifecycleManager {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        coordinator: Arc<ReservationCoordinator>,
        notifier: Arc<dyn LifecycleNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            coordinator,
            notifier,
            clock,
        }
    }

    pub async fn cancel(&self, appointment_id: Uuid, actor: &Actor) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, actor, Transition::Cancel).await
    }

    pub async fn complete(&self, appointment_id: Uuid, actor: &Actor) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, actor, Transition::Complete).await
    }

    /// Already-paid appointments are returned unchanged.
    pub async fn mark_paid(&self, appointment_id: Uuid, actor: &Actor) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, actor, Transition::MarkPaid).await
    }

    async fn transition(
        &self,
        appointment_id: Uuid,
        actor: &Actor,
        transition: Transition,
    ) -> Result<Appointment, AppointmentError> {
        let manager = self.clone();
        let actor = *actor;

        tokio::spawn(
            async move { manager.apply_transition(appointment_id, &actor, transition).await }
                .in_current_span(),
        )
        .await
        .map_err(|err| {
            error!("{} of appointment {} ended abnormally: {}", transition, appointment_id, err);
            AppointmentError::PersistenceFailure(format!("{} task failed: {}", transition, err))
        })?
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id, role = %actor.role))]
    async fn apply_transition(
        &self,
        appointment_id: Uuid,
        actor: &Actor,
        transition: Transition,
    ) -> Result<Appointment, AppointmentError> {
        for attempt in 1..=MAX_STATUS_WRITE_ATTEMPTS {
            let current = self
                .store
                .fetch(appointment_id)
                .await?
                .ok_or(AppointmentError::NotFound)?;

            transition.authorize(actor, &current)?;
            let next = transition.apply(current.facets())?;

            if next == current.facets() {
                debug!("Appointment {} already satisfies {}", appointment_id, transition);
                return Ok(current);
            }

            match self
                .store
                .update_status(appointment_id, current.facets(), next, self.clock.now())
                .await
            {
                Ok(updated) => {
                    info!("Appointment {}: {} applied by {}", appointment_id, transition, actor.role);
                    self.after_commit(&updated, transition).await;
                    return Ok(updated);
                }
                Err(StoreError::Conflict(reason)) => {
                    debug!(
                        "Status write for {} raced (attempt {}/{}): {}",
                        appointment_id, attempt, MAX_STATUS_WRITE_ATTEMPTS, reason
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(AppointmentError::PersistenceFailure(format!(
            "status of appointment {} kept changing underneath {}",
            appointment_id, transition
        )))
    }

    async fn after_commit(&self, appointment: &Appointment, transition: Transition) {
        if transition == Transition::Cancel {
            let key = appointment.reservation_key();
            if !self.coordinator.release_slot(key, appointment.id).await {
                debug!("No slot held for cancelled appointment {} at {}", appointment.id, key);
            }
        }

        if let Err(err) = self.notifier.transition_applied(appointment, transition).await {
            warn!(
                "Notification for appointment {} ({}) failed: {}",
                appointment.id, transition, err
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use assert_matches::assert_matches;

    const BOOKED: StatusFacets = StatusFacets { cancelled: false, completed: false, paid: false };
    const COMPLETED: StatusFacets = StatusFacets { cancelled: false, completed: true, paid: false };
    const CANCELLED: StatusFacets = StatusFacets { cancelled: true, completed: false, paid: false };

    #[test]
    fn test_booked_row() {
        assert_eq!(Transition::Cancel.apply(BOOKED).unwrap(), CANCELLED);
        assert_eq!(Transition::Complete.apply(BOOKED).unwrap(), COMPLETED);
        assert!(Transition::MarkPaid.apply(BOOKED).unwrap().paid);
    }

    #[test]
    fn test_completed_row() {
        assert_matches!(
            Transition::Cancel.apply(COMPLETED),
            Err(AppointmentError::AlreadyTerminal(AppointmentStatus::Completed))
        );
        assert_matches!(
            Transition::Complete.apply(COMPLETED),
            Err(AppointmentError::AlreadyTerminal(AppointmentStatus::Completed))
        );
        let paid = Transition::MarkPaid.apply(COMPLETED).unwrap();
        assert!(paid.completed && paid.paid);
    }

    #[test]
    fn test_cancelled_row() {
        for transition in [Transition::Cancel, Transition::Complete, Transition::MarkPaid] {
            assert_matches!(
                transition.apply(CANCELLED),
                Err(AppointmentError::AlreadyTerminal(AppointmentStatus::Cancelled))
            );
        }
    }

    #[test]
    fn test_terminal_facets_never_combine() {
        let paid_booked = StatusFacets { paid: true, ..BOOKED };
        for start in [BOOKED, paid_booked, COMPLETED, CANCELLED] {
            for transition in [Transition::Cancel, Transition::Complete, Transition::MarkPaid] {
                if let Ok(next) = transition.apply(start) {
                    assert!(!(next.cancelled && next.completed));
                }
            }
        }
    }
}
