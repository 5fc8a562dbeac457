// libs/appointment-cell/src/services/notification.rs
use async_trait::async_trait;
use tracing::info;

use crate::models::Appointment;
use crate::services::lifecycle::Transition;

/// Downstream collaborator told about committed transitions.
///
/// Failures are logged by the caller and never undo the transition.
#[async_trait]
pub trait LifecycleNotifier: Send + Sync {
    async fn appointment_booked(&self, appointment: &Appointment) -> anyhow::Result<()>;

    async fn transition_applied(
        &self,
        appointment: &Appointment,
        transition: Transition,
    ) -> anyhow::Result<()>;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl LifecycleNotifier for TracingNotifier {
    async fn appointment_booked(&self, appointment: &Appointment) -> anyhow::Result<()> {
        info!(
            "Notify: appointment {} booked with {} on {} at {}",
            appointment.id,
            appointment.provider_name,
            appointment.slot_date,
            appointment.slot_time.format("%H:%M")
        );
        Ok(())
    }

    async fn transition_applied(
        &self,
        appointment: &Appointment,
        transition: Transition,
    ) -> anyhow::Result<()> {
        info!(
            "Notify: appointment {} {} (status {}, paid {})",
            appointment.id,
            transition,
            appointment.status(),
            appointment.paid
        );
        Ok(())
    }
}
