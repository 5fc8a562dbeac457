// libs/appointment-cell/src/services/query.rs
use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use provider_cell::services::ProviderDirectory;
use shared_models::auth::{Actor, ActorRole};

use crate::models::{
    AdminDashboard, Appointment, AppointmentError, AppointmentFilter, AppointmentListQuery,
    ProviderDashboard,
};
use crate::services::store::AppointmentStore;

const LATEST_APPOINTMENTS: usize = 5;

/// Read-only views over the appointment store, scoped to what the actor may see.
pub struct AppointmentQueries {
    store: Arc<dyn AppointmentStore>,
    providers: Arc<dyn ProviderDirectory>,
}

impl AppointmentQueries {
    pub fn new(store: Arc<dyn AppointmentStore>, providers: Arc<dyn ProviderDirectory>) -> Self {
        Self { store, providers }
    }

    /// Explicit ids win; otherwise patients and providers see their own, admins see all.
    pub fn resolve_filter(
        actor: &Actor,
        query: &AppointmentListQuery,
    ) -> Result<AppointmentFilter, AppointmentError> {
        match (query.patient_id, query.provider_id) {
            (Some(_), Some(_)) => Err(AppointmentError::ValidationError(
                "Filter by patient_id or provider_id, not both".to_string(),
            )),
            (Some(patient_id), None) => Ok(AppointmentFilter::Patient(patient_id)),
            (None, Some(provider_id)) => Ok(AppointmentFilter::Provider(provider_id)),
            (None, None) => match actor.role {
                ActorRole::Patient => Ok(AppointmentFilter::Patient(actor.id)),
                ActorRole::Provider => Ok(AppointmentFilter::Provider(actor.id)),
                ActorRole::Administrator => Ok(AppointmentFilter::All),
                ActorRole::System => Err(AppointmentError::Forbidden(
                    "System actors cannot list appointments".to_string(),
                )),
            },
        }
    }

    pub async fn list(
        &self,
        actor: &Actor,
        filter: AppointmentFilter,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let permitted = match filter {
            AppointmentFilter::Patient(id) => actor.is_admin() || actor.is(ActorRole::Patient, id),
            AppointmentFilter::Provider(id) => actor.is_admin() || actor.is(ActorRole::Provider, id),
            AppointmentFilter::All => actor.is_admin(),
        };
        if !permitted {
            return Err(AppointmentError::Forbidden(format!(
                "{} may not list appointments {:?}",
                actor.role, filter
            )));
        }

        debug!("Listing appointments {:?} for {}", filter, actor.id);
        let appointments = match filter {
            AppointmentFilter::Patient(id) => self.store.list_by_patient(id).await?,
            AppointmentFilter::Provider(id) => self.store.list_by_provider(id).await?,
            AppointmentFilter::All => self.store.list_all().await?,
        };

        Ok(appointments)
    }

    pub async fn get(&self, actor: &Actor, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .store
            .fetch(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        let visible = actor.is_admin()
            || actor.is(ActorRole::Patient, appointment.patient_id)
            || actor.is(ActorRole::Provider, appointment.provider_id);

        if !visible {
            return Err(AppointmentError::Forbidden(format!(
                "Appointment {} belongs to someone else",
                appointment_id
            )));
        }

        Ok(appointment)
    }

    pub async fn provider_dashboard(&self, actor: &Actor) -> Result<ProviderDashboard, AppointmentError> {
        if actor.role != ActorRole::Provider {
            return Err(AppointmentError::Forbidden(
                "Only providers have a provider dashboard".to_string(),
            ));
        }

        let appointments = self.store.list_by_provider(actor.id).await?;

        let earnings = appointments
            .iter()
            .filter(|a| !a.cancelled && (a.completed || a.paid))
            .map(|a| a.amount)
            .sum();

        Ok(ProviderDashboard {
            provider_id: actor.id,
            earnings,
            appointments: appointments.len(),
            patients: distinct_patients(&appointments),
            latest_appointments: latest(&appointments),
        })
    }

    pub async fn admin_dashboard(&self, actor: &Actor) -> Result<AdminDashboard, AppointmentError> {
        if !actor.is_admin() {
            return Err(AppointmentError::Forbidden(
                "Only administrators have an admin dashboard".to_string(),
            ));
        }

        let providers = self.providers.list_providers().await?;
        let appointments = self.store.list_all().await?;

        Ok(AdminDashboard {
            providers: providers.len(),
            appointments: appointments.len(),
            patients: distinct_patients(&appointments),
            latest_appointments: latest(&appointments),
        })
    }
}

fn distinct_patients(appointments: &[Appointment]) -> usize {
    appointments
        .iter()
        .map(|a| a.patient_id)
        .collect::<HashSet<_>>()
        .len()
}

/// Newest first by creation time.
fn latest(appointments: &[Appointment]) -> Vec<Appointment> {
    let mut sorted = appointments.to_vec();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted.truncate(LATEST_APPOINTMENTS);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn query(patient_id: Option<Uuid>, provider_id: Option<Uuid>) -> AppointmentListQuery {
        AppointmentListQuery { patient_id, provider_id }
    }

    #[test]
    fn test_filter_defaults_follow_role() {
        let patient = Actor::patient(Uuid::new_v4());
        let provider = Actor::provider(Uuid::new_v4());
        let admin = Actor::administrator(Uuid::new_v4());

        assert_eq!(
            AppointmentQueries::resolve_filter(&patient, &query(None, None)).unwrap(),
            AppointmentFilter::Patient(patient.id)
        );
        assert_eq!(
            AppointmentQueries::resolve_filter(&provider, &query(None, None)).unwrap(),
            AppointmentFilter::Provider(provider.id)
        );
        assert_eq!(
            AppointmentQueries::resolve_filter(&admin, &query(None, None)).unwrap(),
            AppointmentFilter::All
        );
        assert_matches!(
            AppointmentQueries::resolve_filter(&admin, &query(Some(Uuid::new_v4()), Some(Uuid::new_v4()))),
            Err(AppointmentError::ValidationError(_))
        );
    }
}
