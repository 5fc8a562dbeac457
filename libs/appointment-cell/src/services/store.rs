// libs/appointment-cell/src/services/store.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError, StatusFacets};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("appointment not found")]
    NotFound,

    /// A conditional write lost against a concurrent one, or a uniqueness rule fired.
    #[error("write conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppointmentError::NotFound,
            other => AppointmentError::PersistenceFailure(other.to_string()),
        }
    }
}

/// System of record for appointments. Rows are never deleted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn create(&self, appointment: Appointment) -> Result<Appointment, StoreError>;

    async fn fetch(&self, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError>;

    /// Writes `next` only if the stored facets still equal `expected`.
    async fn update_status(
        &self,
        appointment_id: Uuid,
        expected: StatusFacets,
        next: StatusFacets,
        updated_at: DateTime<Utc>,
    ) -> Result<Appointment, StoreError>;

    async fn list_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, StoreError>;

    async fn list_by_provider(&self, provider_id: Uuid) -> Result<Vec<Appointment>, StoreError>;

    async fn list_all(&self) -> Result<Vec<Appointment>, StoreError>;
}

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn collect<F>(&self, keep: F) -> Vec<Appointment>
    where
        F: Fn(&Appointment) -> bool,
    {
        let mut rows: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|a| keep(*a))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        rows
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn create(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        let mut appointments = self.appointments.write().await;

        if appointments.contains_key(&appointment.id) {
            return Err(StoreError::Conflict(format!("appointment {} exists", appointment.id)));
        }

        // Same guarantee a partial unique index gives the hosted table.
        let key = appointment.reservation_key();
        if appointment.is_active()
            && appointments
                .values()
                .any(|existing| existing.is_active() && existing.reservation_key() == key)
        {
            return Err(StoreError::Conflict(format!("active appointment already holds {}", key)));
        }

        debug!("Stored appointment {}", appointment.id);
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn fetch(&self, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.appointments.read().await.get(&appointment_id).cloned())
    }

    async fn update_status(
        &self,
        appointment_id: Uuid,
        expected: StatusFacets,
        next: StatusFacets,
        updated_at: DateTime<Utc>,
    ) -> Result<Appointment, StoreError> {
        let mut appointments = self.appointments.write().await;
        let appointment = appointments.get_mut(&appointment_id).ok_or(StoreError::NotFound)?;

        if appointment.facets() != expected {
            return Err(StoreError::Conflict(format!(
                "appointment {} changed concurrently",
                appointment_id
            )));
        }

        appointment.apply_facets(next);
        appointment.updated_at = updated_at;
        Ok(appointment.clone())
    }

    async fn list_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        Ok(self.collect(|a| a.patient_id == patient_id).await)
    }

    async fn list_by_provider(&self, provider_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        Ok(self.collect(|a| a.provider_id == provider_id).await)
    }

    async fn list_all(&self) -> Result<Vec<Appointment>, StoreError> {
        Ok(self.collect(|_| true).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{NaiveDate, NaiveTime};

    fn appointment(provider_id: Uuid) -> Appointment {
        let now = Utc::now();
        Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            provider_id,
            provider_name: "Dr. Lee".to_string(),
            provider_speciality: "Dermatologist".to_string(),
            provider_fee: 50.0,
            slot_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            slot_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            amount: 50.0,
            cancelled: false,
            completed: false,
            paid: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_conditional_update() {
        let store = InMemoryAppointmentStore::new();
        let saved = store.create(appointment(Uuid::new_v4())).await.unwrap();

        let cancelled = StatusFacets { cancelled: true, ..saved.facets() };
        let updated = store
            .update_status(saved.id, saved.facets(), cancelled, Utc::now())
            .await
            .unwrap();
        assert!(updated.cancelled);

        let completed = StatusFacets { completed: true, ..saved.facets() };
        assert_matches!(
            store.update_status(saved.id, saved.facets(), completed, Utc::now()).await,
            Err(StoreError::Conflict(_))
        );

        assert_matches!(
            store.update_status(Uuid::new_v4(), saved.facets(), completed, Utc::now()).await,
            Err(StoreError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_one_active_appointment_per_slot() {
        let store = InMemoryAppointmentStore::new();
        let provider_id = Uuid::new_v4();
        let first = store.create(appointment(provider_id)).await.unwrap();

        assert_matches!(store.create(appointment(provider_id)).await, Err(StoreError::Conflict(_)));

        let cancelled = StatusFacets { cancelled: true, ..first.facets() };
        store.update_status(first.id, first.facets(), cancelled, Utc::now()).await.unwrap();

        store.create(appointment(provider_id)).await.unwrap();
        assert_eq!(store.list_by_provider(provider_id).await.unwrap().len(), 2);
    }
}
