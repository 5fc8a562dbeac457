use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_models::auth::{Actor, ActorRole};

use crate::models::{CreatePatientRequest, Patient, PatientError};
use crate::services::store::{InMemoryPatientStore, PatientStore};

/// Lookup used by booking to confirm a patient reference is real.
#[async_trait]
pub trait PatientDirectory: Send + Sync {
    async fn find_patient(&self, patient_id: Uuid) -> Result<Option<Patient>, PatientError>;

    async fn exists(&self, patient_id: Uuid) -> Result<bool, PatientError> {
        Ok(self.find_patient(patient_id).await?.is_some())
    }
}

/// Patient profiles and who may see them. Rows live in a `PatientStore`.
pub struct PatientRegistry {
    store: Arc<dyn PatientStore>,
}

impl Default for PatientRegistry {
    fn default() -> Self {
        Self::with_store(Arc::new(InMemoryPatientStore::new()))
    }
}

impl PatientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: Arc<dyn PatientStore>) -> Self {
        Self { store }
    }

    /// Creates the caller's own profile. Credentials live with the identity provider.
    pub async fn create_profile(
        &self,
        actor: &Actor,
        request: CreatePatientRequest,
    ) -> Result<Patient, PatientError> {
        if actor.role != ActorRole::Patient {
            return Err(PatientError::Unauthorized);
        }

        let name = request.name.trim();
        let email = request.email.trim().to_ascii_lowercase();
        if name.is_empty() || email.is_empty() {
            return Err(PatientError::ValidationError("Name and email are required".to_string()));
        }
        if !email.contains('@') {
            return Err(PatientError::ValidationError("Invalid email".to_string()));
        }

        let now = Utc::now();
        let patient = self
            .store
            .insert(Patient {
                id: actor.id,
                name: name.to_string(),
                email,
                phone: request.phone,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!("Patient profile created: {}", patient.id);
        Ok(patient)
    }

    /// Seeds a profile without an acting principal, e.g. from fixtures.
    pub async fn insert(&self, patient: Patient) -> Result<Patient, PatientError> {
        debug!("Seeding patient {}", patient.id);
        self.store.insert(patient).await
    }

    pub async fn get_patient(&self, actor: &Actor, patient_id: Uuid) -> Result<Patient, PatientError> {
        if !actor.is_admin() && !actor.is(ActorRole::Patient, patient_id) {
            return Err(PatientError::Unauthorized);
        }

        self.find_patient(patient_id).await?.ok_or(PatientError::NotFound)
    }
}

#[async_trait]
impl PatientDirectory for PatientRegistry {
    async fn find_patient(&self, patient_id: Uuid) -> Result<Option<Patient>, PatientError> {
        self.store.fetch(patient_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn request(email: &str) -> CreatePatientRequest {
        CreatePatientRequest {
            name: "Jane Roe".to_string(),
            email: email.to_string(),
            phone: None,
        }
    }

    #[tokio::test]
    async fn test_create_profile_once() {
        let registry = PatientRegistry::new();
        let actor = Actor::patient(Uuid::new_v4());

        let patient = registry.create_profile(&actor, request("jane@example.com")).await.unwrap();
        assert_eq!(patient.id, actor.id);
        assert!(registry.exists(actor.id).await.unwrap());

        assert_matches!(
            registry.create_profile(&actor, request("other@example.com")).await,
            Err(PatientError::AlreadyExists)
        );
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let registry = PatientRegistry::new();
        registry
            .create_profile(&Actor::patient(Uuid::new_v4()), request("Jane@Example.com"))
            .await
            .unwrap();

        assert_matches!(
            registry.create_profile(&Actor::patient(Uuid::new_v4()), request("jane@example.com")).await,
            Err(PatientError::EmailAlreadyExists { .. })
        );
    }

    #[tokio::test]
    async fn test_provider_cannot_create_patient_profile() {
        let registry = PatientRegistry::new();
        assert_matches!(
            registry.create_profile(&Actor::provider(Uuid::new_v4()), request("doc@example.com")).await,
            Err(PatientError::Unauthorized)
        );
    }
}
