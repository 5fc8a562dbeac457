use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Patient, PatientError};

/// Persistence for patient profiles.
#[async_trait]
pub trait PatientStore: Send + Sync {
    /// Fails with `AlreadyExists` for a taken id and `EmailAlreadyExists`
    /// for a taken email.
    async fn insert(&self, patient: Patient) -> Result<Patient, PatientError>;

    async fn fetch(&self, patient_id: Uuid) -> Result<Option<Patient>, PatientError>;
}

#[derive(Default)]
pub struct InMemoryPatientStore {
    patients: RwLock<HashMap<Uuid, Patient>>,
}

impl InMemoryPatientStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PatientStore for InMemoryPatientStore {
    async fn insert(&self, patient: Patient) -> Result<Patient, PatientError> {
        let mut patients = self.patients.write().await;
        if patients.contains_key(&patient.id) {
            return Err(PatientError::AlreadyExists);
        }
        if patients.values().any(|p| p.email == patient.email) {
            return Err(PatientError::EmailAlreadyExists { email: patient.email });
        }

        patients.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn fetch(&self, patient_id: Uuid) -> Result<Option<Patient>, PatientError> {
        Ok(self.patients.read().await.get(&patient_id).cloned())
    }
}
