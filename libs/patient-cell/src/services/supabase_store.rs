use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{Patient, PatientError};
use crate::services::store::PatientStore;

const PATIENTS_PATH: &str = "/rest/v1/patients";

/// Patient profiles in the hosted `patients` table, which carries unique
/// constraints on `id` and `email`.
pub struct SupabasePatientStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabasePatientStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

fn parse_rows(rows: Vec<Value>) -> Result<Vec<Patient>, PatientError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Patient>, _>>()
        .map_err(|e| PatientError::Storage(format!("Failed to parse patients: {}", e)))
}

#[async_trait]
impl PatientStore for SupabasePatientStore {
    async fn insert(&self, patient: Patient) -> Result<Patient, PatientError> {
        let body = serde_json::to_value(&patient)
            .map_err(|e| PatientError::Storage(format!("Failed to encode patient: {}", e)))?;

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                PATIENTS_PATH,
                None,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(|err| {
                let message = err.to_string();
                if !message.starts_with("Conflict") {
                    PatientError::Storage(message)
                } else if message.contains("email") {
                    PatientError::EmailAlreadyExists { email: patient.email.clone() }
                } else {
                    PatientError::AlreadyExists
                }
            })?;

        debug!("Patient {} row inserted", patient.id);
        parse_rows(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| PatientError::Storage("Insert returned no patient row".to_string()))
    }

    async fn fetch(&self, patient_id: Uuid) -> Result<Option<Patient>, PatientError> {
        let path = format!("{}?id=eq.{}", PATIENTS_PATH, patient_id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|err| PatientError::Storage(err.to_string()))?;

        Ok(parse_rows(rows)?.into_iter().next())
    }
}
