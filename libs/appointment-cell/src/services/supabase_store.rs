// libs/appointment-cell/src/services/supabase_store.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, StatusFacets};
use crate::services::store::{AppointmentStore, StoreError};

const APPOINTMENTS_PATH: &str = "/rest/v1/appointments";

/// Appointment records kept in the hosted `appointments` table.
///
/// Status updates are conditional PATCHes filtered on the expected facet
/// values; an empty representation means another writer got there first.
/// The table is expected to carry a partial unique index on
/// `(provider_id, slot_date, slot_time) WHERE NOT cancelled`.
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn select(&self, filter: &str) -> Result<Vec<Appointment>, StoreError> {
        let path = if filter.is_empty() {
            format!("{}?order=created_at.asc", APPOINTMENTS_PATH)
        } else {
            format!("{}?{}&order=created_at.asc", APPOINTMENTS_PATH, filter)
        };

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(classify)?;

        parse_rows(rows)
    }
}

fn classify(err: anyhow::Error) -> StoreError {
    let message = err.to_string();
    if message.starts_with("Conflict") {
        StoreError::Conflict(message)
    } else if message.starts_with("Resource not found") {
        StoreError::NotFound
    } else {
        StoreError::Backend(message)
    }
}

fn parse_rows(rows: Vec<Value>) -> Result<Vec<Appointment>, StoreError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Appointment>, _>>()
        .map_err(|e| StoreError::Backend(format!("Failed to parse appointments: {}", e)))
}

fn facet_filter(expected: StatusFacets) -> String {
    format!(
        "cancelled=eq.{}&completed=eq.{}&paid=eq.{}",
        expected.cancelled, expected.completed, expected.paid
    )
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn create(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        let body = serde_json::to_value(&appointment)
            .map_err(|e| StoreError::Backend(format!("Failed to encode appointment: {}", e)))?;

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                APPOINTMENTS_PATH,
                None,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(classify)?;

        let created = parse_rows(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("Insert returned no row".to_string()))?;

        info!("Appointment {} persisted", created.id);
        Ok(created)
    }

    async fn fetch(&self, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let mut rows = self.select(&format!("id=eq.{}", appointment_id)).await?;
        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }

    async fn update_status(
        &self,
        appointment_id: Uuid,
        expected: StatusFacets,
        next: StatusFacets,
        updated_at: DateTime<Utc>,
    ) -> Result<Appointment, StoreError> {
        let path = format!(
            "{}?id=eq.{}&{}",
            APPOINTMENTS_PATH,
            appointment_id,
            facet_filter(expected)
        );
        let body = json!({
            "cancelled": next.cancelled,
            "completed": next.completed,
            "paid": next.paid,
            "updated_at": updated_at.to_rfc3339(),
        });

        debug!("Conditional status update for {}: {:?} -> {:?}", appointment_id, expected, next);
        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                None,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(classify)?;

        if let Some(updated) = parse_rows(rows)?.into_iter().next() {
            return Ok(updated);
        }

        // Nothing matched: either the row is gone or its facets moved on.
        match self.fetch(appointment_id).await? {
            None => Err(StoreError::NotFound),
            Some(current) => {
                warn!(
                    "Status update for {} lost the race: now {:?}",
                    appointment_id,
                    current.facets()
                );
                Err(StoreError::Conflict(format!(
                    "appointment {} changed concurrently",
                    appointment_id
                )))
            }
        }
    }

    async fn list_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        self.select(&format!("patient_id=eq.{}", patient_id)).await
    }

    async fn list_by_provider(&self, provider_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        self.select(&format!("provider_id=eq.{}", provider_id)).await
    }

    async fn list_all(&self) -> Result<Vec<Appointment>, StoreError> {
        self.select("").await
    }
}
