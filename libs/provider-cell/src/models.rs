use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provider {
    pub id: Uuid,
    pub name: String,
    pub speciality: String,
    pub fee: f64,
    pub accepting_bookings: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Provider {
    pub fn new(id: Uuid, name: impl Into<String>, speciality: impl Into<String>, fee: f64) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            speciality: speciality.into(),
            fee,
            accepting_bookings: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Public listing view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSummary {
    pub id: Uuid,
    pub name: String,
    pub speciality: String,
    pub fee: f64,
    pub accepting_bookings: bool,
}

impl From<&Provider> for ProviderSummary {
    fn from(provider: &Provider) -> Self {
        Self {
            id: provider.id,
            name: provider.name.clone(),
            speciality: provider.speciality.clone(),
            fee: provider.fee,
            accepting_bookings: provider.accepting_bookings,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterProviderRequest {
    /// Identity subject the provider signs in with; generated when absent.
    pub id: Option<Uuid>,
    pub name: String,
    pub speciality: String,
    pub fee: f64,
    pub accepting_bookings: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProviderRequest {
    pub fee: Option<f64>,
    pub accepting_bookings: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider not found")]
    NotFound,

    #[error("Provider already exists: {0}")]
    AlreadyExists(Uuid),

    #[error("Not permitted: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Provider storage error: {0}")]
    Storage(String),
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound => AppError::NotFound("Provider not found".to_string()),
            ProviderError::AlreadyExists(id) => AppError::Conflict(format!("Provider {} already exists", id)),
            ProviderError::Forbidden(msg) => AppError::Forbidden(msg),
            ProviderError::ValidationError(msg) => AppError::ValidationError(msg),
            ProviderError::Storage(msg) => AppError::Database(msg),
        }
    }
}
