// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use std::fmt;
use tracing::error;

use patient_cell::PatientError;
use provider_cell::ProviderError;
use shared_models::error::AppError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub provider_name: String,
    pub provider_speciality: String,
    /// Provider fee as it stood when the appointment was booked.
    pub provider_fee: f64,
    pub slot_date: NaiveDate,
    pub slot_time: NaiveTime,
    pub amount: f64,
    pub cancelled: bool,
    pub completed: bool,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn status(&self) -> AppointmentStatus {
        self.facets().status()
    }

    pub fn facets(&self) -> StatusFacets {
        StatusFacets {
            cancelled: self.cancelled,
            completed: self.completed,
            paid: self.paid,
        }
    }

    pub fn apply_facets(&mut self, facets: StatusFacets) {
        self.cancelled = facets.cancelled;
        self.completed = facets.completed;
        self.paid = facets.paid;
    }

    /// Active appointments hold their slot in the provider's calendar.
    pub fn is_active(&self) -> bool {
        !self.cancelled
    }

    pub fn reservation_key(&self) -> ReservationKey {
        ReservationKey::new(self.provider_id, self.slot_date, self.slot_time)
    }
}

/// The three independent status flags persisted on every appointment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFacets {
    pub cancelled: bool,
    pub completed: bool,
    pub paid: bool,
}

impl StatusFacets {
    pub fn status(&self) -> AppointmentStatus {
        if self.cancelled {
            AppointmentStatus::Cancelled
        } else if self.completed {
            AppointmentStatus::Completed
        } else {
            AppointmentStatus::Booked
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Booked,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::Completed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Booked => write!(f, "booked"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Unit of mutual exclusion for slot reservations. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationKey {
    pub provider_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl ReservationKey {
    pub fn new(provider_id: Uuid, date: NaiveDate, time: NaiveTime) -> Self {
        Self { provider_id, date, time }
    }

    /// Day/month/year calendar key, e.g. `1_6_2025`.
    pub fn calendar_key(&self) -> String {
        format!("{}_{}_{}", self.date.day(), self.date.month(), self.date.year())
    }
}

impl fmt::Display for ReservationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}#{}", self.provider_id, self.calendar_key(), self.time.format("%H:%M"))
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub slot_date: NaiveDate,
    pub slot_time: NaiveTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "by", content = "id", rename_all = "snake_case")]
pub enum AppointmentFilter {
    Patient(Uuid),
    Provider(Uuid),
    All,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentListQuery {
    pub patient_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotQuery {
    pub from: Option<NaiveDate>,
    pub days: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct BookableSlot {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

// ==============================================================================
// STATISTICS AND DASHBOARD MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDashboard {
    pub provider_id: Uuid,
    pub earnings: f64,
    pub appointments: usize,
    pub patients: usize,
    pub latest_appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminDashboard {
    pub providers: usize,
    pub appointments: usize,
    pub patients: usize,
    pub latest_appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReservationStats {
    pub granted: u64,
    pub confirmed: u64,
    pub released: u64,
    pub contended: u64,
    pub timed_out: u64,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Slot is already booked")]
    SlotUnavailable,

    #[error("Provider is not accepting bookings")]
    ProviderUnavailable,

    #[error("Appointment not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Provider not found")]
    ProviderNotFound,

    #[error("Not permitted: {0}")]
    Forbidden(String),

    #[error("Appointment is already {0}")]
    AlreadyTerminal(AppointmentStatus),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl AppointmentError {
    /// Expected outcomes that are reported back to the caller as-is.
    pub fn is_expected(&self) -> bool {
        !matches!(
            self,
            AppointmentError::InvariantViolation(_) | AppointmentError::PersistenceFailure(_)
        )
    }
}

impl From<ProviderError> for AppointmentError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound => AppointmentError::ProviderNotFound,
            ProviderError::Forbidden(msg) => AppointmentError::Forbidden(msg),
            ProviderError::ValidationError(msg) => AppointmentError::ValidationError(msg),
            ProviderError::AlreadyExists(id) => {
                AppointmentError::ValidationError(format!("Provider {} already exists", id))
            }
            ProviderError::Storage(msg) => AppointmentError::PersistenceFailure(msg),
        }
    }
}

impl From<PatientError> for AppointmentError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppointmentError::PatientNotFound,
            PatientError::Unauthorized => AppointmentError::Forbidden(err.to_string()),
            PatientError::Storage(msg) => AppointmentError::PersistenceFailure(msg),
            other => AppointmentError::ValidationError(other.to_string()),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::NotFound
            | AppointmentError::PatientNotFound
            | AppointmentError::ProviderNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::Forbidden(msg) => AppError::Forbidden(msg),
            AppointmentError::SlotUnavailable
            | AppointmentError::ProviderUnavailable
            | AppointmentError::AlreadyTerminal(_) => AppError::Conflict(err.to_string()),
            AppointmentError::InvariantViolation(_) | AppointmentError::PersistenceFailure(_) => {
                error!("Appointment engine failure: {}", err);
                AppError::Internal("Unable to process the appointment right now".to_string())
            }
        }
    }
}
