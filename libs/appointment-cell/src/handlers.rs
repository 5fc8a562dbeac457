// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use patient_cell::PatientRegistry;
use provider_cell::services::{ProviderAvailabilityGate, ProviderRegistry};
use shared_config::AppConfig;
use shared_models::auth::{ActorRole, User};
use shared_models::error::AppError;
use shared_utils::clock::Clock;
use shared_utils::extractor::actor_from;

use crate::models::{AppointmentListQuery, BookAppointmentRequest, SlotQuery};
use crate::services::{
    AppointmentQueries, AppointmentStore, BookingDeps, BookingService, LifecycleManager,
    LifecycleNotifier, ReservationCoordinator, SlotGrid, TracingNotifier,
};

/// Everything the appointment routes share. The coordinator is exposed so the
/// binary can restore calendars from the store before serving traffic.
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub booking: Arc<BookingService>,
    pub lifecycle: Arc<LifecycleManager>,
    pub queries: Arc<AppointmentQueries>,
    pub coordinator: Arc<ReservationCoordinator>,
    pub gate: Arc<ProviderAvailabilityGate>,
}

impl AppointmentState {
    pub fn new(
        config: Arc<AppConfig>,
        providers: Arc<ProviderRegistry>,
        patients: Arc<PatientRegistry>,
        store: Arc<dyn AppointmentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_notifier(config, providers, patients, store, clock, Arc::new(TracingNotifier))
    }

    pub fn with_notifier(
        config: Arc<AppConfig>,
        providers: Arc<ProviderRegistry>,
        patients: Arc<PatientRegistry>,
        store: Arc<dyn AppointmentStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn LifecycleNotifier>,
    ) -> Self {
        let scheduling = &config.scheduling;
        let coordinator = Arc::new(ReservationCoordinator::new(scheduling));
        let gate = Arc::new(ProviderAvailabilityGate::new(Arc::clone(&providers)));

        let booking = BookingService::new(
            BookingDeps {
                providers: providers.clone(),
                gate: Arc::clone(&gate),
                patients,
                coordinator: Arc::clone(&coordinator),
                store: Arc::clone(&store),
                notifier: Arc::clone(&notifier),
                clock: Arc::clone(&clock),
            },
            SlotGrid::from_config(scheduling),
            scheduling.utc_offset_minutes,
        );
        let lifecycle = LifecycleManager::new(
            Arc::clone(&store),
            Arc::clone(&coordinator),
            notifier,
            clock,
        );
        let queries = AppointmentQueries::new(store, providers);

        Self {
            config,
            booking: Arc::new(booking),
            lifecycle: Arc::new(lifecycle),
            queries: Arc::new(queries),
            coordinator,
            gate,
        }
    }
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_bookable_slots(
    State(state): State<Arc<AppointmentState>>,
    Path(provider_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = state
        .booking
        .list_bookable_slots(provider_id, query.from, query.days)
        .await?;
    let accepting = state.gate.accepting_bookings(provider_id).await?;

    Ok(Json(json!({
        "success": true,
        "provider_id": provider_id,
        "accepting_bookings": accepting,
        "slots": slots,
        "total": slots.len()
    })))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;

    if !actor.is_admin() && !actor.is(ActorRole::Patient, request.patient_id) {
        return Err(AppError::Forbidden(
            "Patients can only book appointments for themselves".to_string(),
        ));
    }

    let appointment = state.booking.book(request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked"
    })))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let filter = AppointmentQueries::resolve_filter(&actor, &query)?;
    let appointments = state.queries.list(&actor, filter).await?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let appointment = state.queries.get(&actor, appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let appointment = state.lifecycle.cancel(appointment_id, &actor).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let appointment = state.lifecycle.complete(appointment_id, &actor).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment completed"
    })))
}

#[axum::debug_handler]
pub async fn pay_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let appointment = state.lifecycle.mark_paid(appointment_id, &actor).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Payment recorded"
    })))
}

#[axum::debug_handler]
pub async fn provider_dashboard(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let dashboard = state.queries.provider_dashboard(&actor).await?;

    Ok(Json(json!({
        "success": true,
        "dashboard": dashboard
    })))
}

#[axum::debug_handler]
pub async fn admin_dashboard(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let dashboard = state.queries.admin_dashboard(&actor).await?;

    Ok(Json(json!({
        "success": true,
        "dashboard": dashboard
    })))
}

#[axum::debug_handler]
pub async fn reservation_stats(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    if !actor.is_admin() {
        return Err(AppError::Forbidden("Administrator access required".to_string()));
    }

    let stats = state.coordinator.stats();
    debug!("Reservation stats requested: {:?}", stats);

    Ok(Json(json!({
        "success": true,
        "stats": stats
    })))
}
