use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::{appointment_routes, AppointmentState};
use patient_cell::{create_patient_router, PatientState};
use provider_cell::{handlers::ProviderState, provider_routes};

/// Per-cell state handed to each nested router.
pub struct CellStates {
    pub providers: Arc<ProviderState>,
    pub patients: Arc<PatientState>,
    pub appointments: Arc<AppointmentState>,
}

pub fn create_router(cells: &CellStates) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .nest("/providers", provider_routes(cells.providers.clone()))
        .nest("/patients", create_patient_router(cells.patients.clone()))
        .nest("/appointments", appointment_routes(cells.appointments.clone()))
}
