use std::sync::Arc;
use axum::{middleware, routing::get, Router};
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_patient_router(state: Arc<PatientState>) -> Router {
    Router::new()
        .route("/profile", get(get_patient_profile).post(create_patient_profile))
        .route("/{id}", get(get_patient))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
