use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::actor_from;

use crate::models::CreatePatientRequest;
use crate::services::PatientRegistry;

pub struct PatientState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<PatientRegistry>,
}

#[axum::debug_handler]
pub async fn create_patient_profile(
    State(state): State<Arc<PatientState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let patient = state.registry.create_profile(&actor, request).await?;

    Ok(Json(json!({
        "success": true,
        "patient": patient
    })))
}

#[axum::debug_handler]
pub async fn get_patient_profile(
    State(state): State<Arc<PatientState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let patient = state.registry.get_patient(&actor, actor.id).await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<PatientState>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let patient = state.registry.get_patient(&actor, patient_id).await?;

    Ok(Json(json!(patient)))
}
