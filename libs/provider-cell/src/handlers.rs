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

use crate::models::{ProviderSummary, RegisterProviderRequest, UpdateProviderRequest};
use crate::services::{ProviderAvailabilityGate, ProviderDirectory, ProviderRegistry};

/// Shared handles behind every provider route.
pub struct ProviderState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<ProviderRegistry>,
    pub gate: Arc<ProviderAvailabilityGate>,
}

impl ProviderState {
    pub fn new(config: Arc<AppConfig>, registry: Arc<ProviderRegistry>) -> Self {
        let gate = Arc::new(ProviderAvailabilityGate::new(Arc::clone(&registry)));
        Self { config, registry, gate }
    }
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_providers(
    State(state): State<Arc<ProviderState>>,
) -> Result<Json<Value>, AppError> {
    let providers: Vec<ProviderSummary> = state
        .registry
        .list_providers()
        .await?
        .iter()
        .map(ProviderSummary::from)
        .collect();

    Ok(Json(json!({
        "success": true,
        "providers": providers,
        "total": providers.len()
    })))
}

#[axum::debug_handler]
pub async fn get_provider(
    State(state): State<Arc<ProviderState>>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let provider = state
        .registry
        .find_provider(provider_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Provider not found".to_string()))?;

    Ok(Json(json!(ProviderSummary::from(&provider))))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn register_provider(
    State(state): State<Arc<ProviderState>>,
    Extension(user): Extension<User>,
    Json(request): Json<RegisterProviderRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let provider = state.registry.register(&actor, request).await?;

    Ok(Json(json!({
        "success": true,
        "provider": provider,
        "message": "Provider added"
    })))
}

#[axum::debug_handler]
pub async fn update_provider(
    State(state): State<Arc<ProviderState>>,
    Path(provider_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateProviderRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let provider = state.registry.update_profile(&actor, provider_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "provider": provider,
        "message": "Profile updated"
    })))
}

#[axum::debug_handler]
pub async fn toggle_availability(
    State(state): State<Arc<ProviderState>>,
    Path(provider_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let provider = state.gate.toggle(&actor, provider_id).await?;

    Ok(Json(json!({
        "success": true,
        "accepting_bookings": provider.accepting_bookings,
        "message": "Availability changed"
    })))
}
