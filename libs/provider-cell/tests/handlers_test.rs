// libs/provider-cell/tests/handlers_test.rs

use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    extract::{Extension, Path, State},
    Json,
};
use uuid::Uuid;

use provider_cell::handlers::*;
use provider_cell::models::*;
use provider_cell::services::{ProviderDirectory, ProviderRegistry};
use shared_models::{auth::User, error::AppError};
use shared_utils::test_utils::{TestConfig, TestUser};

fn create_state() -> Arc<ProviderState> {
    Arc::new(ProviderState::new(
        TestConfig::default().to_arc(),
        Arc::new(ProviderRegistry::new()),
    ))
}

fn user_extension(user: &TestUser) -> Extension<User> {
    Extension(user.to_user())
}

fn register_request() -> RegisterProviderRequest {
    RegisterProviderRequest {
        id: None,
        name: "Dr. Emily Larson".to_string(),
        speciality: "Gynecologist".to_string(),
        fee: 60.0,
        accepting_bookings: Some(true),
    }
}

#[tokio::test]
async fn test_admin_registers_and_lists_provider() {
    let state = create_state();
    let admin = TestUser::admin("admin@example.com");

    let response = register_provider(
        State(state.clone()),
        user_extension(&admin),
        Json(register_request()),
    )
    .await
    .expect("admin should register providers");
    assert_eq!(response.0["success"], true);

    let listing = list_providers(State(state)).await.unwrap();
    assert_eq!(listing.0["total"], 1);
    assert_eq!(listing.0["providers"][0]["name"], "Dr. Emily Larson");
    assert_eq!(listing.0["providers"][0]["fee"], 60.0);
}

#[tokio::test]
async fn test_patient_cannot_register_provider() {
    let state = create_state();
    let patient = TestUser::patient("patient@example.com");

    let result = register_provider(State(state), user_extension(&patient), Json(register_request())).await;
    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_provider_toggles_own_availability() {
    let state = create_state();
    let provider_id = Uuid::new_v4();
    state
        .registry
        .insert(Provider::new(provider_id, "Dr. Ryan Martinez", "Pediatricians", 45.0))
        .await
        .unwrap();

    let provider_user = TestUser::with_id(provider_id, "doctor");
    let response = toggle_availability(
        State(state.clone()),
        Path(provider_id),
        user_extension(&provider_user),
    )
    .await
    .unwrap();

    assert_eq!(response.0["accepting_bookings"], false);
    assert!(!state.gate.accepting_bookings(provider_id).await.unwrap());
}

#[tokio::test]
async fn test_update_provider_fee() {
    let state = create_state();
    let provider_id = Uuid::new_v4();
    state
        .registry
        .insert(Provider::new(provider_id, "Dr. Jeffrey King", "Neurologist", 30.0))
        .await
        .unwrap();

    let admin = TestUser::admin("admin@example.com");
    update_provider(
        State(state.clone()),
        Path(provider_id),
        user_extension(&admin),
        Json(UpdateProviderRequest { fee: Some(35.5), accepting_bookings: None }),
    )
    .await
    .unwrap();

    let provider = state.registry.find_provider(provider_id).await.unwrap().unwrap();
    assert_eq!(provider.fee, 35.5);
}

#[tokio::test]
async fn test_get_unknown_provider() {
    let state = create_state();
    let result = get_provider(State(state), Path(Uuid::new_v4())).await;
    assert_matches!(result, Err(AppError::NotFound(_)));
}
