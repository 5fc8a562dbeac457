use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    extract::{Extension, Path, State},
    Json,
};

use patient_cell::*;
use shared_models::error::AppError;
use shared_utils::test_utils::{TestConfig, TestUser};

fn create_state() -> Arc<PatientState> {
    Arc::new(PatientState {
        config: TestConfig::default().to_arc(),
        registry: Arc::new(PatientRegistry::new()),
    })
}

fn profile_request() -> CreatePatientRequest {
    CreatePatientRequest {
        name: "Alex Doe".to_string(),
        email: "alex@example.com".to_string(),
        phone: Some("0000000000".to_string()),
    }
}

#[tokio::test]
async fn test_patient_creates_and_reads_own_profile() {
    let state = create_state();
    let patient = TestUser::patient("alex@example.com");

    create_patient_profile(State(state.clone()), Extension(patient.to_user()), Json(profile_request()))
        .await
        .expect("profile creation should succeed");

    let profile = get_patient_profile(State(state), Extension(patient.to_user()))
        .await
        .unwrap();
    assert_eq!(profile.0["id"], patient.id);
    assert_eq!(profile.0["email"], "alex@example.com");
}

#[tokio::test]
async fn test_other_patient_cannot_read_profile() {
    let state = create_state();
    let owner = TestUser::patient("alex@example.com");
    create_patient_profile(State(state.clone()), Extension(owner.to_user()), Json(profile_request()))
        .await
        .unwrap();

    let intruder = TestUser::patient("mallory@example.com");
    let result = get_patient(
        State(state),
        Extension(intruder.to_user()),
        Path(owner.id.parse().unwrap()),
    )
    .await;
    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_missing_profile_is_not_found() {
    let state = create_state();
    let patient = TestUser::patient("nobody@example.com");

    let result = get_patient_profile(State(state), Extension(patient.to_user())).await;
    assert_matches!(result, Err(AppError::NotFound(_)));
}
