// libs/appointment-cell/tests/supabase_store_test.rs
use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{Appointment, StatusFacets};
use appointment_cell::services::{AppointmentStore, StoreError, SupabaseAppointmentStore};
use shared_database::supabase::SupabaseClient;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn store_for(server: &MockServer) -> SupabaseAppointmentStore {
    let config = TestConfig::with_supabase_url(&server.uri()).to_app_config();
    SupabaseAppointmentStore::new(Arc::new(SupabaseClient::new(&config)))
}

fn appointment(id: Uuid, patient_id: Uuid, provider_id: Uuid) -> Appointment {
    let now = Utc::now();
    Appointment {
        id,
        patient_id,
        provider_id,
        provider_name: "Dr. Test".to_string(),
        provider_speciality: "General physician".to_string(),
        provider_fee: 50.0,
        slot_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        slot_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        amount: 50.0,
        cancelled: false,
        completed: false,
        paid: false,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn test_create_returns_representation() {
    let server = MockServer::start().await;
    let (id, patient_id, provider_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({ "id": id, "slot_time": "10:00:00" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_row(id, patient_id, provider_id, "2025-06-01", "10:00:00", 50.0)
        ])))
        .mount(&server)
        .await;

    let created = store_for(&server)
        .create(appointment(id, patient_id, provider_id))
        .await
        .unwrap();
    assert_eq!(created.id, id);
    assert_eq!(created.amount, 50.0);
}

#[tokio::test]
async fn test_unique_violation_is_conflict() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::error_response(
            "duplicate key value violates unique constraint",
            "23505",
        )))
        .mount(&server)
        .await;

    let result = store_for(&server)
        .create(appointment(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()))
        .await;
    assert_matches!(result, Err(StoreError::Conflict(_)));
}

#[tokio::test]
async fn test_fetch_missing_row() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert_eq!(store_for(&server).fetch(id).await.unwrap(), None);
}

#[tokio::test]
async fn test_conditional_update_filters_on_expected_facets() {
    let server = MockServer::start().await;
    let (id, patient_id, provider_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let mut row = MockSupabaseResponses::appointment_row(id, patient_id, provider_id, "2025-06-01", "10:00:00", 50.0);
    row["cancelled"] = json!(true);

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", id)))
        .and(query_param("cancelled", "eq.false"))
        .and(query_param("completed", "eq.false"))
        .and(query_param("paid", "eq.false"))
        .and(body_partial_json(json!({ "cancelled": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&server)
        .await;

    let updated = store_for(&server)
        .update_status(
            id,
            StatusFacets::default(),
            StatusFacets { cancelled: true, ..StatusFacets::default() },
            Utc::now(),
        )
        .await
        .unwrap();
    assert!(updated.cancelled);
}

#[tokio::test]
async fn test_conditional_update_lost_race() {
    let server = MockServer::start().await;
    let (id, patient_id, provider_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let mut current = MockSupabaseResponses::appointment_row(id, patient_id, provider_id, "2025-06-01", "10:00:00", 50.0);
    current["completed"] = json!(true);

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([current])))
        .mount(&server)
        .await;

    let result = store_for(&server)
        .update_status(
            id,
            StatusFacets::default(),
            StatusFacets { cancelled: true, ..StatusFacets::default() },
            Utc::now(),
        )
        .await;
    assert_matches!(result, Err(StoreError::Conflict(_)));
}

#[tokio::test]
async fn test_list_by_provider() {
    let server = MockServer::start().await;
    let provider_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("provider_id", format!("eq.{}", provider_id)))
        .and(query_param("order", "created_at.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(Uuid::new_v4(), Uuid::new_v4(), provider_id, "2025-06-01", "10:00:00", 50.0),
            MockSupabaseResponses::appointment_row(Uuid::new_v4(), Uuid::new_v4(), provider_id, "2025-06-01", "10:30:00", 50.0)
        ])))
        .mount(&server)
        .await;

    let rows = store_for(&server).list_by_provider(provider_id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].slot_time, NaiveTime::from_hms_opt(10, 30, 0).unwrap());
}

#[tokio::test]
async fn test_backend_error_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    assert_matches!(store_for(&server).list_all().await, Err(StoreError::Backend(_)));
}
