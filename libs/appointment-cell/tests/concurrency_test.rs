// libs/appointment-cell/tests/concurrency_test.rs
mod common;

use std::sync::Arc;

use futures::future::join_all;

use appointment_cell::models::{AppointmentError, ReservationKey};
use appointment_cell::services::{AppointmentStore, ReservationCoordinator};
use shared_config::SchedulingConfig;
use shared_models::auth::Actor;

use common::{at, june_first, seed_patient, Clinic};

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_bookings_for_one_slot_have_one_winner() {
    let clinic = Clinic::new().await;

    let mut patients = Vec::new();
    for n in 0..24 {
        patients.push(seed_patient(&clinic.patients, &format!("patient{}@example.com", n)).await);
    }

    let attempts = patients.iter().map(|patient_id| {
        let booking = Arc::clone(&clinic.state.booking);
        let request = clinic.request(*patient_id, june_first(), at(10, 0));
        tokio::spawn(async move { booking.book(request).await })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(AppointmentError::SlotUnavailable)))
            .count(),
        patients.len() - 1
    );

    let stored = clinic.store.list_by_provider(clinic.provider.id).await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_slots_do_not_contend() {
    let clinic = Clinic::new().await;
    let times = [at(10, 0), at(10, 30), at(11, 0), at(11, 30), at(12, 0)];

    let attempts = times.iter().map(|time| {
        let booking = Arc::clone(&clinic.state.booking);
        let request = clinic.request(clinic.patient_a, june_first(), *time);
        tokio::spawn(async move { booking.book(request).await })
    });

    let results = join_all(attempts).await;
    assert!(results.into_iter().all(|joined| joined.unwrap().is_ok()));
    assert_eq!(clinic.state.coordinator.stats().contended, 0);
}

#[tokio::test]
async fn test_restore_rebuilds_taken_slots() {
    let clinic = Clinic::new().await;
    let patient = Actor::patient(clinic.patient_a);

    let kept = clinic
        .state
        .booking
        .book(clinic.request(clinic.patient_a, june_first(), at(10, 0)))
        .await
        .unwrap();
    let cancelled = clinic
        .state
        .booking
        .book(clinic.request(clinic.patient_a, june_first(), at(10, 30)))
        .await
        .unwrap();
    clinic.state.lifecycle.cancel(cancelled.id, &patient).await.unwrap();

    let restarted = ReservationCoordinator::new(&SchedulingConfig::default());
    let report = restarted.restore(&clinic.store.list_all().await.unwrap()).await;

    assert_eq!(report.restored, 1);
    assert_eq!(report.skipped, 0);
    assert!(restarted.is_taken(kept.reservation_key()).await);
    assert!(
        !restarted
            .is_taken(ReservationKey::new(clinic.provider.id, june_first(), at(10, 30)))
            .await
    );

    // A second pass over the same rows collides with itself and is skipped.
    let again = restarted.restore(&clinic.store.list_all().await.unwrap()).await;
    assert_eq!(again.restored, 0);
    assert_eq!(again.skipped, 1);
}
