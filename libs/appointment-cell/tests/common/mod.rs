// libs/appointment-cell/tests/common/mod.rs
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::handlers::AppointmentState;
use appointment_cell::models::BookAppointmentRequest;
use appointment_cell::services::{AppointmentStore, InMemoryAppointmentStore, LifecycleNotifier};
use patient_cell::models::Patient;
use patient_cell::PatientRegistry;
use provider_cell::models::Provider;
use provider_cell::services::ProviderRegistry;
use shared_models::auth::Actor;
use shared_utils::clock::FixedClock;
use shared_utils::test_utils::TestConfig;

/// One provider (fee 50, accepting bookings) and two patients, with the clock
/// fixed at 2025-05-30 09:00 UTC.
pub struct Clinic {
    pub state: Arc<AppointmentState>,
    pub providers: Arc<ProviderRegistry>,
    pub patients: Arc<PatientRegistry>,
    pub store: Arc<InMemoryAppointmentStore>,
    pub clock: FixedClock,
    pub provider: Provider,
    pub patient_a: Uuid,
    pub patient_b: Uuid,
}

impl Clinic {
    pub async fn new() -> Self {
        Self::build(None, |store| store).await
    }

    pub async fn with_notifier(notifier: Arc<dyn LifecycleNotifier>) -> Self {
        Self::build(Some(notifier), |store| store).await
    }

    /// Routes every store call through `wrap`; `store` still sees the rows.
    pub async fn with_store<F>(wrap: F) -> Self
    where
        F: FnOnce(Arc<dyn AppointmentStore>) -> Arc<dyn AppointmentStore>,
    {
        Self::build(None, wrap).await
    }

    async fn build<F>(notifier: Option<Arc<dyn LifecycleNotifier>>, wrap: F) -> Self
    where
        F: FnOnce(Arc<dyn AppointmentStore>) -> Arc<dyn AppointmentStore>,
    {
        let providers = Arc::new(ProviderRegistry::new());
        let provider = providers
            .insert(Provider::new(Uuid::new_v4(), "Dr. Richard James", "General physician", 50.0))
            .await
            .unwrap();

        let patients = Arc::new(PatientRegistry::new());
        let patient_a = seed_patient(&patients, "ann@example.com").await;
        let patient_b = seed_patient(&patients, "ben@example.com").await;

        let store = Arc::new(InMemoryAppointmentStore::new());
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 5, 30, 9, 0, 0).unwrap());
        let config = TestConfig::default().to_arc();
        let shared: Arc<dyn AppointmentStore> = store.clone();
        let dyn_store = wrap(shared);

        let state = match notifier {
            Some(notifier) => AppointmentState::with_notifier(
                config,
                providers.clone(),
                patients.clone(),
                dyn_store,
                Arc::new(clock.clone()),
                notifier,
            ),
            None => AppointmentState::new(
                config,
                providers.clone(),
                patients.clone(),
                dyn_store,
                Arc::new(clock.clone()),
            ),
        };

        Self {
            state: Arc::new(state),
            providers,
            patients,
            store,
            clock,
            provider,
            patient_a,
            patient_b,
        }
    }

    pub fn request(&self, patient_id: Uuid, date: NaiveDate, time: NaiveTime) -> BookAppointmentRequest {
        BookAppointmentRequest {
            patient_id,
            provider_id: self.provider.id,
            slot_date: date,
            slot_time: time,
        }
    }

    pub fn provider_actor(&self) -> Actor {
        Actor::provider(self.provider.id)
    }
}

pub async fn seed_patient(patients: &PatientRegistry, email: &str) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    patients
        .insert(Patient {
            id,
            name: email.split('@').next().unwrap_or("patient").to_string(),
            email: email.to_string(),
            phone: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
    id
}

pub fn june_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

pub fn at(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}
