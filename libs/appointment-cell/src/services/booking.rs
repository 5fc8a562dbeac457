// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::{error, info, instrument, warn, Instrument};
use uuid::Uuid;

use patient_cell::PatientDirectory;
use provider_cell::services::{ProviderAvailabilityGate, ProviderDirectory};
use shared_utils::clock::Clock;

use crate::models::{
    Appointment, AppointmentError, BookAppointmentRequest, BookableSlot, ReservationKey,
};
use crate::services::coordinator::ReservationCoordinator;
use crate::services::grid::SlotGrid;
use crate::services::notification::LifecycleNotifier;
use crate::services::store::{AppointmentStore, StoreError};

pub struct BookingService {
    providers: Arc<dyn ProviderDirectory>,
    gate: Arc<ProviderAvailabilityGate>,
    patients: Arc<dyn PatientDirectory>,
    coordinator: Arc<ReservationCoordinator>,
    store: Arc<dyn AppointmentStore>,
    notifier: Arc<dyn LifecycleNotifier>,
    grid: SlotGrid,
    clock: Arc<dyn Clock>,
    utc_offset_minutes: i32,
}

pub struct BookingDeps {
    pub providers: Arc<dyn ProviderDirectory>,
    pub gate: Arc<ProviderAvailabilityGate>,
    pub patients: Arc<dyn PatientDirectory>,
    pub coordinator: Arc<ReservationCoordinator>,
    pub store: Arc<dyn AppointmentStore>,
    pub notifier: Arc<dyn LifecycleNotifier>,
    pub clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(deps: BookingDeps, grid: SlotGrid, utc_offset_minutes: i32) -> Self {
        Self {
            providers: deps.providers,
            gate: deps.gate,
            patients: deps.patients,
            coordinator: deps.coordinator,
            store: deps.store,
            notifier: deps.notifier,
            grid,
            clock: deps.clock,
            utc_offset_minutes,
        }
    }

    /// Books one slot: either the slot becomes taken and exactly one appointment
    /// is stored, or neither happens.
    #[instrument(skip(self, request), fields(provider_id = %request.provider_id, patient_id = %request.patient_id))]
    pub async fn book(&self, request: BookAppointmentRequest) -> Result<Appointment, AppointmentError> {
        let now = self.clock.local_now(self.utc_offset_minutes);
        self.grid.validate(request.slot_date, request.slot_time, now)?;

        if !self.patients.exists(request.patient_id).await? {
            return Err(AppointmentError::PatientNotFound);
        }

        let provider = self
            .providers
            .find_provider(request.provider_id)
            .await?
            .ok_or(AppointmentError::ProviderNotFound)?;

        if !self.gate.accepting_bookings(provider.id).await? {
            return Err(AppointmentError::ProviderUnavailable);
        }

        let appointment_id = Uuid::new_v4();
        let key = ReservationKey::new(provider.id, request.slot_date, request.slot_time);
        let created_at = self.clock.now();
        let appointment = Appointment {
            id: appointment_id,
            patient_id: request.patient_id,
            provider_id: provider.id,
            provider_name: provider.name.clone(),
            provider_speciality: provider.speciality.clone(),
            provider_fee: provider.fee,
            slot_date: request.slot_date,
            slot_time: request.slot_time,
            amount: provider.fee,
            cancelled: false,
            completed: false,
            paid: false,
            created_at,
            updated_at: created_at,
        };

        // The reserve-then-store step runs on its own task so a caller that
        // goes away mid-booking cannot strand a taken slot.
        let commit = tokio::spawn(
            reserve_and_store(Arc::clone(&self.coordinator), Arc::clone(&self.store), appointment)
                .in_current_span(),
        );
        let saved = commit.await.map_err(|err| {
            error!("Booking task for {} ended abnormally: {}", key, err);
            AppointmentError::PersistenceFailure(format!("booking task failed: {}", err))
        })??;

        info!(
            "Appointment {} booked: patient {} with provider {} at {}",
            saved.id, saved.patient_id, saved.provider_id, key
        );

        if let Err(err) = self.notifier.appointment_booked(&saved).await {
            warn!("Booking notification for {} failed: {}", saved.id, err);
        }

        Ok(saved)
    }

    /// Grid markers minus taken ones, from `from` (default today) for `days`
    /// days (default booking window), capped at the advance-booking horizon.
    pub async fn list_bookable_slots(
        &self,
        provider_id: Uuid,
        from: Option<NaiveDate>,
        days: Option<u32>,
    ) -> Result<Vec<BookableSlot>, AppointmentError> {
        if self.providers.find_provider(provider_id).await?.is_none() {
            return Err(AppointmentError::ProviderNotFound);
        }

        let now = self.clock.local_now(self.utc_offset_minutes);
        let today = now.date();
        let horizon = today + Duration::days(i64::from(self.grid.max_advance_days()));

        let start = from.unwrap_or(today).max(today);
        let span = days.unwrap_or_else(|| self.grid.window_days()).max(1);

        let dates: Vec<NaiveDate> = start
            .iter_days()
            .take(span as usize)
            .take_while(|date| *date <= horizon)
            .collect();

        let taken = self.coordinator.taken_on_days(provider_id, &dates).await;

        let slots = dates
            .iter()
            .flat_map(|date| {
                let taken_today = taken.get(date);
                self.grid
                    .markers_for(*date, now)
                    .into_iter()
                    .filter(move |time| taken_today.map_or(true, |t| !t.contains(time)))
                    .map(move |time| BookableSlot { date: *date, time })
            })
            .collect();

        Ok(slots)
    }
}

/// Claims the slot for `appointment` and stores it. A failed write gives the
/// slot back before the error is returned.
async fn reserve_and_store(
    coordinator: Arc<ReservationCoordinator>,
    store: Arc<dyn AppointmentStore>,
    appointment: Appointment,
) -> Result<Appointment, AppointmentError> {
    let key = appointment.reservation_key();
    let appointment_id = appointment.id;
    let mut reservation = coordinator.try_reserve(key, appointment_id).await?;

    match store.create(appointment).await {
        Ok(saved) => {
            coordinator.confirm(&mut reservation);
            Ok(saved)
        }
        Err(err) => {
            coordinator.release(&mut reservation).await;
            Err(match err {
                StoreError::Conflict(reason) => {
                    error!("Store rejected {} although the calendar granted it: {}", key, reason);
                    AppointmentError::InvariantViolation(reason)
                }
                other => {
                    error!("Persisting appointment {} for {} failed: {}", appointment_id, key, other);
                    other.into()
                }
            })
        }
    }
}
