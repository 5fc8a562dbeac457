// libs/appointment-cell/src/services/coordinator.rs
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use shared_config::SchedulingConfig;

use crate::models::{Appointment, AppointmentError, ReservationKey, ReservationStats};
use crate::services::calendar::SlotCalendar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationState {
    Held,
    Confirmed,
    Released,
}

/// Handle for a claimed slot. Only the coordinator moves it between states.
#[derive(Debug)]
pub struct Reservation {
    key: ReservationKey,
    holder: Uuid,
    state: ReservationState,
}

impl Reservation {
    pub fn key(&self) -> ReservationKey {
        self.key
    }

    pub fn holder(&self) -> Uuid {
        self.holder
    }

    pub fn state(&self) -> ReservationState {
        self.state
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.state == ReservationState::Held {
            warn!(
                "Reservation {} for holder {} dropped while still held",
                self.key, self.holder
            );
        }
    }
}

#[derive(Debug, Default)]
struct ReservationCounters {
    granted: AtomicU64,
    confirmed: AtomicU64,
    released: AtomicU64,
    contended: AtomicU64,
    timed_out: AtomicU64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    pub skipped: usize,
}

/// The only path that mutates provider calendars.
///
/// Every provider owns one calendar behind its own mutex. The check and the
/// mark happen under that mutex with no await in between, so concurrent
/// reservations for one key are totally ordered and unrelated providers never
/// wait on each other. Lock acquisition is bounded: after `max_attempts`
/// timed-out waits the caller gets `SlotUnavailable` instead of queuing.
pub struct ReservationCoordinator {
    calendars: RwLock<HashMap<Uuid, Arc<Mutex<SlotCalendar>>>>,
    max_attempts: u32,
    lock_wait: Duration,
    counters: ReservationCounters,
}

impl ReservationCoordinator {
    pub fn new(config: &SchedulingConfig) -> Self {
        Self::with_limits(
            config.reservation_max_attempts,
            Duration::from_millis(config.reservation_lock_wait_ms),
        )
    }

    pub fn with_limits(max_attempts: u32, lock_wait: Duration) -> Self {
        Self {
            calendars: RwLock::new(HashMap::new()),
            max_attempts: max_attempts.max(1),
            lock_wait,
            counters: ReservationCounters::default(),
        }
    }

    async fn calendar_for(&self, provider_id: Uuid) -> Arc<Mutex<SlotCalendar>> {
        if let Some(calendar) = self.calendars.read().await.get(&provider_id) {
            return Arc::clone(calendar);
        }

        let mut calendars = self.calendars.write().await;
        Arc::clone(calendars.entry(provider_id).or_default())
    }

    async fn existing_calendar(&self, provider_id: Uuid) -> Option<Arc<Mutex<SlotCalendar>>> {
        self.calendars.read().await.get(&provider_id).cloned()
    }

    /// Claims `key` for `holder`, or fails with `SlotUnavailable` without side effects.
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn try_reserve(
        &self,
        key: ReservationKey,
        holder: Uuid,
    ) -> Result<Reservation, AppointmentError> {
        let calendar = self.calendar_for(key.provider_id).await;

        for attempt in 1..=self.max_attempts {
            let mut guard = match tokio::time::timeout(self.lock_wait, calendar.lock()).await {
                Ok(guard) => guard,
                Err(_) => {
                    self.counters.timed_out.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "Calendar lock busy for {}, attempt {}/{}",
                        key, attempt, self.max_attempts
                    );
                    if attempt < self.max_attempts {
                        tokio::time::sleep(Duration::from_millis(10 * u64::from(attempt))).await;
                    }
                    continue;
                }
            };

            if guard.is_taken(key.date, key.time) {
                self.counters.contended.fetch_add(1, Ordering::Relaxed);
                debug!("Slot {} already taken, refusing holder {}", key, holder);
                return Err(AppointmentError::SlotUnavailable);
            }

            guard.mark_taken(key.date, key.time, holder)?;
            self.counters.granted.fetch_add(1, Ordering::Relaxed);
            debug!("Slot {} reserved for holder {}", key, holder);

            return Ok(Reservation {
                key,
                holder,
                state: ReservationState::Held,
            });
        }

        warn!("Giving up on {} after {} attempts", key, self.max_attempts);
        Err(AppointmentError::SlotUnavailable)
    }

    /// Bookkeeping only; the slot stays taken.
    pub fn confirm(&self, reservation: &mut Reservation) {
        if reservation.state == ReservationState::Held {
            reservation.state = ReservationState::Confirmed;
            self.counters.confirmed.fetch_add(1, Ordering::Relaxed);
            debug!("Reservation {} confirmed for {}", reservation.key, reservation.holder);
        }
    }

    /// Frees the reservation's slot. Releasing twice is a no-op.
    pub async fn release(&self, reservation: &mut Reservation) {
        if reservation.state == ReservationState::Released {
            return;
        }

        self.release_slot(reservation.key, reservation.holder).await;
        reservation.state = ReservationState::Released;
    }

    /// Frees `key` only while `holder` still owns it. Returns whether a marker was freed.
    ///
    /// Waits for the lock without a deadline: a release that gives up would
    /// leak a taken slot for good.
    pub async fn release_slot(&self, key: ReservationKey, holder: Uuid) -> bool {
        let Some(calendar) = self.existing_calendar(key.provider_id).await else {
            return false;
        };

        let mut guard = calendar.lock().await;
        match guard.holder(key.date, key.time) {
            Some(current) if current == holder => {
                guard.mark_free(key.date, key.time);
                self.counters.released.fetch_add(1, Ordering::Relaxed);
                debug!("Slot {} released by {}", key, holder);
                true
            }
            Some(current) => {
                warn!(
                    "Ignoring release of {} by {}: slot now held by {}",
                    key, holder, current
                );
                false
            }
            None => {
                debug!("Slot {} already free", key);
                false
            }
        }
    }

    pub async fn is_taken(&self, key: ReservationKey) -> bool {
        match self.existing_calendar(key.provider_id).await {
            Some(calendar) => calendar.lock().await.is_taken(key.date, key.time),
            None => false,
        }
    }

    /// Point-in-time copy of the taken markers on `dates`, taken under one lock.
    pub async fn taken_on_days(
        &self,
        provider_id: Uuid,
        dates: &[NaiveDate],
    ) -> HashMap<NaiveDate, Vec<NaiveTime>> {
        let Some(calendar) = self.existing_calendar(provider_id).await else {
            return HashMap::new();
        };

        let guard = calendar.lock().await;
        dates
            .iter()
            .map(|date| (*date, guard.taken_on(*date)))
            .filter(|(_, times)| !times.is_empty())
            .collect()
    }

    /// Rebuilds calendars from persisted appointments. Cancelled ones are ignored.
    pub async fn restore(&self, appointments: &[Appointment]) -> RestoreReport {
        let mut report = RestoreReport::default();

        for appointment in appointments.iter().filter(|a| a.is_active()) {
            let key = appointment.reservation_key();
            let calendar = self.calendar_for(key.provider_id).await;
            let mut guard = calendar.lock().await;

            match guard.mark_taken(key.date, key.time, appointment.id) {
                Ok(()) => report.restored += 1,
                Err(err) => {
                    error!("Skipping appointment {} during restore: {}", appointment.id, err);
                    report.skipped += 1;
                }
            }
        }

        info!(
            "Restored {} taken slots ({} skipped)",
            report.restored, report.skipped
        );
        report
    }

    pub fn stats(&self) -> ReservationStats {
        ReservationStats {
            granted: self.counters.granted.load(Ordering::Relaxed),
            confirmed: self.counters.confirmed.load(Ordering::Relaxed),
            released: self.counters.released.load(Ordering::Relaxed),
            contended: self.counters.contended.load(Ordering::Relaxed),
            timed_out: self.counters.timed_out.load(Ordering::Relaxed),
        }
    }
}
