// libs/appointment-cell/src/services/calendar.rs
use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::models::AppointmentError;

/// Taken time markers for one provider, keyed by calendar date.
///
/// Each marker remembers which appointment holds it so that a stale release
/// can never free a slot that was re-booked in the meantime. Not synchronized:
/// only `ReservationCoordinator` touches it, under its lock.
#[derive(Debug, Default, Clone)]
pub struct SlotCalendar {
    days: BTreeMap<NaiveDate, BTreeMap<NaiveTime, Uuid>>,
}

impl SlotCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_taken(&self, date: NaiveDate, time: NaiveTime) -> bool {
        self.holder(date, time).is_some()
    }

    pub fn holder(&self, date: NaiveDate, time: NaiveTime) -> Option<Uuid> {
        self.days.get(&date).and_then(|day| day.get(&time)).copied()
    }

    pub fn mark_taken(
        &mut self,
        date: NaiveDate,
        time: NaiveTime,
        holder: Uuid,
    ) -> Result<(), AppointmentError> {
        let day = self.days.entry(date).or_default();
        if let Some(existing) = day.get(&time) {
            return Err(AppointmentError::InvariantViolation(format!(
                "slot {} {} already held by {}, refused for {}",
                date,
                time.format("%H:%M"),
                existing,
                holder
            )));
        }

        day.insert(time, holder);
        Ok(())
    }

    /// Returns whether the slot was taken. Freeing a free slot is a no-op.
    pub fn mark_free(&mut self, date: NaiveDate, time: NaiveTime) -> bool {
        let Some(day) = self.days.get_mut(&date) else {
            return false;
        };

        let freed = day.remove(&time).is_some();
        if day.is_empty() {
            self.days.remove(&date);
        }
        freed
    }

    pub fn taken_on(&self, date: NaiveDate) -> Vec<NaiveTime> {
        self.days
            .get(&date)
            .map(|day| day.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn taken_count(&self) -> usize {
        self.days.values().map(BTreeMap::len).sum()
    }
}
