// libs/appointment-cell/src/services/grid.rs
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use shared_config::SchedulingConfig;

use crate::models::AppointmentError;

/// Canonical business-hours grid every provider is booked against.
#[derive(Debug, Clone)]
pub struct SlotGrid {
    opening_time: NaiveTime,
    closing_time: NaiveTime,
    interval_minutes: u32,
    window_days: u32,
    max_advance_days: u32,
}

impl SlotGrid {
    pub fn from_config(config: &SchedulingConfig) -> Self {
        Self {
            opening_time: config.opening_time,
            closing_time: config.closing_time,
            interval_minutes: config.slot_interval_minutes.max(1),
            window_days: config.booking_window_days.max(1),
            max_advance_days: config.max_advance_booking_days,
        }
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    pub fn max_advance_days(&self) -> u32 {
        self.max_advance_days
    }

    /// All markers of a full business day, opening inclusive, closing exclusive.
    pub fn daily_markers(&self) -> Vec<NaiveTime> {
        let step = Duration::minutes(i64::from(self.interval_minutes));
        let mut markers = Vec::new();
        let mut current = self.opening_time;

        while current < self.closing_time {
            markers.push(current);
            let (next, wrapped) = current.overflowing_add_signed(step);
            if wrapped != 0 {
                break;
            }
            current = next;
        }

        markers
    }

    /// Markers still bookable on `date` as seen at `now`: none for past days,
    /// only strictly later times for today.
    pub fn markers_for(&self, date: NaiveDate, now: NaiveDateTime) -> Vec<NaiveTime> {
        let today = now.date();
        if date < today {
            return Vec::new();
        }

        let markers = self.daily_markers();
        if date > today {
            return markers;
        }

        markers.into_iter().filter(|marker| *marker > now.time()).collect()
    }

    pub fn is_on_grid(&self, time: NaiveTime) -> bool {
        if time.second() != 0 || time.nanosecond() != 0 {
            return false;
        }
        if time < self.opening_time || time >= self.closing_time {
            return false;
        }

        let offset = (time - self.opening_time).num_minutes();
        offset % i64::from(self.interval_minutes) == 0
    }

    pub fn validate(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        now: NaiveDateTime,
    ) -> Result<(), AppointmentError> {
        let today = now.date();

        if date < today {
            return Err(AppointmentError::ValidationError(format!(
                "Appointment date {} is in the past",
                date
            )));
        }

        if (date - today).num_days() > i64::from(self.max_advance_days) {
            return Err(AppointmentError::ValidationError(format!(
                "Appointments can be booked at most {} days ahead",
                self.max_advance_days
            )));
        }

        if !self.is_on_grid(time) {
            return Err(AppointmentError::ValidationError(format!(
                "{} is not a bookable time; slots run every {} minutes from {} to {}",
                time.format("%H:%M"),
                self.interval_minutes,
                self.opening_time.format("%H:%M"),
                self.closing_time.format("%H:%M")
            )));
        }

        if date == today && time <= now.time() {
            return Err(AppointmentError::ValidationError(format!(
                "{} has already passed today",
                time.format("%H:%M")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn grid() -> SlotGrid {
        SlotGrid::from_config(&SchedulingConfig::default())
    }

    fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        date.and_hms_opt(h, m, 0).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_daily_markers_cover_business_hours() {
        let markers = grid().daily_markers();
        assert_eq!(markers.first(), Some(&t(10, 0)));
        assert_eq!(markers.last(), Some(&t(20, 30)));
        assert_eq!(markers.len(), 22);
    }

    #[test]
    fn test_today_excludes_past_times() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let markers = grid().markers_for(today, at(today, 14, 10));

        assert_eq!(markers.first(), Some(&t(14, 30)));
        assert!(!markers.contains(&t(14, 0)));

        let tomorrow = today.succ_opt().unwrap();
        assert_eq!(grid().markers_for(tomorrow, at(today, 14, 10)).len(), 22);

        let yesterday = today.pred_opt().unwrap();
        assert!(grid().markers_for(yesterday, at(today, 14, 10)).is_empty());
    }

    #[test]
    fn test_validate_rejects_off_grid_and_past() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let now = at(today, 12, 0);
        let grid = grid();

        assert!(grid.validate(today, t(12, 30), now).is_ok());
        assert_matches!(grid.validate(today, t(12, 0), now), Err(AppointmentError::ValidationError(_)));
        assert_matches!(grid.validate(today, t(12, 15), now), Err(AppointmentError::ValidationError(_)));
        assert_matches!(grid.validate(today, t(9, 30), now), Err(AppointmentError::ValidationError(_)));
        assert_matches!(grid.validate(today, t(21, 0), now), Err(AppointmentError::ValidationError(_)));
        assert_matches!(
            grid.validate(today.pred_opt().unwrap(), t(15, 0), now),
            Err(AppointmentError::ValidationError(_))
        );
        assert_matches!(
            grid.validate(today + Duration::days(91), t(15, 0), now),
            Err(AppointmentError::ValidationError(_))
        );
    }
}
