use std::env;
use std::str::FromStr;

use chrono::NaiveTime;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Supabase,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in_memory" => Ok(StoreBackend::Memory),
            "supabase" => Ok(StoreBackend::Supabase),
            other => Err(format!("Unknown appointment store backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub appointment_store: StoreBackend,
    pub server_port: u16,
    pub scheduling: SchedulingConfig,
}

/// Clinic-wide scheduling knobs: the bookable grid and the reservation retry budget.
#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    pub opening_time: NaiveTime,
    /// Exclusive: the last marker starts one interval before this.
    pub closing_time: NaiveTime,
    pub slot_interval_minutes: u32,
    pub booking_window_days: u32,
    pub max_advance_booking_days: u32,
    pub reservation_max_attempts: u32,
    pub reservation_lock_wait_ms: u64,
    pub utc_offset_minutes: i32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            opening_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN),
            closing_time: NaiveTime::from_hms_opt(21, 0, 0).unwrap_or(NaiveTime::MIN),
            slot_interval_minutes: 30,
            booking_window_days: 7,
            max_advance_booking_days: 90,
            reservation_max_attempts: 3,
            reservation_lock_wait_ms: 250,
            utc_offset_minutes: 0,
        }
    }
}

impl SchedulingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            opening_time: env_time("CLINIC_OPENING_TIME", defaults.opening_time),
            closing_time: env_time("CLINIC_CLOSING_TIME", defaults.closing_time),
            slot_interval_minutes: env_parse("SLOT_INTERVAL_MINUTES", defaults.slot_interval_minutes),
            booking_window_days: env_parse("BOOKING_WINDOW_DAYS", defaults.booking_window_days),
            max_advance_booking_days: env_parse("MAX_ADVANCE_BOOKING_DAYS", defaults.max_advance_booking_days),
            reservation_max_attempts: env_parse("RESERVATION_MAX_ATTEMPTS", defaults.reservation_max_attempts),
            reservation_lock_wait_ms: env_parse("RESERVATION_LOCK_WAIT_MS", defaults.reservation_lock_wait_ms),
            utc_offset_minutes: env_parse("CLINIC_UTC_OFFSET_MINUTES", defaults.utc_offset_minutes),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.opening_time < self.closing_time
            && self.slot_interval_minutes > 0
            && self.reservation_max_attempts > 0
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            appointment_store: env::var("APPOINTMENT_STORE")
                .ok()
                .and_then(|value| match value.parse() {
                    Ok(backend) => Some(backend),
                    Err(e) => {
                        warn!("{}, falling back to memory", e);
                        None
                    }
                })
                .unwrap_or(StoreBackend::Memory),
            server_port: env_parse("SERVER_PORT", 3000),
            scheduling: SchedulingConfig::from_env(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        if !config.scheduling.is_valid() {
            warn!("Scheduling configuration is inconsistent: {:?}", config.scheduling);
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_jwt_secret.is_empty()
            && (self.appointment_store == StoreBackend::Memory || self.is_supabase_configured())
    }

    pub fn is_supabase_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

fn env_parse<T: FromStr + std::fmt::Display + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

fn env_time(key: &str, default: NaiveTime) -> NaiveTime {
    match env::var(key) {
        Ok(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M").unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
