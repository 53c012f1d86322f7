//! Canonical clock state and derived day/night reads.
//!
//! [`ClockState`] is the single place clock fields are mutated. It is not
//! internally synchronized: the owning [`ClockAuthority`] serializes all
//! access under its single-writer discipline.
//!
//! # Design Principles
//!
//! - The instant only moves forward in whole-minute steps during normal
//!   progression; arbitrary values come only from explicit date/time jumps.
//! - Hour-window setters clamp to `[0, 23]`; duration setters reject
//!   non-positive values. One consistent policy per field class, applied
//!   at the only mutation point.
//! - `is_day`/`current_rate_ms` are pure derivations, never stored.
//!
//! [`ClockAuthority`]: crate::authority::ClockAuthority

use timekeeper_types::{ClockField, ClockReading, FieldValue, GameInstant, InstantError};

use crate::config::ClockConfig;

/// Errors that can occur mutating the clock state.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// A duration setter received a non-positive millisecond count.
    #[error("milliseconds per game minute must be positive, got {value}")]
    InvalidDuration {
        /// The rejected value.
        value: i64,
    },

    /// The tick counter cannot advance further.
    #[error("tick counter overflow: cannot advance past the calendar range")]
    TickOverflow,

    /// An instant conversion or jump failed.
    #[error(transparent)]
    Instant(#[from] InstantError),
}

/// The canonical clock state owned by the authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockState {
    /// The authoritative instant.
    instant: GameInstant,

    /// Whether the clock is paused.
    paused: bool,

    /// Hour at which the day regime begins (0-23).
    day_start_hour: u8,

    /// Hour at which the night regime begins (0-23).
    night_start_hour: u8,

    /// Real milliseconds per game minute during the day.
    day_ms_per_minute: u32,

    /// Real milliseconds per game minute during the night.
    night_ms_per_minute: u32,
}

impl ClockState {
    /// Create a clock state from a seeded instant and configuration.
    ///
    /// Configuration values pass through the same clamp/validate rules as
    /// the setters: out-of-range hours are clamped, and non-positive
    /// durations fall back to the defaults with a warning.
    pub fn from_config(instant: GameInstant, config: &ClockConfig) -> Self {
        let mut state = Self {
            instant,
            paused: config.start_paused,
            day_start_hour: timekeeper_types::defaults::DAY_START_HOUR,
            night_start_hour: timekeeper_types::defaults::NIGHT_START_HOUR,
            day_ms_per_minute: timekeeper_types::defaults::MS_PER_GAME_MINUTE,
            night_ms_per_minute: timekeeper_types::defaults::MS_PER_GAME_MINUTE,
        };
        state.set_day_start_hour(i64::from(config.day_start_hour));
        state.set_night_start_hour(i64::from(config.night_start_hour));
        if let Err(err) = state.set_day_ms_per_minute(i64::from(config.day_ms_per_minute)) {
            tracing::warn!(error = %err, "invalid configured day duration, keeping default");
        }
        if let Err(err) = state.set_night_ms_per_minute(i64::from(config.night_ms_per_minute)) {
            tracing::warn!(error = %err, "invalid configured night duration, keeping default");
        }
        state
    }

    // -----------------------------------------------------------------------
    // Instant
    // -----------------------------------------------------------------------

    /// The authoritative instant.
    pub const fn instant(&self) -> GameInstant {
        self.instant
    }

    /// Advance the instant by exactly one minute. Returns the new instant.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the counter cannot advance.
    pub fn advance_minute(&mut self) -> Result<GameInstant, ClockError> {
        self.instant = self
            .instant
            .add_minutes(1)
            .map_err(|_err| ClockError::TickOverflow)?;
        Ok(self.instant)
    }

    /// Jump the time of day, keeping the calendar date (a discontinuous
    /// administrative operation, never a tick).
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Instant`] for impossible time values.
    pub fn set_time(&mut self, hour: u32, minute: u32, second: u32) -> Result<GameInstant, ClockError> {
        self.instant = self.instant.with_time(hour, minute, second)?;
        Ok(self.instant)
    }

    /// Jump the calendar date, keeping the time of day.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Instant`] for impossible dates.
    pub fn set_date(&mut self, day: u32, month: u32, year: i32) -> Result<GameInstant, ClockError> {
        self.instant = self.instant.with_date(year, month, day)?;
        Ok(self.instant)
    }

    // -----------------------------------------------------------------------
    // Pause
    // -----------------------------------------------------------------------

    /// Whether the clock is paused.
    pub const fn paused(&self) -> bool {
        self.paused
    }

    /// Set the pause flag.
    pub const fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    // -----------------------------------------------------------------------
    // Day / night window
    // -----------------------------------------------------------------------

    /// Hour at which the day regime begins.
    pub const fn day_start_hour(&self) -> u8 {
        self.day_start_hour
    }

    /// Hour at which the night regime begins.
    pub const fn night_start_hour(&self) -> u8 {
        self.night_start_hour
    }

    /// Set the day start hour, clamped to `[0, 23]`. Returns the value
    /// actually stored.
    pub fn set_day_start_hour(&mut self, hour: i64) -> u8 {
        self.day_start_hour = clamp_hour(hour);
        self.day_start_hour
    }

    /// Set the night start hour, clamped to `[0, 23]`. Returns the value
    /// actually stored.
    pub fn set_night_start_hour(&mut self, hour: i64) -> u8 {
        self.night_start_hour = clamp_hour(hour);
        self.night_start_hour
    }

    /// Whether the current hour falls inside the half-open day window
    /// `[day_start, night_start)`. The hour equal to the night start is
    /// already night.
    pub fn is_day(&self) -> bool {
        let hour = self.instant.hour();
        u32::from(self.day_start_hour) <= hour && hour < u32::from(self.night_start_hour)
    }

    /// Whether the current hour falls outside the day window.
    pub fn is_night(&self) -> bool {
        !self.is_day()
    }

    // -----------------------------------------------------------------------
    // Minute durations
    // -----------------------------------------------------------------------

    /// Real milliseconds per game minute during the day.
    pub const fn day_ms_per_minute(&self) -> u32 {
        self.day_ms_per_minute
    }

    /// Real milliseconds per game minute during the night.
    pub const fn night_ms_per_minute(&self) -> u32 {
        self.night_ms_per_minute
    }

    /// Set the day minute duration.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidDuration`] for non-positive values or
    /// values beyond `u32::MAX`.
    pub fn set_day_ms_per_minute(&mut self, ms: i64) -> Result<u32, ClockError> {
        self.day_ms_per_minute = validate_duration(ms)?;
        Ok(self.day_ms_per_minute)
    }

    /// Set the night minute duration.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidDuration`] for non-positive values or
    /// values beyond `u32::MAX`.
    pub fn set_night_ms_per_minute(&mut self, ms: i64) -> Result<u32, ClockError> {
        self.night_ms_per_minute = validate_duration(ms)?;
        Ok(self.night_ms_per_minute)
    }

    /// The minute duration currently in effect, given the regime.
    pub fn current_rate_ms(&self) -> u32 {
        if self.is_day() {
            self.day_ms_per_minute
        } else {
            self.night_ms_per_minute
        }
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// A full derived reading of the clock.
    pub fn reading(&self) -> ClockReading {
        ClockReading {
            instant: self.instant,
            year: self.instant.year(),
            month: self.instant.month(),
            day: self.instant.day(),
            hour: self.instant.hour(),
            minute: self.instant.minute(),
            second: self.instant.second(),
            paused: self.paused,
            is_day: self.is_day(),
            day_start_hour: self.day_start_hour,
            night_start_hour: self.night_start_hour,
            day_ms_per_minute: self.day_ms_per_minute,
            night_ms_per_minute: self.night_ms_per_minute,
            current_ms_per_minute: self.current_rate_ms(),
        }
    }

    /// Every replicated field with its current value, in publish order.
    pub fn field_values(&self) -> Vec<(ClockField, FieldValue)> {
        vec![
            (ClockField::Ticks, FieldValue::Text(self.instant.encode())),
            (ClockField::Paused, FieldValue::Boolean(self.paused)),
            (
                ClockField::DayStartHour,
                FieldValue::Integer(i64::from(self.day_start_hour)),
            ),
            (
                ClockField::NightStartHour,
                FieldValue::Integer(i64::from(self.night_start_hour)),
            ),
            (
                ClockField::DayMsPerMinute,
                FieldValue::Integer(i64::from(self.day_ms_per_minute)),
            ),
            (
                ClockField::NightMsPerMinute,
                FieldValue::Integer(i64::from(self.night_ms_per_minute)),
            ),
        ]
    }
}

/// Clamp an hour value into `[0, 23]`.
fn clamp_hour(hour: i64) -> u8 {
    // The clamp guarantees the value fits in u8.
    u8::try_from(hour.clamp(0, 23)).unwrap_or(23)
}

/// Validate a minute duration: positive and within `u32`.
fn validate_duration(ms: i64) -> Result<u32, ClockError> {
    if ms <= 0 {
        return Err(ClockError::InvalidDuration { value: ms });
    }
    u32::try_from(ms).map_err(|_err| ClockError::InvalidDuration { value: ms })
}
