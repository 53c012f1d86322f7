//! Tick-count timestamps for the game clock.
//!
//! The authoritative clock value is a count of 100-nanosecond ticks since
//! `0001-01-01 00:00:00`. The tick count is the stored and replicated
//! representation; calendar fields (year, month, day, hour, minute, second)
//! are derived on demand through [`chrono`], so persisting a count and
//! reconstructing an instant from it is exact by construction.
//!
//! # Design Principles
//!
//! - The tick count is the source of truth. Calendar fields are never
//!   stored independently.
//! - All tick arithmetic is checked (no silent overflow).
//! - Only non-negative tick counts are valid; every non-negative `i64`
//!   maps to a timestamp well inside chrono's supported calendar range.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Number of 100-nanosecond ticks in one second.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Number of 100-nanosecond ticks in one minute.
pub const TICKS_PER_MINUTE: i64 = 600_000_000;

/// Errors that can occur constructing or advancing a [`GameInstant`].
#[derive(Debug, thiserror::Error)]
pub enum InstantError {
    /// A negative tick count was supplied.
    #[error("tick count {ticks} is negative")]
    NegativeTicks {
        /// The rejected tick count.
        ticks: i64,
    },

    /// Tick arithmetic overflowed the counter range.
    #[error("tick arithmetic overflow")]
    Overflow,

    /// A timestamp before the clock epoch was supplied.
    #[error("timestamp {timestamp} predates the clock epoch")]
    BeforeEpoch {
        /// The rejected timestamp.
        timestamp: NaiveDateTime,
    },

    /// An impossible calendar date was supplied.
    #[error("invalid calendar date {year:04}-{month:02}-{day:02}")]
    InvalidDate {
        /// The rejected year.
        year: i32,
        /// The rejected month.
        month: u32,
        /// The rejected day of month.
        day: u32,
    },

    /// An impossible time of day was supplied.
    #[error("invalid time of day {hour:02}:{minute:02}:{second:02}")]
    InvalidTime {
        /// The rejected hour.
        hour: u32,
        /// The rejected minute.
        minute: u32,
        /// The rejected second.
        second: u32,
    },

    /// A persisted tick string could not be parsed.
    #[error("malformed tick string: {value:?}")]
    Malformed {
        /// The unparseable input.
        value: String,
    },
}

/// An absolute game-clock timestamp, stored as a tick count.
///
/// Instants only move forward in whole-minute steps during normal
/// progression ([`add_minutes`](Self::add_minutes)); arbitrary values come
/// only from explicit date/time jumps ([`with_time`](Self::with_time),
/// [`with_date`](Self::with_date)) or from decoding a stored count.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GameInstant(i64);

impl GameInstant {
    /// Construct an instant from a raw tick count.
    ///
    /// # Errors
    ///
    /// Returns [`InstantError::NegativeTicks`] for negative counts.
    pub const fn from_ticks(ticks: i64) -> Result<Self, InstantError> {
        if ticks < 0 {
            return Err(InstantError::NegativeTicks { ticks });
        }
        Ok(Self(ticks))
    }

    /// Return the raw tick count.
    pub const fn ticks(self) -> i64 {
        self.0
    }

    /// The current wall-clock time as a game instant.
    pub fn now() -> Self {
        // The wall clock is far past year 1; the conversion cannot fail.
        Self::from_datetime(Utc::now().naive_utc()).unwrap_or(Self(0))
    }

    /// Decode an instant from the persisted decimal-string form.
    ///
    /// # Errors
    ///
    /// Returns [`InstantError::Malformed`] if the string is not a decimal
    /// integer, or [`InstantError::NegativeTicks`] for negative values.
    pub fn from_encoded(encoded: &str) -> Result<Self, InstantError> {
        let ticks = encoded
            .trim()
            .parse::<i64>()
            .map_err(|_err| InstantError::Malformed {
                value: encoded.to_owned(),
            })?;
        Self::from_ticks(ticks)
    }

    /// Encode the instant as the persisted decimal-string form.
    pub fn encode(self) -> String {
        self.0.to_string()
    }

    /// Convert a calendar timestamp into an instant.
    ///
    /// # Errors
    ///
    /// Returns [`InstantError::BeforeEpoch`] for timestamps before
    /// `0001-01-01 00:00:00`, or [`InstantError::Overflow`] if the tick
    /// count would not fit (beyond calendar year ~29,000).
    pub fn from_datetime(datetime: NaiveDateTime) -> Result<Self, InstantError> {
        let delta = datetime.signed_duration_since(epoch());
        if delta < TimeDelta::zero() {
            return Err(InstantError::BeforeEpoch {
                timestamp: datetime,
            });
        }
        let seconds = delta.num_seconds();
        let subsec_ticks = i64::from(delta.subsec_nanos()).checked_div(100).unwrap_or(0);
        let ticks = seconds
            .checked_mul(TICKS_PER_SECOND)
            .and_then(|t| t.checked_add(subsec_ticks))
            .ok_or(InstantError::Overflow)?;
        Ok(Self(ticks))
    }

    /// Derive the full calendar timestamp for this instant.
    pub fn datetime(self) -> NaiveDateTime {
        let seconds = self.0.checked_div(TICKS_PER_SECOND).unwrap_or(0);
        let nanos = self
            .0
            .checked_rem(TICKS_PER_SECOND)
            .and_then(|t| t.checked_mul(100))
            .unwrap_or(0);
        // In range for every non-negative tick count: the counter caps out
        // near calendar year 29,000, far below chrono's limit.
        TimeDelta::try_seconds(seconds)
            .and_then(|delta| delta.checked_add(&TimeDelta::nanoseconds(nanos)))
            .and_then(|delta| epoch().checked_add_signed(delta))
            .unwrap_or(NaiveDateTime::MIN)
    }

    /// Advance the instant by a number of whole minutes.
    ///
    /// # Errors
    ///
    /// Returns [`InstantError::Overflow`] if the tick counter would
    /// overflow.
    pub fn add_minutes(self, minutes: i64) -> Result<Self, InstantError> {
        let delta = minutes
            .checked_mul(TICKS_PER_MINUTE)
            .ok_or(InstantError::Overflow)?;
        let ticks = self.0.checked_add(delta).ok_or(InstantError::Overflow)?;
        Self::from_ticks(ticks)
    }

    /// Replace the time of day, keeping the calendar date.
    ///
    /// Sub-second precision is dropped: an explicit time jump lands on a
    /// whole second.
    ///
    /// # Errors
    ///
    /// Returns [`InstantError::InvalidTime`] for impossible values.
    pub fn with_time(self, hour: u32, minute: u32, second: u32) -> Result<Self, InstantError> {
        let time = NaiveTime::from_hms_opt(hour, minute, second).ok_or(
            InstantError::InvalidTime {
                hour,
                minute,
                second,
            },
        )?;
        Self::from_datetime(self.datetime().date().and_time(time))
    }

    /// Replace the calendar date, keeping the time of day.
    ///
    /// Sub-second precision is dropped: an explicit date jump lands on a
    /// whole second.
    ///
    /// # Errors
    ///
    /// Returns [`InstantError::InvalidDate`] for impossible dates.
    pub fn with_date(self, year: i32, month: u32, day: u32) -> Result<Self, InstantError> {
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or(InstantError::InvalidDate {
            year,
            month,
            day,
        })?;
        let current = self.datetime();
        // The hour/minute/second of a valid datetime always form a valid time.
        let time = NaiveTime::from_hms_opt(current.hour(), current.minute(), current.second())
            .unwrap_or_default();
        Self::from_datetime(date.and_time(time))
    }

    /// The calendar year of this instant.
    pub fn year(self) -> i32 {
        self.datetime().year()
    }

    /// The calendar month of this instant (1-12).
    pub fn month(self) -> u32 {
        self.datetime().month()
    }

    /// The day of month of this instant (1-31).
    pub fn day(self) -> u32 {
        self.datetime().day()
    }

    /// The hour of this instant (0-23).
    pub fn hour(self) -> u32 {
        self.datetime().hour()
    }

    /// The minute of this instant (0-59).
    pub fn minute(self) -> u32 {
        self.datetime().minute()
    }

    /// The second of this instant (0-59).
    pub fn second(self) -> u32 {
        self.datetime().second()
    }
}

impl core::fmt::Display for GameInstant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.datetime().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// The clock epoch: `0001-01-01 00:00:00`.
fn epoch() -> NaiveDateTime {
    // Always a valid timestamp.
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}
