//! Resilient facade over the clock, on either side of the replication
//! channel.
//!
//! [`ClockApi`] is the typed contract every caller programs against,
//! implemented by the authority (server side) and by the observer
//! reconciler (client side). [`ClockFacade`] wraps an optional
//! implementation behind an availability flag: reads fall back to a
//! caller-supplied default and writes are skipped with a warning whenever
//! the clock is inactive or an underlying call faults. The clock is an
//! optional dependency for its callers; they must never crash or block
//! because it is momentarily stopped, restarting, or absent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures::future::BoxFuture;
use timekeeper_types::{ClockReading, InstantError};
use tracing::warn;

use crate::clock::ClockError;

/// Errors surfaced through the [`ClockApi`] contract.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A clock state mutation was rejected.
    #[error(transparent)]
    Clock(#[from] ClockError),

    /// An instant decode or conversion failed.
    #[error(transparent)]
    Instant(#[from] InstantError),

    /// The operation only exists on the other side of the replication
    /// channel.
    #[error("operation {operation} is not supported on this side of the replication channel")]
    Unsupported {
        /// The unsupported operation name.
        operation: &'static str,
    },
}

/// The read/write contract of the clock, resolved at compile time.
///
/// Reads are synchronous views of the implementation's current state.
/// Setters are futures because the authority persists and republishes as
/// part of a write; observer-side implementations complete immediately.
pub trait ClockApi: Send + Sync {
    /// A full derived reading of the clock.
    fn reading(&self) -> Result<ClockReading, ApiError>;

    /// Whether the observer-local manual override is engaged.
    fn manual_override(&self) -> Result<bool, ApiError>;

    /// Jump the time of day (an explicit discontinuous write).
    fn set_time(&self, hour: u32, minute: u32, second: u32)
    -> BoxFuture<'_, Result<(), ApiError>>;

    /// Jump the calendar date (an explicit discontinuous write).
    fn set_date(&self, day: u32, month: u32, year: i32) -> BoxFuture<'_, Result<(), ApiError>>;

    /// Pause or resume the clock.
    fn set_paused(&self, paused: bool) -> BoxFuture<'_, Result<(), ApiError>>;

    /// Set the day start hour (clamped to `[0, 23]`).
    fn set_day_start_hour(&self, hour: i64) -> BoxFuture<'_, Result<(), ApiError>>;

    /// Set the night start hour (clamped to `[0, 23]`).
    fn set_night_start_hour(&self, hour: i64) -> BoxFuture<'_, Result<(), ApiError>>;

    /// Set the day minute duration (positive milliseconds).
    fn set_day_ms_per_minute(&self, ms: i64) -> BoxFuture<'_, Result<(), ApiError>>;

    /// Set the night minute duration (positive milliseconds).
    fn set_night_ms_per_minute(&self, ms: i64) -> BoxFuture<'_, Result<(), ApiError>>;

    /// Engage or release the observer-local manual override.
    fn set_manual_override(&self, engaged: bool) -> BoxFuture<'_, Result<(), ApiError>>;

    /// Re-apply/re-broadcast the current state (idempotent).
    fn sync(&self) -> BoxFuture<'_, Result<(), ApiError>>;

    /// Persist the current state to durable storage now.
    fn save(&self) -> BoxFuture<'_, Result<(), ApiError>>;
}

/// The single entry point callers use regardless of which side they run
/// on and whether the clock is currently up.
pub struct ClockFacade {
    /// The attached implementation, if any.
    api: RwLock<Option<Arc<dyn ClockApi>>>,

    /// Availability flag, flipped by start/stop lifecycle notifications.
    active: AtomicBool,
}

impl ClockFacade {
    /// Create a facade with no clock attached (inactive).
    pub fn new() -> Self {
        Self {
            api: RwLock::new(None),
            active: AtomicBool::new(false),
        }
    }

    /// Attach a clock implementation and mark the facade active.
    pub fn attach(&self, api: Arc<dyn ClockApi>) {
        *self.api.write().unwrap_or_else(PoisonError::into_inner) = Some(api);
        self.active.store(true, Ordering::Release);
    }

    /// Mark the facade inactive and drop the attached implementation.
    pub fn detach(&self) {
        self.active.store(false, Ordering::Release);
        *self.api.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Whether a clock is attached and active.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// The attached implementation, if the facade is active.
    fn api(&self) -> Option<Arc<dyn ClockApi>> {
        if !self.is_active() {
            return None;
        }
        self.api
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The attached implementation for a write, warning when absent.
    fn write_api(&self, operation: &'static str) -> Option<Arc<dyn ClockApi>> {
        let api = self.api();
        if api.is_none() {
            warn!(operation, "clock is inactive, write skipped");
        }
        api
    }

    /// Log a write outcome; returns whether the write was applied.
    fn applied(operation: &'static str, result: Result<(), ApiError>) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                warn!(operation, error = %err, "clock write rejected");
                false
            }
        }
    }

    /// Project a value out of the current reading, or return the
    /// caller-supplied default when the clock is away or faulted.
    fn read_with<T>(&self, default: T, project: impl FnOnce(&ClockReading) -> T) -> T {
        let Some(api) = self.api() else {
            return default;
        };
        match api.reading() {
            Ok(reading) => project(&reading),
            Err(err) => {
                warn!(error = %err, "clock read failed, returning caller default");
                default
            }
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The full clock reading, or `default` when unavailable.
    pub fn reading(&self, default: ClockReading) -> ClockReading {
        self.read_with(default, |reading| *reading)
    }

    /// The current hour, or `default` when unavailable.
    pub fn hours(&self, default: u32) -> u32 {
        self.read_with(default, |reading| reading.hour)
    }

    /// The current minute, or `default` when unavailable.
    pub fn minutes(&self, default: u32) -> u32 {
        self.read_with(default, |reading| reading.minute)
    }

    /// The current second, or `default` when unavailable.
    pub fn seconds(&self, default: u32) -> u32 {
        self.read_with(default, |reading| reading.second)
    }

    /// Whether it is day, or `default` when unavailable.
    pub fn is_day(&self, default: bool) -> bool {
        self.read_with(default, |reading| reading.is_day)
    }

    /// Whether it is night, or `default` when unavailable.
    pub fn is_night(&self, default: bool) -> bool {
        self.read_with(default, |reading| !reading.is_day)
    }

    /// Whether the clock is paused, or `default` when unavailable.
    pub fn paused(&self, default: bool) -> bool {
        self.read_with(default, |reading| reading.paused)
    }

    /// The day start hour, or `default` when unavailable.
    pub fn day_start_hour(&self, default: u8) -> u8 {
        self.read_with(default, |reading| reading.day_start_hour)
    }

    /// The night start hour, or `default` when unavailable.
    pub fn night_start_hour(&self, default: u8) -> u8 {
        self.read_with(default, |reading| reading.night_start_hour)
    }

    /// The day minute duration, or `default` when unavailable.
    pub fn day_ms_per_minute(&self, default: u32) -> u32 {
        self.read_with(default, |reading| reading.day_ms_per_minute)
    }

    /// The night minute duration, or `default` when unavailable.
    pub fn night_ms_per_minute(&self, default: u32) -> u32 {
        self.read_with(default, |reading| reading.night_ms_per_minute)
    }

    /// The minute duration currently in effect, or `default` when
    /// unavailable.
    pub fn current_ms_per_minute(&self, default: u32) -> u32 {
        self.read_with(default, |reading| reading.current_ms_per_minute)
    }

    /// Whether the manual override is engaged, or `default` when
    /// unavailable.
    pub fn manual_override(&self, default: bool) -> bool {
        let Some(api) = self.api() else {
            return default;
        };
        match api.manual_override() {
            Ok(engaged) => engaged,
            Err(err) => {
                warn!(error = %err, "manual override read failed, returning caller default");
                default
            }
        }
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Jump the time of day. Returns whether the write was applied.
    pub async fn set_time(&self, hour: u32, minute: u32, second: u32) -> bool {
        let Some(api) = self.write_api("set_time") else {
            return false;
        };
        Self::applied("set_time", api.set_time(hour, minute, second).await)
    }

    /// Jump the calendar date. Returns whether the write was applied.
    pub async fn set_date(&self, day: u32, month: u32, year: i32) -> bool {
        let Some(api) = self.write_api("set_date") else {
            return false;
        };
        Self::applied("set_date", api.set_date(day, month, year).await)
    }

    /// Pause or resume the clock. Returns whether the write was applied.
    pub async fn set_paused(&self, paused: bool) -> bool {
        let Some(api) = self.write_api("set_paused") else {
            return false;
        };
        Self::applied("set_paused", api.set_paused(paused).await)
    }

    /// Set the day start hour. Returns whether the write was applied.
    pub async fn set_day_start_hour(&self, hour: i64) -> bool {
        let Some(api) = self.write_api("set_day_start_hour") else {
            return false;
        };
        Self::applied("set_day_start_hour", api.set_day_start_hour(hour).await)
    }

    /// Set the night start hour. Returns whether the write was applied.
    pub async fn set_night_start_hour(&self, hour: i64) -> bool {
        let Some(api) = self.write_api("set_night_start_hour") else {
            return false;
        };
        Self::applied("set_night_start_hour", api.set_night_start_hour(hour).await)
    }

    /// Set the day minute duration. Returns whether the write was applied.
    pub async fn set_day_ms_per_minute(&self, ms: i64) -> bool {
        let Some(api) = self.write_api("set_day_ms_per_minute") else {
            return false;
        };
        Self::applied("set_day_ms_per_minute", api.set_day_ms_per_minute(ms).await)
    }

    /// Set the night minute duration. Returns whether the write was
    /// applied.
    pub async fn set_night_ms_per_minute(&self, ms: i64) -> bool {
        let Some(api) = self.write_api("set_night_ms_per_minute") else {
            return false;
        };
        Self::applied(
            "set_night_ms_per_minute",
            api.set_night_ms_per_minute(ms).await,
        )
    }

    /// Engage or release the manual override. Returns whether the write
    /// was applied.
    pub async fn set_manual_override(&self, engaged: bool) -> bool {
        let Some(api) = self.write_api("set_manual_override") else {
            return false;
        };
        Self::applied("set_manual_override", api.set_manual_override(engaged).await)
    }

    /// Re-apply/re-broadcast the current state. Returns whether the write
    /// was applied.
    pub async fn sync(&self) -> bool {
        let Some(api) = self.write_api("sync") else {
            return false;
        };
        Self::applied("sync", api.sync().await)
    }

    /// Persist the current state now. Returns whether the write was
    /// applied.
    pub async fn save(&self) -> bool {
        let Some(api) = self.write_api("save") else {
            return false;
        };
        Self::applied("save", api.save().await)
    }
}

impl Default for ClockFacade {
    fn default() -> Self {
        Self::new()
    }
}
