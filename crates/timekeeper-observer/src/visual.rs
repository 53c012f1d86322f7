//! The visual clock seam: the single side-effecting "apply visual time"
//! call an observer host exposes.
//!
//! Everything the reconciler does to the local display funnels through
//! [`VisualClock`]: set the date, override the time, set the per-minute
//! rate. Freezing the display is expressed as an effectively infinite
//! rate ([`FROZEN_RATE_MS`]) rather than a separate operation.

use std::sync::{Mutex, PoisonError};

use tracing::info;

/// The infinite-delay sentinel rate: a visual clock running at this rate
/// never advances on its own.
pub const FROZEN_RATE_MS: u32 = u32::MAX;

/// The host-side seam applying clock state to the local display.
///
/// Implementations must be cheap and infallible; the reconciler calls
/// them on every replicated time update.
pub trait VisualClock: Send + Sync {
    /// Apply a calendar date to the display.
    fn set_clock_date(&self, year: i32, month: u32, day: u32);

    /// Apply a time of day to the display, bypassing its own tick
    /// mechanism.
    fn override_clock_time(&self, hour: u32, minute: u32, second: u32);

    /// Set the display's own advancement rate. [`FROZEN_RATE_MS`] stops
    /// it entirely.
    fn set_millis_per_game_minute(&self, ms: u32);
}

/// A visual clock that renders applications as log lines.
///
/// Stands in for a real display surface in the observer binary.
#[derive(Debug, Default)]
pub struct TracingVisualClock;

impl TracingVisualClock {
    /// Create a logging visual clock.
    pub const fn new() -> Self {
        Self
    }
}

impl VisualClock for TracingVisualClock {
    fn set_clock_date(&self, year: i32, month: u32, day: u32) {
        info!(year, month, day, "visual clock date applied");
    }

    fn override_clock_time(&self, hour: u32, minute: u32, second: u32) {
        info!(hour, minute, second, "visual clock time applied");
    }

    fn set_millis_per_game_minute(&self, ms: u32) {
        if ms == FROZEN_RATE_MS {
            info!("visual clock frozen");
        } else {
            info!(ms, "visual clock rate applied");
        }
    }
}

/// One recorded application to a [`RecordingVisualClock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualCall {
    /// A date application.
    Date {
        /// Applied year.
        year: i32,
        /// Applied month.
        month: u32,
        /// Applied day.
        day: u32,
    },

    /// A time application.
    Time {
        /// Applied hour.
        hour: u32,
        /// Applied minute.
        minute: u32,
        /// Applied second.
        second: u32,
    },

    /// A rate application.
    Rate {
        /// Applied milliseconds per game minute.
        ms: u32,
    },
}

/// A visual clock that records every application, for tests.
#[derive(Debug, Default)]
pub struct RecordingVisualClock {
    calls: Mutex<Vec<VisualCall>>,
}

impl RecordingVisualClock {
    /// Create an empty recording clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every application so far, in order.
    pub fn calls(&self) -> Vec<VisualCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Discard the recorded applications.
    pub fn clear(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// The most recently applied rate, if any.
    pub fn last_rate(&self) -> Option<u32> {
        self.calls()
            .into_iter()
            .rev()
            .find_map(|call| match call {
                VisualCall::Rate { ms } => Some(ms),
                VisualCall::Date { .. } | VisualCall::Time { .. } => None,
            })
    }

    /// The most recently applied time, if any.
    pub fn last_time(&self) -> Option<(u32, u32, u32)> {
        self.calls()
            .into_iter()
            .rev()
            .find_map(|call| match call {
                VisualCall::Time {
                    hour,
                    minute,
                    second,
                } => Some((hour, minute, second)),
                VisualCall::Date { .. } | VisualCall::Rate { .. } => None,
            })
    }

    /// The most recently applied date, if any.
    pub fn last_date(&self) -> Option<(i32, u32, u32)> {
        self.calls()
            .into_iter()
            .rev()
            .find_map(|call| match call {
                VisualCall::Date { year, month, day } => Some((year, month, day)),
                VisualCall::Time { .. } | VisualCall::Rate { .. } => None,
            })
    }

    fn record(&self, call: VisualCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl VisualClock for RecordingVisualClock {
    fn set_clock_date(&self, year: i32, month: u32, day: u32) {
        self.record(VisualCall::Date { year, month, day });
    }

    fn override_clock_time(&self, hour: u32, minute: u32, second: u32) {
        self.record(VisualCall::Time {
            hour,
            minute,
            second,
        });
    }

    fn set_millis_per_game_minute(&self, ms: u32) {
        self.record(VisualCall::Rate { ms });
    }
}
