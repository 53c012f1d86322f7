//! Boundary-crossing notifications emitted by the tick engine.
//!
//! When a minute advance changes a coarser calendar unit, the authority
//! emits one event per changed unit, ordered coarse to fine: year, month,
//! day, hour, then always the minute notification. A single advance can
//! cross several boundaries at once (23:59 on December 31st crosses all
//! five). Explicit administrative date/time jumps never emit these.

use serde::{Deserialize, Serialize};

/// A boundary notification carrying the previous and new value of the
/// calendar unit that changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockEvent {
    /// The year changed.
    Year {
        /// Year before the advance.
        previous: i32,
        /// Year after the advance.
        current: i32,
    },

    /// The month changed.
    Month {
        /// Month before the advance.
        previous: u32,
        /// Month after the advance.
        current: u32,
    },

    /// The day of month changed.
    Day {
        /// Day before the advance.
        previous: u32,
        /// Day after the advance.
        current: u32,
    },

    /// The hour changed.
    Hour {
        /// Hour before the advance.
        previous: u32,
        /// Hour after the advance.
        current: u32,
    },

    /// A minute elapsed (fires on every advance).
    Minute {
        /// Minute before the advance.
        previous: u32,
        /// Minute after the advance.
        current: u32,
    },
}

impl ClockEvent {
    /// The notification name for this event.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Year { .. } => "onNextYear",
            Self::Month { .. } => "onNextMonth",
            Self::Day { .. } => "onNextDay",
            Self::Hour { .. } => "onNextHour",
            Self::Minute { .. } => "onNextMinute",
        }
    }
}

impl core::fmt::Display for ClockEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Year { previous, current } => {
                write!(f, "{} ({previous} -> {current})", self.name())
            }
            Self::Month { previous, current }
            | Self::Day { previous, current }
            | Self::Hour { previous, current }
            | Self::Minute { previous, current } => {
                write!(f, "{} ({previous} -> {current})", self.name())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_the_notification_contract() {
        let year = ClockEvent::Year {
            previous: 2024,
            current: 2025,
        };
        assert_eq!(year.name(), "onNextYear");
        let minute = ClockEvent::Minute {
            previous: 59,
            current: 0,
        };
        assert_eq!(minute.name(), "onNextMinute");
    }

    #[test]
    fn display_includes_previous_and_current() {
        let event = ClockEvent::Hour {
            previous: 23,
            current: 0,
        };
        assert_eq!(event.to_string(), "onNextHour (23 -> 0)");
    }
}
