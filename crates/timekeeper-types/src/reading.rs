//! A full derived view of the clock, served to callers in one read.

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::instant::GameInstant;

/// Everything a caller can ask the clock: the instant, its calendar
/// decomposition, the day/night configuration, and the derived regime.
///
/// Produced by the authority from its canonical state and by observers
/// from their replicated mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockReading {
    /// The underlying instant.
    pub instant: GameInstant,

    /// Calendar year.
    pub year: i32,

    /// Calendar month (1-12).
    pub month: u32,

    /// Day of month (1-31).
    pub day: u32,

    /// Hour of day (0-23).
    pub hour: u32,

    /// Minute of hour (0-59).
    pub minute: u32,

    /// Second of minute (0-59).
    pub second: u32,

    /// Whether the clock is paused.
    pub paused: bool,

    /// Whether the current hour falls inside the day window.
    pub is_day: bool,

    /// Hour at which the day regime begins.
    pub day_start_hour: u8,

    /// Hour at which the night regime begins.
    pub night_start_hour: u8,

    /// Real milliseconds per game minute during the day.
    pub day_ms_per_minute: u32,

    /// Real milliseconds per game minute during the night.
    pub night_ms_per_minute: u32,

    /// The rate currently in effect, given the regime.
    pub current_ms_per_minute: u32,
}

impl ClockReading {
    /// A reading with default configuration at the clock epoch.
    ///
    /// Useful as the caller-supplied fallback for facade reads when no
    /// better default exists.
    pub fn epoch_default() -> Self {
        let instant = GameInstant::from_ticks(0).unwrap_or_else(|_err| GameInstant::now());
        Self {
            instant,
            year: instant.year(),
            month: instant.month(),
            day: instant.day(),
            hour: instant.hour(),
            minute: instant.minute(),
            second: instant.second(),
            paused: false,
            is_day: false,
            day_start_hour: defaults::DAY_START_HOUR,
            night_start_hour: defaults::NIGHT_START_HOUR,
            day_ms_per_minute: defaults::MS_PER_GAME_MINUTE,
            night_ms_per_minute: defaults::MS_PER_GAME_MINUTE,
            current_ms_per_minute: defaults::MS_PER_GAME_MINUTE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_default_is_midnight_year_one() {
        let reading = ClockReading::epoch_default();
        assert_eq!(reading.year, 1);
        assert_eq!(reading.hour, 0);
        assert!(!reading.paused);
        // Midnight is outside the default 6..21 day window.
        assert!(!reading.is_day);
        assert_eq!(reading.current_ms_per_minute, defaults::MS_PER_GAME_MINUTE);
    }
}
