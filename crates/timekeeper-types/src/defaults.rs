//! Default clock configuration values.
//!
//! These mirror the defaults observers fall back to before their first
//! replication snapshot arrives, and the values the authority uses when a
//! configuration file does not override them.

/// Default hour at which the day regime begins.
pub const DAY_START_HOUR: u8 = 6;

/// Default hour at which the night regime begins.
pub const NIGHT_START_HOUR: u8 = 21;

/// Default real-time milliseconds per game minute (both regimes).
pub const MS_PER_GAME_MINUTE: u32 = 2000;
