//! Shared type definitions for the Timekeeper clock service.
//!
//! This crate is the single source of truth for the types that cross the
//! boundary between the clock authority and its observers: the tick-count
//! timestamp, the replicated field keys and values, the boundary event
//! notifications, and the combined clock reading served to callers.
//!
//! # Modules
//!
//! - [`instant`] -- [`GameInstant`], the 100-nanosecond tick-count timestamp.
//! - [`field`] -- Replication keys, scalar field values, and wire subjects.
//! - [`event`] -- Boundary-crossing notifications emitted by the tick engine.
//! - [`reading`] -- [`ClockReading`], a full derived view of the clock.
//! - [`defaults`] -- Default clock configuration values.

pub mod defaults;
pub mod event;
pub mod field;
pub mod instant;
pub mod reading;

pub use event::ClockEvent;
pub use field::{
    ClockField, ClockSnapshot, FieldParseError, FieldUpdate, FieldValue, SNAPSHOT_SUBJECT,
    STATE_SUBJECT_PREFIX, STATE_SUBJECT_WILDCARD,
};
pub use instant::{GameInstant, InstantError, TICKS_PER_MINUTE, TICKS_PER_SECOND};
pub use reading::ClockReading;
