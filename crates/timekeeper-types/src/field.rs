//! Replicated field keys, scalar values, and wire subjects.
//!
//! The authority replicates its state as six named scalar fields. The key
//! strings (`clock:ticks`, `clock:paused`, ...) are the durable contract:
//! they appear in the persisted store, in replication payloads, and in the
//! NATS subject names derived from them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// NATS subject prefix for replicated field updates.
pub const STATE_SUBJECT_PREFIX: &str = "clock.state";

/// NATS wildcard subject matching every replicated field update.
pub const STATE_SUBJECT_WILDCARD: &str = "clock.state.>";

/// NATS request subject serving the latest full-state snapshot.
pub const SNAPSHOT_SUBJECT: &str = "clock.snapshot";

/// A replicated clock state field.
///
/// Serialized (and used as map keys) by its replication key string, so the
/// wire form matches the durable key contract exactly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ClockField {
    /// The authoritative instant, replicated as a string-encoded tick count.
    #[serde(rename = "clock:ticks")]
    Ticks,

    /// Whether the authoritative clock is paused.
    #[serde(rename = "clock:paused")]
    Paused,

    /// Hour at which the day regime begins (0-23).
    #[serde(rename = "clock:day:start")]
    DayStartHour,

    /// Hour at which the night regime begins (0-23).
    #[serde(rename = "clock:night:start")]
    NightStartHour,

    /// Real milliseconds per game minute during the day.
    #[serde(rename = "clock:day:msPerMinute")]
    DayMsPerMinute,

    /// Real milliseconds per game minute during the night.
    #[serde(rename = "clock:night:msPerMinute")]
    NightMsPerMinute,
}

impl ClockField {
    /// Every replicated field, in the order the authority publishes a full
    /// state broadcast.
    pub const ALL: [Self; 6] = [
        Self::Ticks,
        Self::Paused,
        Self::DayStartHour,
        Self::NightStartHour,
        Self::DayMsPerMinute,
        Self::NightMsPerMinute,
    ];

    /// The replication key string for this field.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Ticks => "clock:ticks",
            Self::Paused => "clock:paused",
            Self::DayStartHour => "clock:day:start",
            Self::NightStartHour => "clock:night:start",
            Self::DayMsPerMinute => "clock:day:msPerMinute",
            Self::NightMsPerMinute => "clock:night:msPerMinute",
        }
    }

    /// The NATS subject suffix for this field.
    pub const fn subject_suffix(self) -> &'static str {
        match self {
            Self::Ticks => "ticks",
            Self::Paused => "paused",
            Self::DayStartHour => "day.start",
            Self::NightStartHour => "night.start",
            Self::DayMsPerMinute => "day.msPerMinute",
            Self::NightMsPerMinute => "night.msPerMinute",
        }
    }

    /// The full NATS subject carrying updates for this field.
    pub fn subject(self) -> String {
        format!("{STATE_SUBJECT_PREFIX}.{}", self.subject_suffix())
    }
}

impl core::fmt::Display for ClockField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.key())
    }
}

/// Error returned when a replication key string is not recognized.
#[derive(Debug, thiserror::Error)]
#[error("unknown replication key: {key:?}")]
pub struct FieldParseError {
    /// The unrecognized key.
    pub key: String,
}

impl core::str::FromStr for ClockField {
    type Err = FieldParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.key() == s)
            .ok_or_else(|| FieldParseError { key: s.to_owned() })
    }
}

/// A scalar value carried by a replicated field.
///
/// `clock:ticks` travels as [`Text`](Self::Text) (the same string-encoded
/// tick count that is persisted), `clock:paused` as
/// [`Boolean`](Self::Boolean), and the remaining fields as
/// [`Integer`](Self::Integer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A boolean value.
    Boolean(bool),

    /// A signed integer value.
    Integer(i64),

    /// A string value.
    Text(String),
}

impl FieldValue {
    /// The integer payload, if this value is an integer.
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Boolean(_) | Self::Text(_) => None,
        }
    }

    /// The boolean payload, if this value is a boolean.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            Self::Integer(_) | Self::Text(_) => None,
        }
    }

    /// The string payload, if this value is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            Self::Boolean(_) | Self::Integer(_) => None,
        }
    }
}

impl core::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// A single field change delivered over the replication channel.
///
/// `previous` is `None` for the first publish of a field after the
/// authority starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdate {
    /// The field that changed.
    pub field: ClockField,

    /// The previously published value, if any.
    pub previous: Option<FieldValue>,

    /// The newly published value.
    pub current: FieldValue,
}

/// The latest published value of every replicated field.
///
/// Served to late-joining observers in place of the publish history they
/// missed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSnapshot {
    /// Latest value per field, keyed by replication key.
    pub fields: BTreeMap<ClockField, FieldValue>,
}

impl ClockSnapshot {
    /// Create an empty snapshot.
    pub const fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    /// Record the latest value for a field.
    pub fn insert(&mut self, field: ClockField, value: FieldValue) {
        self.fields.insert(field, value);
    }

    /// The latest value for a field, if one has been published.
    pub fn get(&self, field: ClockField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    /// Whether no field has been published yet.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn keys_match_the_durable_contract() {
        assert_eq!(ClockField::Ticks.key(), "clock:ticks");
        assert_eq!(ClockField::Paused.key(), "clock:paused");
        assert_eq!(ClockField::DayStartHour.key(), "clock:day:start");
        assert_eq!(ClockField::NightStartHour.key(), "clock:night:start");
        assert_eq!(ClockField::DayMsPerMinute.key(), "clock:day:msPerMinute");
        assert_eq!(ClockField::NightMsPerMinute.key(), "clock:night:msPerMinute");
    }

    #[test]
    fn keys_parse_back() {
        for field in ClockField::ALL {
            let parsed: ClockField = field.key().parse().unwrap();
            assert_eq!(parsed, field);
        }
        assert!("clock:unknown".parse::<ClockField>().is_err());
    }

    #[test]
    fn subjects_derive_from_keys() {
        assert_eq!(ClockField::Ticks.subject(), "clock.state.ticks");
        assert_eq!(
            ClockField::NightMsPerMinute.subject(),
            "clock.state.night.msPerMinute"
        );
    }

    #[test]
    fn field_serializes_as_its_key() {
        let json = serde_json::to_string(&ClockField::DayStartHour).unwrap();
        assert_eq!(json, "\"clock:day:start\"");
    }

    #[test]
    fn values_serialize_untagged() {
        assert_eq!(
            serde_json::to_string(&FieldValue::Boolean(true)).unwrap(),
            "true"
        );
        assert_eq!(serde_json::to_string(&FieldValue::Integer(21)).unwrap(), "21");
        assert_eq!(
            serde_json::to_string(&FieldValue::Text(String::from("638"))).unwrap(),
            "\"638\""
        );
    }

    #[test]
    fn update_round_trips_through_json() {
        let update = FieldUpdate {
            field: ClockField::Paused,
            previous: Some(FieldValue::Boolean(false)),
            current: FieldValue::Boolean(true),
        };
        let json = serde_json::to_vec(&update).unwrap();
        let back: FieldUpdate = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, update);
    }

    #[test]
    fn snapshot_keeps_latest_value_per_field() {
        let mut snapshot = ClockSnapshot::new();
        assert!(snapshot.is_empty());
        snapshot.insert(ClockField::DayStartHour, FieldValue::Integer(6));
        snapshot.insert(ClockField::DayStartHour, FieldValue::Integer(8));
        assert_eq!(
            snapshot.get(ClockField::DayStartHour),
            Some(&FieldValue::Integer(8))
        );
        assert_eq!(snapshot.get(ClockField::Ticks), None);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut snapshot = ClockSnapshot::new();
        snapshot.insert(ClockField::Ticks, FieldValue::Text(String::from("600000000")));
        snapshot.insert(ClockField::Paused, FieldValue::Boolean(false));
        let json = serde_json::to_vec(&snapshot).unwrap();
        let back: ClockSnapshot = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
