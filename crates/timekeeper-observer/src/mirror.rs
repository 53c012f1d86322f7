//! The observer reconciler: replicated-field mirror with manual override.
//!
//! [`ObserverReconciler`] keeps a local copy of every replicated field and
//! drives the host's [`VisualClock`] from it. Inbound updates always land
//! in the mirror; whether they *react* on the visual clock depends on the
//! manual override flag:
//!
//! - Override off: `clock:ticks` applies date and time directly (no local
//!   drift against the authority), `clock:paused` freezes or resyncs the
//!   rate. Window and duration fields are picked up by the next sync.
//! - Override on: the visual clock is frozen and every inbound reaction
//!   is suppressed; the display moves only through explicit override
//!   writes. Releasing the override performs a full [`sync`] from the
//!   last-received snapshot.
//!
//! [`sync`]: ObserverReconciler::sync

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use timekeeper_core::facade::{ApiError, ClockApi};
use timekeeper_types::{
    ClockField, ClockReading, ClockSnapshot, FieldUpdate, FieldValue, GameInstant, InstantError,
    defaults,
};
use tracing::{debug, info, warn};

use crate::visual::{FROZEN_RATE_MS, VisualClock};

/// Errors that can occur applying a replicated update.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// A replicated field carried a value of the wrong type.
    #[error("replicated field {field} carried an unexpected value type")]
    UnexpectedType {
        /// The offending field.
        field: ClockField,
    },

    /// A replicated tick count failed to decode.
    #[error(transparent)]
    Instant(#[from] InstantError),
}

/// The mirrored state guarded by one lock.
#[derive(Debug, Default)]
struct MirrorState {
    /// Last-seen value per replicated field.
    fields: BTreeMap<ClockField, FieldValue>,

    /// Whether the operator has detached the visual clock from
    /// replication.
    manual_override: bool,
}

/// The observer-side mirror of the authoritative clock.
pub struct ObserverReconciler {
    /// Mirrored fields and the override flag.
    mirror: Mutex<MirrorState>,

    /// The host's display seam.
    visual: Arc<dyn VisualClock>,
}

impl ObserverReconciler {
    /// Create a reconciler driving the given visual clock. The mirror
    /// starts empty; seed it with the first snapshot.
    pub fn new(visual: Arc<dyn VisualClock>) -> Self {
        Self {
            mirror: Mutex::new(MirrorState::default()),
            visual,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MirrorState> {
        self.mirror.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed the mirror from a full snapshot (first connection), then
    /// synchronize the visual clock.
    pub fn seed(&self, snapshot: &ClockSnapshot) {
        {
            let mut mirror = self.lock();
            for (field, value) in &snapshot.fields {
                mirror.fields.insert(*field, value.clone());
            }
        }
        debug!(fields = snapshot.fields.len(), "mirror seeded from snapshot");
        self.sync();
    }

    /// Apply one replicated update.
    ///
    /// The mirror always records the value. Reactions on the visual clock
    /// are suppressed while the manual override is engaged.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] when the value has the wrong type or a
    /// tick count fails to decode; the mirror still records the raw value.
    pub fn apply(&self, update: &FieldUpdate) -> Result<(), ReconcileError> {
        let overridden = {
            let mut mirror = self.lock();
            mirror.fields.insert(update.field, update.current.clone());
            mirror.manual_override
        };
        if overridden {
            debug!(field = %update.field, "manual override engaged, update mirrored only");
            return Ok(());
        }

        match update.field {
            ClockField::Ticks => {
                let encoded = update
                    .current
                    .as_text()
                    .ok_or(ReconcileError::UnexpectedType {
                        field: update.field,
                    })?;
                let instant = GameInstant::from_encoded(encoded)?;
                debug!(instant = %instant, "authoritative time received");
                // Apply directly, bypassing the local tick mechanism, so
                // the display cannot drift against the authority.
                self.visual
                    .set_clock_date(instant.year(), instant.month(), instant.day());
                self.visual
                    .override_clock_time(instant.hour(), instant.minute(), instant.second());
            }
            ClockField::Paused => {
                let paused = update
                    .current
                    .as_bool()
                    .ok_or(ReconcileError::UnexpectedType {
                        field: update.field,
                    })?;
                debug!(paused, "authoritative pause state received");
                if paused {
                    self.visual.set_millis_per_game_minute(FROZEN_RATE_MS);
                } else {
                    self.sync();
                }
            }
            // Window and duration changes take effect at the next sync.
            ClockField::DayStartHour
            | ClockField::NightStartHour
            | ClockField::DayMsPerMinute
            | ClockField::NightMsPerMinute => {}
        }
        Ok(())
    }

    /// Engage or release the manual override.
    ///
    /// Engaging freezes the visual clock immediately; releasing performs
    /// a full sync from the last-received snapshot.
    pub fn set_manual_override(&self, engaged: bool) {
        self.lock().manual_override = engaged;
        if engaged {
            info!("manual override engaged, visual clock detached");
            self.visual.set_millis_per_game_minute(FROZEN_RATE_MS);
        } else {
            info!("manual override released, resynchronizing");
            self.sync();
        }
    }

    /// Whether the manual override is engaged.
    pub fn manual_override(&self) -> bool {
        self.lock().manual_override
    }

    /// Re-apply rate, date, and time from the mirror to the visual clock.
    ///
    /// Idempotent, and a no-op while the manual override is engaged.
    /// Touches only the local display, never authoritative state.
    pub fn sync(&self) {
        let reading = {
            let mirror = self.lock();
            if mirror.manual_override {
                return;
            }
            reading_of(&mirror)
        };
        let rate = if reading.paused {
            FROZEN_RATE_MS
        } else {
            reading.current_ms_per_minute
        };
        self.visual.set_millis_per_game_minute(rate);
        self.visual
            .set_clock_date(reading.year, reading.month, reading.day);
        self.visual
            .override_clock_time(reading.hour, reading.minute, reading.second);
    }

    /// A full clock reading derived from the mirror, with the same
    /// fallbacks an unseeded observer uses.
    pub fn reading(&self) -> ClockReading {
        reading_of(&self.lock())
    }
}

/// Derive a reading from mirrored fields, falling back to defaults for
/// anything not yet received.
fn reading_of(mirror: &MirrorState) -> ClockReading {
    let instant = mirror
        .fields
        .get(&ClockField::Ticks)
        .and_then(FieldValue::as_text)
        .and_then(|encoded| match GameInstant::from_encoded(encoded) {
            Ok(instant) => Some(instant),
            Err(err) => {
                warn!(error = %err, "mirrored tick count is malformed, falling back to wall clock");
                None
            }
        })
        .unwrap_or_else(GameInstant::now);

    let paused = mirror
        .fields
        .get(&ClockField::Paused)
        .and_then(FieldValue::as_bool)
        .unwrap_or(false);

    let day_start_hour = mirrored_hour(mirror, ClockField::DayStartHour, defaults::DAY_START_HOUR);
    let night_start_hour =
        mirrored_hour(mirror, ClockField::NightStartHour, defaults::NIGHT_START_HOUR);
    let day_ms_per_minute = mirrored_duration(mirror, ClockField::DayMsPerMinute);
    let night_ms_per_minute = mirrored_duration(mirror, ClockField::NightMsPerMinute);

    let hour = instant.hour();
    let is_day = u32::from(day_start_hour) <= hour && hour < u32::from(night_start_hour);
    let current_ms_per_minute = if is_day {
        day_ms_per_minute
    } else {
        night_ms_per_minute
    };

    ClockReading {
        instant,
        year: instant.year(),
        month: instant.month(),
        day: instant.day(),
        hour,
        minute: instant.minute(),
        second: instant.second(),
        paused,
        is_day,
        day_start_hour,
        night_start_hour,
        day_ms_per_minute,
        night_ms_per_minute,
        current_ms_per_minute,
    }
}

/// A mirrored hour field, clamped into `[0, 23]`.
fn mirrored_hour(mirror: &MirrorState, field: ClockField, default: u8) -> u8 {
    mirror
        .fields
        .get(&field)
        .and_then(FieldValue::as_i64)
        .and_then(|hour| u8::try_from(hour.clamp(0, 23)).ok())
        .unwrap_or(default)
}

/// A mirrored duration field, falling back to the default for anything
/// non-positive or missing.
fn mirrored_duration(mirror: &MirrorState, field: ClockField) -> u32 {
    mirror
        .fields
        .get(&field)
        .and_then(FieldValue::as_i64)
        .and_then(|ms| u32::try_from(ms).ok())
        .filter(|ms| *ms > 0)
        .unwrap_or(defaults::MS_PER_GAME_MINUTE)
}

impl ClockApi for ObserverReconciler {
    fn reading(&self) -> Result<ClockReading, ApiError> {
        Ok(Self::reading(self))
    }

    fn manual_override(&self) -> Result<bool, ApiError> {
        Ok(Self::manual_override(self))
    }

    fn set_time(
        &self,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> futures::future::BoxFuture<'_, Result<(), ApiError>> {
        // An explicit override-driven write straight to the display.
        let result = chrono::NaiveTime::from_hms_opt(hour, minute, second)
            .ok_or(ApiError::Instant(InstantError::InvalidTime {
                hour,
                minute,
                second,
            }))
            .map(|_time| {
                self.visual.override_clock_time(hour, minute, second);
            });
        Box::pin(futures::future::ready(result))
    }

    fn set_date(
        &self,
        day: u32,
        month: u32,
        year: i32,
    ) -> futures::future::BoxFuture<'_, Result<(), ApiError>> {
        let result = chrono::NaiveDate::from_ymd_opt(year, month, day)
            .ok_or(ApiError::Instant(InstantError::InvalidDate {
                year,
                month,
                day,
            }))
            .map(|_date| {
                self.visual.set_clock_date(year, month, day);
            });
        Box::pin(futures::future::ready(result))
    }

    fn set_paused(&self, _paused: bool) -> futures::future::BoxFuture<'_, Result<(), ApiError>> {
        Box::pin(futures::future::ready(Err(ApiError::Unsupported {
            operation: "set_paused",
        })))
    }

    fn set_day_start_hour(&self, _hour: i64) -> futures::future::BoxFuture<'_, Result<(), ApiError>> {
        Box::pin(futures::future::ready(Err(ApiError::Unsupported {
            operation: "set_day_start_hour",
        })))
    }

    fn set_night_start_hour(
        &self,
        _hour: i64,
    ) -> futures::future::BoxFuture<'_, Result<(), ApiError>> {
        Box::pin(futures::future::ready(Err(ApiError::Unsupported {
            operation: "set_night_start_hour",
        })))
    }

    fn set_day_ms_per_minute(
        &self,
        _ms: i64,
    ) -> futures::future::BoxFuture<'_, Result<(), ApiError>> {
        Box::pin(futures::future::ready(Err(ApiError::Unsupported {
            operation: "set_day_ms_per_minute",
        })))
    }

    fn set_night_ms_per_minute(
        &self,
        _ms: i64,
    ) -> futures::future::BoxFuture<'_, Result<(), ApiError>> {
        Box::pin(futures::future::ready(Err(ApiError::Unsupported {
            operation: "set_night_ms_per_minute",
        })))
    }

    fn set_manual_override(
        &self,
        engaged: bool,
    ) -> futures::future::BoxFuture<'_, Result<(), ApiError>> {
        Self::set_manual_override(self, engaged);
        Box::pin(futures::future::ready(Ok(())))
    }

    fn sync(&self) -> futures::future::BoxFuture<'_, Result<(), ApiError>> {
        Self::sync(self);
        Box::pin(futures::future::ready(Ok(())))
    }

    fn save(&self) -> futures::future::BoxFuture<'_, Result<(), ApiError>> {
        Box::pin(futures::future::ready(Err(ApiError::Unsupported {
            operation: "save",
        })))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::visual::{RecordingVisualClock, VisualCall};

    use super::*;

    fn encoded_at(hour: u32, minute: u32) -> String {
        GameInstant::from_ticks(0)
            .unwrap()
            .with_date(2024, 6, 15)
            .unwrap()
            .with_time(hour, minute, 0)
            .unwrap()
            .encode()
    }

    fn ticks_update(hour: u32, minute: u32) -> FieldUpdate {
        FieldUpdate {
            field: ClockField::Ticks,
            previous: None,
            current: FieldValue::Text(encoded_at(hour, minute)),
        }
    }

    fn paused_update(paused: bool) -> FieldUpdate {
        FieldUpdate {
            field: ClockField::Paused,
            previous: Some(FieldValue::Boolean(!paused)),
            current: FieldValue::Boolean(paused),
        }
    }

    fn reconciler() -> (ObserverReconciler, Arc<RecordingVisualClock>) {
        let visual = Arc::new(RecordingVisualClock::new());
        let reconciler = ObserverReconciler::new(Arc::clone(&visual) as Arc<dyn VisualClock>);
        (reconciler, visual)
    }

    #[test]
    fn ticks_update_applies_date_and_time_directly() {
        let (reconciler, visual) = reconciler();
        reconciler.apply(&ticks_update(10, 30)).unwrap();

        assert_eq!(visual.last_date(), Some((2024, 6, 15)));
        assert_eq!(visual.last_time(), Some((10, 30, 0)));
        // A plain time update never touches the rate.
        assert_eq!(visual.last_rate(), None);
    }

    #[test]
    fn pause_update_freezes_the_visual_rate() {
        let (reconciler, visual) = reconciler();
        reconciler.apply(&paused_update(true)).unwrap();
        assert_eq!(visual.last_rate(), Some(FROZEN_RATE_MS));
    }

    #[test]
    fn unpause_update_resyncs_rate_and_values() {
        let (reconciler, visual) = reconciler();
        reconciler.apply(&ticks_update(12, 0)).unwrap();
        reconciler
            .apply(&FieldUpdate {
                field: ClockField::DayMsPerMinute,
                previous: None,
                current: FieldValue::Integer(750),
            })
            .unwrap();
        visual.clear();

        reconciler.apply(&paused_update(false)).unwrap();

        // Noon falls in the default day window, so the day rate applies.
        assert_eq!(visual.last_rate(), Some(750));
        assert_eq!(visual.last_time(), Some((12, 0, 0)));
    }

    #[test]
    fn override_swallows_time_updates() {
        let (reconciler, visual) = reconciler();
        reconciler.apply(&ticks_update(10, 30)).unwrap();
        reconciler.set_manual_override(true);
        assert_eq!(visual.last_rate(), Some(FROZEN_RATE_MS));
        visual.clear();

        reconciler.apply(&ticks_update(18, 45)).unwrap();
        reconciler.apply(&paused_update(true)).unwrap();

        // Nothing reached the display while overridden.
        assert!(visual.calls().is_empty());
        // The mirror still recorded the authoritative values.
        assert_eq!(reconciler.reading().hour, 18);
    }

    #[test]
    fn releasing_override_syncs_to_the_last_snapshot() {
        let (reconciler, visual) = reconciler();
        reconciler.apply(&ticks_update(10, 30)).unwrap();
        reconciler.set_manual_override(true);
        reconciler.apply(&ticks_update(18, 45)).unwrap();
        reconciler.apply(&paused_update(false)).unwrap();
        visual.clear();

        reconciler.set_manual_override(false);

        // The display now shows the last authoritative snapshot.
        assert_eq!(visual.last_time(), Some((18, 45, 0)));
        assert_eq!(visual.last_date(), Some((2024, 6, 15)));
        assert_eq!(
            visual.last_rate(),
            Some(timekeeper_types::defaults::MS_PER_GAME_MINUTE)
        );
    }

    #[test]
    fn sync_is_a_noop_under_override() {
        let (reconciler, visual) = reconciler();
        reconciler.set_manual_override(true);
        visual.clear();
        reconciler.sync();
        assert!(visual.calls().is_empty());
    }

    #[test]
    fn sync_freezes_while_the_authority_is_paused() {
        let (reconciler, visual) = reconciler();
        reconciler.apply(&ticks_update(10, 30)).unwrap();
        reconciler.apply(&paused_update(true)).unwrap();
        visual.clear();

        reconciler.sync();
        assert_eq!(visual.last_rate(), Some(FROZEN_RATE_MS));
    }

    #[test]
    fn seed_applies_the_snapshot() {
        let (reconciler, visual) = reconciler();
        let mut snapshot = ClockSnapshot::new();
        snapshot.insert(ClockField::Ticks, FieldValue::Text(encoded_at(7, 15)));
        snapshot.insert(ClockField::Paused, FieldValue::Boolean(false));
        snapshot.insert(ClockField::NightMsPerMinute, FieldValue::Integer(4000));

        reconciler.seed(&snapshot);

        assert_eq!(visual.last_time(), Some((7, 15, 0)));
        // 07:15 is day under the defaults, so the (defaulted) day rate
        // applies rather than the seeded night rate.
        assert_eq!(
            visual.last_rate(),
            Some(timekeeper_types::defaults::MS_PER_GAME_MINUTE)
        );
        assert_eq!(reconciler.reading().night_ms_per_minute, 4000);
    }

    #[test]
    fn unexpected_value_types_are_rejected_but_mirrored() {
        let (reconciler, _visual) = reconciler();
        let bogus = FieldUpdate {
            field: ClockField::Paused,
            previous: None,
            current: FieldValue::Integer(1),
        };
        assert!(matches!(
            reconciler.apply(&bogus),
            Err(ReconcileError::UnexpectedType {
                field: ClockField::Paused
            })
        ));
    }

    #[test]
    fn malformed_ticks_are_rejected() {
        let (reconciler, visual) = reconciler();
        let bogus = FieldUpdate {
            field: ClockField::Ticks,
            previous: None,
            current: FieldValue::Text(String::from("garbage")),
        };
        assert!(matches!(
            reconciler.apply(&bogus),
            Err(ReconcileError::Instant(_))
        ));
        assert!(visual.calls().is_empty());
    }

    #[test]
    fn empty_mirror_reads_fall_back_to_defaults() {
        let (reconciler, _visual) = reconciler();
        let reading = ObserverReconciler::reading(&reconciler);
        assert_eq!(reading.day_start_hour, defaults::DAY_START_HOUR);
        assert_eq!(reading.night_start_hour, defaults::NIGHT_START_HOUR);
        assert_eq!(reading.day_ms_per_minute, defaults::MS_PER_GAME_MINUTE);
        assert!(!reading.paused);
        // With no replicated instant, the mirror falls back to the wall
        // clock.
        assert!(reading.year > 2000);
    }

    #[test]
    fn ordered_sequence_of_visual_calls_on_time_update() {
        let (reconciler, visual) = reconciler();
        reconciler.apply(&ticks_update(10, 30)).unwrap();
        assert_eq!(
            visual.calls(),
            vec![
                VisualCall::Date {
                    year: 2024,
                    month: 6,
                    day: 15
                },
                VisualCall::Time {
                    hour: 10,
                    minute: 30,
                    second: 0
                },
            ]
        );
    }
}
