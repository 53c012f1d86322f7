//! The authoritative clock owner: seeding, administrative writes,
//! persistence, and publication.
//!
//! [`ClockAuthority`] holds the canonical [`ClockState`] and is the only
//! component that mutates it. The tick scheduler drives normal
//! progression through [`advance_cycle`](ClockAuthority::advance_cycle);
//! administrative operations serialize onto the same mutation gate, so
//! there is exactly one logical writer at any time.
//!
//! # Boundary events and the calendar cursor
//!
//! The authority caches the year/month/day/hour of the last published
//! instant. A tick advance diffs the new instant against the cursor and
//! emits one boundary event per changed unit, coarse to fine. Explicit
//! date/time jumps refresh the cursor *without* emitting events: external
//! jumps are deliberately silent so boundary subscribers are not flooded
//! when an operator moves the clock.
//!
//! # Durability
//!
//! `clock:ticks` is written through on hour boundaries, on explicit
//! date/time jumps, and at shutdown. Minute-level persistence is
//! intentionally skipped to bound write volume, and a failed write never
//! stops the clock: the in-memory instant stays authoritative.

use std::sync::{Arc, PoisonError, RwLock};

use timekeeper_store::TickStore;
use timekeeper_types::{ClockEvent, ClockField, ClockReading, FieldValue, GameInstant};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use crate::bus::ReplicationBus;
use crate::clock::{ClockError, ClockState};
use crate::config::ClockConfig;
use crate::scheduler::SchedulerControl;

/// Capacity of the broadcast channel for boundary events.
const EVENT_CAPACITY: usize = 256;

/// The cached calendar units of the last published instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CalendarCursor {
    /// Year of the last published instant.
    year: i32,
    /// Month of the last published instant.
    month: u32,
    /// Day of the last published instant.
    day: u32,
    /// Hour of the last published instant.
    hour: u32,
}

impl CalendarCursor {
    /// Capture the cursor for an instant.
    fn stamp(instant: GameInstant) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
            day: instant.day(),
            hour: instant.hour(),
        }
    }

    /// Boundary events between this cursor and a newer instant, ordered
    /// coarse to fine (year, month, day, hour). The minute notification is
    /// not included; it fires on every cycle regardless.
    fn boundaries_to(self, instant: GameInstant) -> Vec<ClockEvent> {
        let mut events = Vec::new();
        if instant.year() != self.year {
            events.push(ClockEvent::Year {
                previous: self.year,
                current: instant.year(),
            });
        }
        if instant.month() != self.month {
            events.push(ClockEvent::Month {
                previous: self.month,
                current: instant.month(),
            });
        }
        if instant.day() != self.day {
            events.push(ClockEvent::Day {
                previous: self.day,
                current: instant.day(),
            });
        }
        if instant.hour() != self.hour {
            events.push(ClockEvent::Hour {
                previous: self.hour,
                current: instant.hour(),
            });
        }
        events
    }
}

/// The clock state plus its calendar cursor, guarded as one unit so a
/// jump and a tick can never interleave between the two.
#[derive(Debug)]
struct AuthorityState {
    /// The canonical clock state.
    clock: ClockState,

    /// Calendar units of the last published instant.
    cursor: CalendarCursor,
}

/// What a completed tick cycle produced, captured under the state lock
/// and acted on after it is released.
struct CycleOutcome {
    /// The instant before the advance.
    previous: GameInstant,

    /// The instant after the advance.
    advanced: GameInstant,

    /// Boundary events to emit, in coarse-to-fine order.
    boundaries: Vec<ClockEvent>,

    /// Whether the hour changed (triggers the write-through).
    hour_crossed: bool,

    /// The full field snapshot to publish.
    values: Vec<(ClockField, FieldValue)>,
}

/// The single authoritative owner of the clock.
pub struct ClockAuthority {
    /// Clock state and cursor, readable by anyone.
    state: RwLock<AuthorityState>,

    /// Single-writer gate: every mutation (tick or administrative)
    /// serializes here.
    mutation: Mutex<()>,

    /// Scheduler pause/stop control.
    control: SchedulerControl,

    /// Boundary event broadcast.
    events: broadcast::Sender<ClockEvent>,

    /// The replication channel to observers.
    bus: ReplicationBus,

    /// Durable tick storage.
    store: Arc<dyn TickStore>,
}

impl ClockAuthority {
    /// Construct the authority: seed the instant from durable storage
    /// (falling back to the wall clock), apply the configuration, and
    /// publish the initial full state.
    ///
    /// The scheduler is not started here; spawn
    /// [`run_scheduler`](crate::scheduler::run_scheduler) with the
    /// returned handle.
    pub async fn start(config: &ClockConfig, store: Arc<dyn TickStore>) -> Arc<Self> {
        let instant = seed_instant(store.as_ref()).await;
        let clock = ClockState::from_config(instant, config);
        let paused = clock.paused();

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let authority = Arc::new(Self {
            state: RwLock::new(AuthorityState {
                clock,
                cursor: CalendarCursor::stamp(instant),
            }),
            mutation: Mutex::new(()),
            control: SchedulerControl::new(paused),
            events,
            bus: ReplicationBus::new(),
            store,
        });

        authority.publish_values(authority.read_state(|state| state.clock.field_values()));
        info!(instant = %instant, paused, "clock authority started");
        authority
    }

    // -----------------------------------------------------------------------
    // Shared access helpers
    // -----------------------------------------------------------------------

    /// Read the guarded state through a projection.
    fn read_state<T>(&self, project: impl FnOnce(&AuthorityState) -> T) -> T {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        project(&guard)
    }

    /// Mutate the guarded state through a projection. Callers must hold
    /// the mutation gate.
    fn write_state<T>(&self, mutate: impl FnOnce(&mut AuthorityState) -> T) -> T {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        mutate(&mut guard)
    }

    /// A full derived reading of the clock.
    pub fn reading(&self) -> ClockReading {
        self.read_state(|state| state.clock.reading())
    }

    /// The minute duration currently in effect.
    pub fn current_rate_ms(&self) -> u32 {
        self.read_state(|state| state.clock.current_rate_ms())
    }

    /// Subscribe to boundary events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ClockEvent> {
        self.events.subscribe()
    }

    /// The replication channel to observers.
    pub const fn bus(&self) -> &ReplicationBus {
        &self.bus
    }

    /// The scheduler control shared with the tick loop.
    pub(crate) const fn control(&self) -> &SchedulerControl {
        &self.control
    }

    /// Request a clean scheduler stop (final persist happens in the
    /// scheduler's shutdown path).
    pub fn request_stop(&self) {
        self.control.request_stop();
    }

    // -----------------------------------------------------------------------
    // Tick cycle
    // -----------------------------------------------------------------------

    /// Execute the state mutation half of one tick cycle: advance one
    /// minute, emit boundary events, write through on hour rollover, and
    /// publish the full state.
    ///
    /// Driven by the scheduler; exposed so tests can step cycles directly.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the counter cannot advance.
    pub async fn advance_cycle(&self) -> Result<(), ClockError> {
        let _gate = self.mutation.lock().await;

        let outcome = self.write_state(|state| -> Result<CycleOutcome, ClockError> {
            let previous = state.clock.instant();
            let advanced = state.clock.advance_minute()?;
            let cursor = state.cursor;
            state.cursor = CalendarCursor::stamp(advanced);
            Ok(CycleOutcome {
                previous,
                advanced,
                boundaries: cursor.boundaries_to(advanced),
                hour_crossed: cursor.hour != advanced.hour(),
                values: state.clock.field_values(),
            })
        })?;

        // Coarse-to-fine boundary events first.
        for event in &outcome.boundaries {
            let _ = self.events.send(*event);
        }

        // Write-through on hour rollover only, and always before this
        // cycle's publish.
        if outcome.hour_crossed {
            self.persist(outcome.advanced).await;
        }

        let _ = self.events.send(ClockEvent::Minute {
            previous: outcome.previous.minute(),
            current: outcome.advanced.minute(),
        });

        debug!(instant = %outcome.advanced, "tick advanced");
        self.publish_values(outcome.values);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Administrative writes (silent jumps: persist + publish, no events)
    // -----------------------------------------------------------------------

    /// Jump the time of day, keeping the date. Persists and publishes
    /// immediately; emits no boundary events.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Instant`] for impossible time values.
    pub async fn set_time(&self, hour: u32, minute: u32, second: u32) -> Result<(), ClockError> {
        let _gate = self.mutation.lock().await;
        let (instant, values) = self.write_state(|state| {
            let instant = state.clock.set_time(hour, minute, second)?;
            state.cursor = CalendarCursor::stamp(instant);
            Ok::<_, ClockError>((instant, state.clock.field_values()))
        })?;
        self.persist(instant).await;
        self.publish_values(values);
        info!(instant = %instant, "clock time set");
        Ok(())
    }

    /// Jump the calendar date, keeping the time of day. Persists and
    /// publishes immediately; emits no boundary events.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Instant`] for impossible dates.
    pub async fn set_date(&self, day: u32, month: u32, year: i32) -> Result<(), ClockError> {
        let _gate = self.mutation.lock().await;
        let (instant, values) = self.write_state(|state| {
            let instant = state.clock.set_date(day, month, year)?;
            state.cursor = CalendarCursor::stamp(instant);
            Ok::<_, ClockError>((instant, state.clock.field_values()))
        })?;
        self.persist(instant).await;
        self.publish_values(values);
        info!(instant = %instant, "clock date set");
        Ok(())
    }

    /// Pause or resume the clock. Pausing cancels the scheduler's
    /// in-flight wait; resuming starts a fresh cycle from the exact
    /// paused instant.
    pub async fn set_paused(&self, paused: bool) {
        let _gate = self.mutation.lock().await;
        let values = self.write_state(|state| {
            state.clock.set_paused(paused);
            state.cursor = CalendarCursor::stamp(state.clock.instant());
            state.clock.field_values()
        });
        if paused {
            self.control.pause();
        } else {
            self.control.resume();
        }
        self.publish_values(values);
        info!(paused, "clock pause state changed");
    }

    /// Set the day start hour (clamped). Returns the stored value.
    pub async fn set_day_start_hour(&self, hour: i64) -> u8 {
        let _gate = self.mutation.lock().await;
        let (stored, values) = self.write_state(|state| {
            let stored = state.clock.set_day_start_hour(hour);
            (stored, state.clock.field_values())
        });
        self.publish_values(values);
        stored
    }

    /// Set the night start hour (clamped). Returns the stored value.
    pub async fn set_night_start_hour(&self, hour: i64) -> u8 {
        let _gate = self.mutation.lock().await;
        let (stored, values) = self.write_state(|state| {
            let stored = state.clock.set_night_start_hour(hour);
            (stored, state.clock.field_values())
        });
        self.publish_values(values);
        stored
    }

    /// Set the day minute duration. Takes effect from the scheduler's
    /// next wait, never retroactively.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidDuration`] for non-positive values.
    pub async fn set_day_ms_per_minute(&self, ms: i64) -> Result<u32, ClockError> {
        let _gate = self.mutation.lock().await;
        let (stored, values) = self.write_state(|state| {
            let stored = state.clock.set_day_ms_per_minute(ms)?;
            Ok::<_, ClockError>((stored, state.clock.field_values()))
        })?;
        self.publish_values(values);
        Ok(stored)
    }

    /// Set the night minute duration. Takes effect from the scheduler's
    /// next wait, never retroactively.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidDuration`] for non-positive values.
    pub async fn set_night_ms_per_minute(&self, ms: i64) -> Result<u32, ClockError> {
        let _gate = self.mutation.lock().await;
        let (stored, values) = self.write_state(|state| {
            let stored = state.clock.set_night_ms_per_minute(ms)?;
            Ok::<_, ClockError>((stored, state.clock.field_values()))
        })?;
        self.publish_values(values);
        Ok(stored)
    }

    /// Re-broadcast the full current state to all observers and refresh
    /// the calendar cursor. Idempotent with respect to clock state.
    pub async fn sync_now(&self) {
        let _gate = self.mutation.lock().await;
        let values = self.write_state(|state| {
            state.cursor = CalendarCursor::stamp(state.clock.instant());
            state.clock.field_values()
        });
        self.publish_values(values);
        debug!("clock state republished");
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Persist the current instant immediately (shutdown and the explicit
    /// `save` administrative command).
    pub async fn persist_now(&self) {
        let instant = self.read_state(|state| state.clock.instant());
        self.persist(instant).await;
    }

    /// Write an instant through to durable storage. Failures are logged
    /// and swallowed: the in-memory value stays authoritative.
    async fn persist(&self, instant: GameInstant) {
        let encoded = instant.encode();
        match self.store.save_ticks(&encoded).await {
            Ok(()) => debug!(instant = %instant, "clock state persisted"),
            Err(err) => {
                warn!(error = %err, instant = %instant, "failed to persist clock state");
            }
        }
    }

    /// Publish a field snapshot to the replication bus, in order.
    fn publish_values(&self, values: Vec<(ClockField, FieldValue)>) {
        for (field, value) in values {
            self.bus.publish(field, value);
        }
    }
}

impl crate::facade::ClockApi for ClockAuthority {
    fn reading(&self) -> Result<ClockReading, crate::facade::ApiError> {
        Ok(Self::reading(self))
    }

    fn manual_override(&self) -> Result<bool, crate::facade::ApiError> {
        // Manual override is an observer-local mode; the authority has no
        // such concept.
        Err(crate::facade::ApiError::Unsupported {
            operation: "manual_override",
        })
    }

    fn set_time(
        &self,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> futures::future::BoxFuture<'_, Result<(), crate::facade::ApiError>> {
        Box::pin(async move {
            Self::set_time(self, hour, minute, second).await?;
            Ok(())
        })
    }

    fn set_date(
        &self,
        day: u32,
        month: u32,
        year: i32,
    ) -> futures::future::BoxFuture<'_, Result<(), crate::facade::ApiError>> {
        Box::pin(async move {
            Self::set_date(self, day, month, year).await?;
            Ok(())
        })
    }

    fn set_paused(
        &self,
        paused: bool,
    ) -> futures::future::BoxFuture<'_, Result<(), crate::facade::ApiError>> {
        Box::pin(async move {
            Self::set_paused(self, paused).await;
            Ok(())
        })
    }

    fn set_day_start_hour(
        &self,
        hour: i64,
    ) -> futures::future::BoxFuture<'_, Result<(), crate::facade::ApiError>> {
        Box::pin(async move {
            Self::set_day_start_hour(self, hour).await;
            Ok(())
        })
    }

    fn set_night_start_hour(
        &self,
        hour: i64,
    ) -> futures::future::BoxFuture<'_, Result<(), crate::facade::ApiError>> {
        Box::pin(async move {
            Self::set_night_start_hour(self, hour).await;
            Ok(())
        })
    }

    fn set_day_ms_per_minute(
        &self,
        ms: i64,
    ) -> futures::future::BoxFuture<'_, Result<(), crate::facade::ApiError>> {
        Box::pin(async move {
            Self::set_day_ms_per_minute(self, ms).await?;
            Ok(())
        })
    }

    fn set_night_ms_per_minute(
        &self,
        ms: i64,
    ) -> futures::future::BoxFuture<'_, Result<(), crate::facade::ApiError>> {
        Box::pin(async move {
            Self::set_night_ms_per_minute(self, ms).await?;
            Ok(())
        })
    }

    fn set_manual_override(
        &self,
        _engaged: bool,
    ) -> futures::future::BoxFuture<'_, Result<(), crate::facade::ApiError>> {
        Box::pin(async {
            Err(crate::facade::ApiError::Unsupported {
                operation: "set_manual_override",
            })
        })
    }

    fn sync(&self) -> futures::future::BoxFuture<'_, Result<(), crate::facade::ApiError>> {
        Box::pin(async move {
            self.sync_now().await;
            Ok(())
        })
    }

    fn save(&self) -> futures::future::BoxFuture<'_, Result<(), crate::facade::ApiError>> {
        Box::pin(async move {
            self.persist_now().await;
            Ok(())
        })
    }
}

/// Seed the starting instant from durable storage.
///
/// Absence, a stored `"0"`, or a malformed value all fall back to the
/// wall clock; malformed values additionally warn (they cannot occur
/// under correct operation).
async fn seed_instant(store: &dyn TickStore) -> GameInstant {
    match store.load_ticks().await {
        Ok(Some(encoded)) => match GameInstant::from_encoded(&encoded) {
            Ok(instant) if instant.ticks() != 0 => {
                info!(instant = %instant, "seeded clock from durable storage");
                instant
            }
            Ok(_) => {
                info!("no stored clock state, seeding from wall clock");
                GameInstant::now()
            }
            Err(err) => {
                warn!(error = %err, stored = %encoded, "stored tick count is malformed, reseeding from wall clock");
                GameInstant::now()
            }
        },
        Ok(None) => {
            info!("no stored clock state, seeding from wall clock");
            GameInstant::now()
        }
        Err(err) => {
            warn!(error = %err, "failed to load stored clock state, seeding from wall clock");
            GameInstant::now()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures::future::BoxFuture;
    use timekeeper_store::{MemoryStore, StoreError};
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;

    /// A store whose loads fail, for exercising the seeding fallback.
    struct FailingLoadStore;

    impl TickStore for FailingLoadStore {
        fn load_ticks(&self) -> BoxFuture<'_, Result<Option<String>, StoreError>> {
            Box::pin(async { Err(StoreError::Injected) })
        }

        fn save_ticks<'a>(&'a self, _encoded: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
            Box::pin(async { Err(StoreError::Injected) })
        }
    }

    fn encoded_at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> String {
        GameInstant::from_ticks(0)
            .unwrap()
            .with_date(year, month, day)
            .unwrap()
            .with_time(hour, minute, 0)
            .unwrap()
            .encode()
    }

    async fn authority_at(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
    ) -> (Arc<ClockAuthority>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::with_value(&encoded_at(
            year, month, day, hour, minute,
        )));
        let authority = ClockAuthority::start(&ClockConfig::default(), Arc::clone(&store) as Arc<dyn TickStore>).await;
        (authority, store)
    }

    fn drain_events(rx: &mut broadcast::Receiver<ClockEvent>) -> Vec<ClockEvent> {
        let mut events = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return events,
                Err(TryRecvError::Lagged(_)) => {}
            }
        }
    }

    #[tokio::test]
    async fn seeds_exactly_from_stored_ticks() {
        let (authority, _store) = authority_at(2024, 6, 15, 10, 30).await;
        let reading = authority.reading();
        assert_eq!(
            (reading.year, reading.month, reading.day, reading.hour, reading.minute),
            (2024, 6, 15, 10, 30)
        );
        // Round trip through the store representation is exact.
        assert_eq!(reading.instant.encode(), encoded_at(2024, 6, 15, 10, 30));
    }

    #[tokio::test]
    async fn stored_zero_reseeds_from_wall_clock() {
        let store = Arc::new(MemoryStore::with_value("0"));
        let authority =
            ClockAuthority::start(&ClockConfig::default(), store as Arc<dyn TickStore>).await;
        // The wall clock is far past year 1.
        assert!(authority.reading().year > 2000);
    }

    #[tokio::test]
    async fn malformed_stored_value_reseeds_from_wall_clock() {
        let store = Arc::new(MemoryStore::with_value("garbage"));
        let authority =
            ClockAuthority::start(&ClockConfig::default(), store as Arc<dyn TickStore>).await;
        assert!(authority.reading().year > 2000);
    }

    #[tokio::test]
    async fn load_failure_reseeds_from_wall_clock() {
        let authority =
            ClockAuthority::start(&ClockConfig::default(), Arc::new(FailingLoadStore)).await;
        assert!(authority.reading().year > 2000);
    }

    #[tokio::test]
    async fn startup_publishes_the_full_state() {
        let (authority, _store) = authority_at(2024, 6, 15, 10, 30).await;
        let snapshot = authority.bus().snapshot();
        for field in ClockField::ALL {
            assert!(snapshot.get(field).is_some(), "missing {field}");
        }
    }

    #[tokio::test]
    async fn advance_emits_only_the_minute_event_within_an_hour() {
        let (authority, store) = authority_at(2024, 6, 15, 10, 30).await;
        let before = store.stored();
        let mut rx = authority.subscribe_events();

        authority.advance_cycle().await.unwrap();

        let events = drain_events(&mut rx);
        assert_eq!(
            events,
            vec![ClockEvent::Minute {
                previous: 30,
                current: 31
            }]
        );
        // No hour boundary crossed: no write-through.
        assert_eq!(store.stored(), before);
    }

    #[tokio::test]
    async fn advance_across_year_end_emits_events_coarse_to_fine() {
        let (authority, store) = authority_at(2024, 12, 31, 23, 59).await;
        let mut rx = authority.subscribe_events();

        authority.advance_cycle().await.unwrap();

        let events = drain_events(&mut rx);
        assert_eq!(
            events,
            vec![
                ClockEvent::Year {
                    previous: 2024,
                    current: 2025
                },
                ClockEvent::Month {
                    previous: 12,
                    current: 1
                },
                ClockEvent::Day {
                    previous: 31,
                    current: 1
                },
                ClockEvent::Hour {
                    previous: 23,
                    current: 0
                },
                ClockEvent::Minute {
                    previous: 59,
                    current: 0
                },
            ]
        );

        // The hour boundary forced a write-through of the new instant.
        let reading = authority.reading();
        assert_eq!(store.stored(), Some(reading.instant.encode()));
        assert_eq!((reading.year, reading.month, reading.day), (2025, 1, 1));
    }

    #[tokio::test]
    async fn hour_boundary_persists_before_the_cycle_publish() {
        let (authority, store) = authority_at(2024, 6, 15, 10, 59).await;
        let mut ticks_sub = authority.bus().subscribe_field(ClockField::Ticks);

        authority.advance_cycle().await.unwrap();

        // By the time the publish is observable, the store already holds
        // the same encoded instant.
        let update = ticks_sub.recv().await.unwrap();
        assert_eq!(
            update.current.as_text().map(str::to_owned),
            store.stored()
        );
    }

    #[tokio::test]
    async fn persistence_failure_does_not_stop_the_clock() {
        let (authority, store) = authority_at(2024, 6, 15, 10, 59).await;
        store.fail_writes(true);

        authority.advance_cycle().await.unwrap();

        let reading = authority.reading();
        assert_eq!((reading.hour, reading.minute), (11, 0));
        // The durable copy is stale, the in-memory value is authoritative.
        assert_eq!(store.stored(), Some(encoded_at(2024, 6, 15, 10, 59)));
    }

    #[tokio::test]
    async fn set_time_is_a_silent_persisted_jump() {
        let (authority, store) = authority_at(2024, 6, 15, 10, 30).await;
        let mut rx = authority.subscribe_events();

        authority.set_time(22, 45, 0).await.unwrap();

        // No boundary events, even though the hour changed.
        assert!(drain_events(&mut rx).is_empty());

        let reading = authority.reading();
        assert_eq!((reading.hour, reading.minute, reading.second), (22, 45, 0));
        assert_eq!((reading.year, reading.month, reading.day), (2024, 6, 15));
        // Persisted and published immediately.
        assert_eq!(store.stored(), Some(reading.instant.encode()));
        assert_eq!(
            authority.bus().latest(ClockField::Ticks),
            Some(FieldValue::Text(reading.instant.encode()))
        );
    }

    #[tokio::test]
    async fn jump_refreshes_the_cursor_for_the_next_cycle() {
        let (authority, _store) = authority_at(2024, 6, 15, 10, 30).await;
        let mut rx = authority.subscribe_events();

        // Jump to one minute before an hour boundary.
        authority.set_time(11, 59, 0).await.unwrap();
        authority.advance_cycle().await.unwrap();

        // The hour event compares against the jumped-to hour, not the
        // pre-jump one.
        let events = drain_events(&mut rx);
        assert_eq!(
            events,
            vec![
                ClockEvent::Hour {
                    previous: 11,
                    current: 12
                },
                ClockEvent::Minute {
                    previous: 59,
                    current: 0
                },
            ]
        );
    }

    #[tokio::test]
    async fn set_date_rejects_impossible_dates() {
        let (authority, store) = authority_at(2024, 6, 15, 10, 30).await;
        let before = store.stored();
        assert!(authority.set_date(30, 2, 2023).await.is_err());
        // Nothing persisted, nothing changed.
        assert_eq!(store.stored(), before);
        assert_eq!(authority.reading().day, 15);
    }

    #[tokio::test]
    async fn duration_rejection_leaves_state_untouched() {
        let (authority, _store) = authority_at(2024, 6, 15, 10, 30).await;
        assert!(authority.set_day_ms_per_minute(0).await.is_err());
        assert_eq!(authority.reading().day_ms_per_minute, 2000);

        let stored = authority.set_day_ms_per_minute(750).await.unwrap();
        assert_eq!(stored, 750);
        assert_eq!(authority.reading().day_ms_per_minute, 750);
    }

    #[tokio::test]
    async fn hour_setters_clamp_and_publish() {
        let (authority, _store) = authority_at(2024, 6, 15, 10, 30).await;
        assert_eq!(authority.set_day_start_hour(99).await, 23);
        assert_eq!(authority.set_night_start_hour(-3).await, 0);
        assert_eq!(
            authority.bus().latest(ClockField::DayStartHour),
            Some(FieldValue::Integer(23))
        );
        assert_eq!(
            authority.bus().latest(ClockField::NightStartHour),
            Some(FieldValue::Integer(0))
        );
    }

    #[tokio::test]
    async fn pause_publishes_and_halts_progression_state() {
        let (authority, _store) = authority_at(2024, 6, 15, 10, 30).await;
        authority.set_paused(true).await;
        assert!(authority.reading().paused);
        assert_eq!(
            authority.bus().latest(ClockField::Paused),
            Some(FieldValue::Boolean(true))
        );

        authority.set_paused(false).await;
        assert!(!authority.reading().paused);
    }

    #[tokio::test]
    async fn sync_republishes_without_mutating() {
        let (authority, _store) = authority_at(2024, 6, 15, 10, 30).await;
        let before = authority.reading();
        let mut ticks_sub = authority.bus().subscribe_field(ClockField::Ticks);

        authority.sync_now().await;

        let update = ticks_sub.recv().await.unwrap();
        assert_eq!(
            update.current,
            FieldValue::Text(before.instant.encode())
        );
        assert_eq!(authority.reading(), before);
    }
}
