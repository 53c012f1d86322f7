//! End-to-end reconciliation tests: a clock authority publishing over the
//! replication bus into an observer reconciler driving a recorded visual
//! clock.
//!
//! The bus receiver is pumped synchronously after each authority
//! operation, so delivery order and reaction order are deterministic.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use timekeeper_core::authority::ClockAuthority;
use timekeeper_core::config::ClockConfig;
use timekeeper_core::facade::{ClockApi, ClockFacade};
use timekeeper_observer::{FROZEN_RATE_MS, ObserverReconciler, RecordingVisualClock, VisualClock};
use timekeeper_store::{MemoryStore, TickStore};
use timekeeper_types::{FieldUpdate, GameInstant};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

fn encoded_at(hour: u32, minute: u32) -> String {
    GameInstant::from_ticks(0)
        .unwrap()
        .with_date(2024, 6, 15)
        .unwrap()
        .with_time(hour, minute, 0)
        .unwrap()
        .encode()
}

async fn authority_at(hour: u32, minute: u32) -> Arc<ClockAuthority> {
    let store = Arc::new(MemoryStore::with_value(&encoded_at(hour, minute)));
    ClockAuthority::start(&ClockConfig::default(), store as Arc<dyn TickStore>).await
}

/// Deliver every queued bus update to the reconciler.
fn pump(rx: &mut broadcast::Receiver<FieldUpdate>, reconciler: &ObserverReconciler) {
    loop {
        match rx.try_recv() {
            Ok(update) => {
                let _ = reconciler.apply(&update);
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => return,
            Err(TryRecvError::Lagged(_)) => {}
        }
    }
}

fn observer() -> (Arc<ObserverReconciler>, Arc<RecordingVisualClock>) {
    let visual = Arc::new(RecordingVisualClock::new());
    let reconciler = Arc::new(ObserverReconciler::new(
        Arc::clone(&visual) as Arc<dyn VisualClock>
    ));
    (reconciler, visual)
}

#[tokio::test]
async fn late_joiner_seeds_from_the_snapshot() {
    let authority = authority_at(10, 30).await;
    // The startup publish already happened; a late joiner only gets the
    // snapshot.
    let (reconciler, visual) = observer();
    reconciler.seed(&authority.bus().snapshot());

    assert_eq!(visual.last_date(), Some((2024, 6, 15)));
    assert_eq!(visual.last_time(), Some((10, 30, 0)));
    assert_eq!(reconciler.reading().instant, authority.reading().instant);
}

#[tokio::test]
async fn administrative_jump_reaches_the_visual_clock() {
    let authority = authority_at(10, 30).await;
    let (reconciler, visual) = observer();
    let mut rx = authority.bus().subscribe();
    reconciler.seed(&authority.bus().snapshot());

    authority.set_time(22, 45, 0).await.unwrap();
    pump(&mut rx, &reconciler);

    assert_eq!(visual.last_time(), Some((22, 45, 0)));
    assert_eq!(reconciler.reading().hour, 22);
}

#[tokio::test]
async fn tick_advances_replicate_without_drift() {
    let authority = authority_at(10, 30).await;
    let (reconciler, visual) = observer();
    let mut rx = authority.bus().subscribe();
    reconciler.seed(&authority.bus().snapshot());

    for _ in 0..3 {
        authority.advance_cycle().await.unwrap();
    }
    pump(&mut rx, &reconciler);

    assert_eq!(visual.last_time(), Some((10, 33, 0)));
    assert_eq!(reconciler.reading().instant, authority.reading().instant);
}

#[tokio::test]
async fn pause_freezes_every_observer() {
    let authority = authority_at(10, 30).await;
    let (reconciler, visual) = observer();
    let mut rx = authority.bus().subscribe();
    reconciler.seed(&authority.bus().snapshot());

    authority.set_paused(true).await;
    pump(&mut rx, &reconciler);
    assert_eq!(visual.last_rate(), Some(FROZEN_RATE_MS));

    authority.set_paused(false).await;
    pump(&mut rx, &reconciler);
    // Back to the authoritative rate.
    assert_eq!(visual.last_rate(), Some(authority.reading().current_ms_per_minute));
}

#[tokio::test]
async fn overridden_observer_ignores_updates_until_released() {
    let authority = authority_at(10, 30).await;
    let (reconciler, visual) = observer();
    let mut rx = authority.bus().subscribe();
    reconciler.seed(&authority.bus().snapshot());

    reconciler.set_manual_override(true);
    visual.clear();

    authority.set_time(18, 45, 0).await.unwrap();
    pump(&mut rx, &reconciler);
    assert!(visual.calls().is_empty(), "overridden display must not move");

    reconciler.set_manual_override(false);
    assert_eq!(visual.last_time(), Some((18, 45, 0)));
}

#[tokio::test]
async fn two_observers_can_diverge_through_override() {
    let authority = authority_at(10, 30).await;
    let (first, first_visual) = observer();
    let (second, second_visual) = observer();
    let mut first_rx = authority.bus().subscribe();
    let mut second_rx = authority.bus().subscribe();
    first.seed(&authority.bus().snapshot());
    second.seed(&authority.bus().snapshot());

    second.set_manual_override(true);

    authority.set_time(6, 0, 0).await.unwrap();
    pump(&mut first_rx, &first);
    pump(&mut second_rx, &second);

    assert_eq!(first_visual.last_time(), Some((6, 0, 0)));
    assert_ne!(second_visual.last_time(), Some((6, 0, 0)));
    // Both mirrors agree on the authoritative value regardless.
    assert_eq!(first.reading().hour, 6);
    assert_eq!(second.reading().hour, 6);
}

#[tokio::test]
async fn facade_serves_the_observer_side() {
    let authority = authority_at(10, 30).await;
    let (reconciler, visual) = observer();
    reconciler.seed(&authority.bus().snapshot());

    let facade = ClockFacade::new();
    facade.attach(Arc::clone(&reconciler) as Arc<dyn ClockApi>);

    assert_eq!(facade.hours(0), 10);
    assert!(!facade.manual_override(true));

    // Observer-side facade writes: override on, then an explicit
    // override-driven time write.
    assert!(facade.set_manual_override(true).await);
    assert!(facade.set_time(1, 2, 3).await);
    assert_eq!(visual.last_time(), Some((1, 2, 3)));

    // Authority-only operations degrade to a skipped write, not a fault.
    assert!(!facade.set_paused(true).await);
    assert!(!facade.set_day_ms_per_minute(500).await);
}
