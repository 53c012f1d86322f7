//! The tick scheduler: a single long-lived task advancing the clock one
//! minute per cycle.
//!
//! The loop has exactly one suspension point, the per-minute rate wait,
//! and that wait is cancellable: pausing the clock wakes the task
//! immediately and the interrupted cycle is discarded without advancing.
//! Resuming starts a fresh cycle (it does not resume the cancelled wait),
//! so progression continues from the exact paused instant.
//!
//! The rate is sampled *before* each wait; a configuration change applies
//! from the next cycle's wait, never retroactively.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{info, warn};

use crate::authority::ClockAuthority;

/// Pause/stop control shared between the authority and the tick loop.
///
/// Atomic flags keep the hot path lock-free; the notify cancels the
/// in-flight wait promptly on pause, resume, or stop.
#[derive(Debug)]
pub struct SchedulerControl {
    /// Whether the scheduler is paused (not running cycles).
    paused: AtomicBool,

    /// Whether a stop has been requested.
    stopped: AtomicBool,

    /// Wakes the loop out of its wait or its paused parking.
    wake: Notify,
}

impl SchedulerControl {
    /// Create a control, optionally starting in the paused state.
    pub fn new(paused: bool) -> Self {
        Self {
            paused: AtomicBool::new(paused),
            stopped: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    /// Whether the scheduler is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Whether a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Pause the scheduler, cancelling any in-flight wait.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    /// Resume the scheduler; the next cycle starts immediately.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.wake.notify_one();
    }

    /// Request a clean stop, cancelling any in-flight wait.
    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    /// Wait for the next pause/resume/stop notification.
    async fn woken(&self) {
        self.wake.notified().await;
    }
}

/// Run the tick loop until a stop is requested.
///
/// One iteration per cycle:
///
/// 1. Park while paused (the scheduler is not running).
/// 2. Sample the current rate, then wait that long -- cancellable.
/// 3. Re-check pause/stop after the wait; a cancelled or stale cycle is
///    discarded without advancing.
/// 4. Advance the clock one minute (events, persistence, publication
///    happen inside [`ClockAuthority::advance_cycle`]).
///
/// On stop, the final in-memory instant is persisted even when the last
/// hour boundary predates it.
pub async fn run_scheduler(authority: Arc<ClockAuthority>) {
    info!("tick scheduler running");
    loop {
        if authority.control().is_stopped() {
            break;
        }
        if authority.control().is_paused() {
            authority.control().woken().await;
            continue;
        }

        let rate_ms = u64::from(authority.current_rate_ms());
        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(rate_ms)) => {}
            () = authority.control().woken() => {
                // Cancelled mid-wait: discard this cycle without advancing.
                continue;
            }
        }
        if authority.control().is_stopped() || authority.control().is_paused() {
            continue;
        }

        if let Err(err) = authority.advance_cycle().await {
            warn!(error = %err, "tick advance failed, stopping scheduler");
            authority.control().request_stop();
        }
    }

    authority.persist_now().await;
    info!("tick scheduler stopped");
}
