//! Observer-side clock reconciliation for the Timekeeper service.
//!
//! An observer mirrors the authority's replicated fields into local state
//! and keeps a visual clock consistent with it -- except while its
//! operator has engaged manual override, which detaches the visual clock
//! from replication entirely.
//!
//! # Modules
//!
//! - [`visual`] -- The [`VisualClock`] seam (the single "apply visual
//!   time" side effect) and its logging/recording implementations.
//! - [`mirror`] -- [`ObserverReconciler`], the replicated-field mirror
//!   with override semantics.
//!
//! [`VisualClock`]: visual::VisualClock
//! [`ObserverReconciler`]: mirror::ObserverReconciler

pub mod mirror;
pub mod visual;

pub use mirror::{ObserverReconciler, ReconcileError};
pub use visual::{FROZEN_RATE_MS, RecordingVisualClock, TracingVisualClock, VisualCall, VisualClock};
