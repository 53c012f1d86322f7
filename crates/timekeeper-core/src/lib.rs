//! Authoritative clock engine for the Timekeeper service.
//!
//! This crate owns the canonical clock state and everything that moves it:
//! the minute-granularity tick scheduler, the replication bus that fans
//! state out to observers, and the resilient facade external callers go
//! through.
//!
//! # Modules
//!
//! - [`clock`] -- [`ClockState`], the single mutation point for all clock
//!   fields, with derived day/night and rate reads.
//! - [`authority`] -- [`ClockAuthority`], the owning handle: seeding from
//!   durable storage, administrative writes, persistence, publication.
//! - [`scheduler`] -- The cancellable tick loop advancing the clock one
//!   minute per cycle.
//! - [`bus`] -- [`ReplicationBus`], best-effort field broadcast to
//!   observers.
//! - [`facade`] -- [`ClockFacade`] and the [`ClockApi`] contract, with
//!   graceful degradation when the authority is away.
//! - [`config`] -- Configuration loading from `clock-config.yaml`.
//!
//! [`ClockState`]: clock::ClockState
//! [`ClockAuthority`]: authority::ClockAuthority
//! [`ReplicationBus`]: bus::ReplicationBus
//! [`ClockFacade`]: facade::ClockFacade
//! [`ClockApi`]: facade::ClockApi

pub mod authority;
pub mod bus;
pub mod clock;
pub mod config;
pub mod facade;
pub mod scheduler;
