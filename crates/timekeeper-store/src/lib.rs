//! Durable tick storage for the Timekeeper clock service.
//!
//! The clock persists exactly one durable entry: the string-encoded tick
//! count under the key `clock:ticks`. This crate defines the [`TickStore`]
//! seam the authority writes through, a Dragonfly (Redis-compatible)
//! backend for production, and an in-memory backend for tests.
//!
//! # Modules
//!
//! - [`dragonfly`] -- [`DragonflyStore`], backed by a `fred` client.
//! - [`memory`] -- [`MemoryStore`], an in-process store for tests.

pub mod dragonfly;
pub mod error;
pub mod memory;

use futures::future::BoxFuture;

pub use dragonfly::DragonflyStore;
pub use error::StoreError;
pub use memory::MemoryStore;

/// The single durable key holding the string-encoded tick count.
pub const TICKS_KEY: &str = "clock:ticks";

/// An opaque durable string store for the clock's tick count.
///
/// Implementations must treat the value as an opaque string; encoding and
/// decoding belong to the clock layer. Absence of the key means no prior
/// state exists.
pub trait TickStore: Send + Sync {
    /// Load the stored tick string, or `None` if no state was persisted.
    fn load_ticks(&self) -> BoxFuture<'_, Result<Option<String>, StoreError>>;

    /// Write the tick string, replacing any previous value.
    fn save_ticks<'a>(&'a self, encoded: &'a str) -> BoxFuture<'a, Result<(), StoreError>>;
}
