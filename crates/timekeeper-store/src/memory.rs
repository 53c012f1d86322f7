//! In-memory backend for the tick store.
//!
//! Used by tests and by deployments that accept losing clock state across
//! restarts. Supports injected write failures so degradation paths can be
//! exercised.

use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;

use crate::TickStore;
use crate::error::StoreError;

/// An in-process tick store holding the value in a mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    value: Mutex<Option<String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store (no prior state).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with an encoded tick string.
    pub fn with_value(encoded: &str) -> Self {
        Self {
            value: Mutex::new(Some(encoded.to_owned())),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail with [`StoreError::Injected`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    /// The currently stored value, for test inspection.
    pub fn stored(&self) -> Option<String> {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TickStore for MemoryStore {
    fn load_ticks(&self) -> BoxFuture<'_, Result<Option<String>, StoreError>> {
        Box::pin(async move { Ok(self.stored()) })
    }

    fn save_ticks<'a>(&'a self, encoded: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            if self.fail_writes.load(Ordering::Acquire) {
                return Err(StoreError::Injected);
            }
            let mut guard = self.value.lock().unwrap_or_else(PoisonError::into_inner);
            *guard = Some(encoded.to_owned());
            Ok(())
        })
    }
}
