//! Best-effort replication bus fanning field changes out to observers.
//!
//! The bus is a broadcast channel plus a latest-value map. Delivery is
//! fire-and-forget and at-least-once: there is no acknowledgement, a
//! subscriber that falls behind skips to the newest messages, and a late
//! joiner seeds from [`ReplicationBus::snapshot`] instead of replaying
//! history. Delivery order to a single subscriber matches publish order.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use timekeeper_types::{ClockField, ClockSnapshot, FieldUpdate, FieldValue};
use tokio::sync::broadcast;
use tracing::warn;

/// Capacity of the broadcast channel for field updates.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const REPLICATION_CAPACITY: usize = 256;

/// The replication channel between the authority and its observers.
#[derive(Debug)]
pub struct ReplicationBus {
    /// Latest published value per field, also used to derive `previous`.
    latest: RwLock<BTreeMap<ClockField, FieldValue>>,

    /// Broadcast sender for field updates.
    tx: broadcast::Sender<FieldUpdate>,
}

impl ReplicationBus {
    /// Create a bus with no published state.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(REPLICATION_CAPACITY);
        Self {
            latest: RwLock::new(BTreeMap::new()),
            tx,
        }
    }

    /// Publish a field value to all current subscribers.
    ///
    /// Fire-and-forget: returns the number of subscribers that received
    /// the update; zero subscribers is not an error.
    pub fn publish(&self, field: ClockField, value: FieldValue) -> usize {
        let previous = self
            .latest
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(field, value.clone());
        let update = FieldUpdate {
            field,
            previous,
            current: value,
        };
        // send returns Err only when there are zero receivers, which is
        // normal when no observer is connected.
        self.tx.send(update).unwrap_or(0)
    }

    /// Subscribe to every field update.
    pub fn subscribe(&self) -> broadcast::Receiver<FieldUpdate> {
        self.tx.subscribe()
    }

    /// Subscribe to updates of a single field.
    ///
    /// Multiple subscriptions per field are allowed; each receives every
    /// publish of that field.
    pub fn subscribe_field(&self, field: ClockField) -> FieldSubscription {
        FieldSubscription {
            field,
            rx: self.tx.subscribe(),
        }
    }

    /// The latest published value of a field, if any.
    pub fn latest(&self, field: ClockField) -> Option<FieldValue> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&field)
            .cloned()
    }

    /// The latest published value of every field, for late joiners.
    pub fn snapshot(&self) -> ClockSnapshot {
        let fields = self
            .latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        ClockSnapshot { fields }
    }
}

impl Default for ReplicationBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscription filtered to a single replicated field.
#[derive(Debug)]
pub struct FieldSubscription {
    /// The field this subscription delivers.
    field: ClockField,

    /// The underlying broadcast receiver.
    rx: broadcast::Receiver<FieldUpdate>,
}

impl FieldSubscription {
    /// The field this subscription delivers.
    pub const fn field(&self) -> ClockField {
        self.field
    }

    /// Receive the next update of the subscribed field.
    ///
    /// Returns `None` once the bus is dropped. A lagged subscription skips
    /// to the newest messages with a warning.
    pub async fn recv(&mut self) -> Option<FieldUpdate> {
        loop {
            match self.rx.recv().await {
                Ok(update) if update.field == self.field => return Some(update),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(field = %self.field, skipped, "field subscription lagged, skipping to newest");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
