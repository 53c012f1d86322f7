//! `Dragonfly` (Redis-compatible) backend for the tick store.
//!
//! Holds the single `clock:ticks` key. The authority writes through this
//! store on hour boundaries, on explicit date/time jumps, and at shutdown;
//! everything else lives in memory.

use fred::prelude::*;
use futures::future::BoxFuture;

use crate::error::StoreError;
use crate::{TICKS_KEY, TickStore};

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
///
/// Wraps a [`fred::prelude::Client`] configured from a Redis-scheme URL.
#[derive(Clone)]
pub struct DragonflyStore {
    client: Client,
}

impl DragonflyStore {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL cannot be parsed.
    /// Returns [`StoreError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let config = Config::from_url(url)
            .map_err(|e| StoreError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }
}

impl TickStore for DragonflyStore {
    fn load_ticks(&self) -> BoxFuture<'_, Result<Option<String>, StoreError>> {
        Box::pin(async move {
            let value: Option<String> = self.client.get(TICKS_KEY).await?;
            Ok(value)
        })
    }

    fn save_ticks<'a>(&'a self, encoded: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let _: () = self
                .client
                .set(TICKS_KEY, encoded, None, None, false)
                .await?;
            Ok(())
        })
    }
}
