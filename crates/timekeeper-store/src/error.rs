//! Error types for the durable tick store.

/// Errors that can occur in the durable store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A store configuration error.
    #[error("store configuration error: {0}")]
    Config(String),

    /// Injected failure used by tests to exercise degradation paths.
    #[error("injected store failure")]
    Injected,
}
