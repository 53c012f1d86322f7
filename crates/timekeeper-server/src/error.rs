//! Error types for the authority binary.

use timekeeper_core::config::ConfigError;
use timekeeper_store::StoreError;

/// Errors that can occur wiring up the authority process.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration could not be loaded.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// The durable store could not be reached.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// The NATS transport could not be reached.
    #[error("NATS error: {message}")]
    Nats {
        /// Description of the transport failure.
        message: String,
    },
}
