//! Error types for the `coach-store` crate.

use thiserror::Error;

/// Errors raised by profile and chat stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("Transport error ({backend}): {message}")]
    Transport {
        /// The store backend.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The backend answered with a non-success status.
    #[error("Backend error ({backend}): status {status}: {message}")]
    Backend {
        backend: String,
        status: u16,
        message: String,
    },

    /// The backend answered with a body that could not be decoded.
    #[error("Malformed response ({backend}): {message}")]
    Decode { backend: String, message: String },

    /// Missing or invalid store configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A convenience result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
