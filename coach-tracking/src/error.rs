//! Error types for the `coach-tracking` crate.

use thiserror::Error;

/// Errors raised by tracking stores.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// The tracking server could not be reached.
    #[error("Transport error ({backend}): {message}")]
    Transport { backend: String, message: String },

    /// The tracking server rejected a request.
    #[error("Backend error ({backend}): status {status}: {message}")]
    Backend { backend: String, status: u16, message: String },

    /// The tracking server answered with a body that could not be decoded.
    #[error("Malformed response ({backend}): {message}")]
    Decode { backend: String, message: String },

    /// An experiment or run id that the store does not know.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// A convenience result type for tracking operations.
pub type Result<T> = std::result::Result<T, TrackingError>;
