//! Error types shared across the coach crates.

use thiserror::Error;

/// Errors raised by the core abstractions (LLM calls, configuration).
#[derive(Debug, Error)]
pub enum CoachError {
    /// The language model call failed or returned nothing usable.
    #[error("Model error ({model}): {message}")]
    Model {
        /// Name of the model that failed.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration value was missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CoachError {
    /// Shorthand for a [`CoachError::Model`].
    pub fn model(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Model { model: model.into(), message: message.into() }
    }
}

/// A convenience result type for core operations.
pub type Result<T> = std::result::Result<T, CoachError>;
