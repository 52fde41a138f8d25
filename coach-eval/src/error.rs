//! Error types for the `coach-eval` crate.

use std::path::PathBuf;

use coach_core::CoachError;
use coach_rag::RagError;
use coach_tracking::TrackingError;
use thiserror::Error;

/// Errors that stop an evaluation.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Dataset not found: {}", .0.display())]
    DatasetNotFound(PathBuf),

    #[error("Malformed dataset {}: {message}", path.display())]
    MalformedDataset { path: PathBuf, message: String },

    #[error("Dataset {} has no rows", .0.display())]
    EmptyDataset(PathBuf),

    /// An evaluation setting could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The assistant failed to answer a dataset question.
    #[error("Row {row}: answer generation failed: {source}")]
    Answer {
        row: usize,
        #[source]
        source: RagError,
    },

    /// A judge model call failed.
    #[error("Row {row}: {judge} judge failed: {source}")]
    Judge {
        row: usize,
        judge: &'static str,
        #[source]
        source: CoachError,
    },

    /// The tracking store rejected the experiment or a run.
    #[error("Tracking failed: {0}")]
    Tracking(#[from] TrackingError),
}

/// A convenience result type for evaluation operations.
pub type Result<T> = std::result::Result<T, EvalError>;
