//! Error types for the `coach-rag` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in ingestion, indexing and retrieval.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A source document could not be read or parsed.
    #[error("Failed to load {}: {message}", path.display())]
    LoaderError {
        /// The file or directory being read.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// The persisted index artifact is missing, unreadable or incompatible.
    #[error("Index error ({}): {message}", path.display())]
    IndexError {
        /// The index directory.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// No prompt template exists for the requested version.
    #[error("Prompt not found: {}", .0.display())]
    PromptNotFound(PathBuf),

    /// A prompt template failed to parse or render.
    #[error("Template error: {0}")]
    TemplateError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the pipeline or chain orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// An error propagated from `coach-core` (model calls).
    #[error(transparent)]
    Core(#[from] coach_core::CoachError),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
