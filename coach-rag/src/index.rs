//! Building a persisted index from a directory of PDFs, and reopening it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

use crate::chunking::RecursiveChunker;
use crate::config::RagConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::inmemory::InMemoryVectorStore;
use crate::loader::load_documents;
use crate::persist::{IndexManifest, load_index, save_index};
use crate::pipeline::RagPipeline;
use crate::vectorstore::VectorStore;

/// Collection every index is built into.
pub const DEFAULT_COLLECTION: &str = "documents";

/// What a build produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexBuildSummary {
    pub n_docs: usize,
    pub n_chunks: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub index_dir: PathBuf,
}

/// Loads PDFs, chunks and embeds them, and writes the index artifact.
pub struct IndexBuilder {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl IndexBuilder {
    pub fn new(config: RagConfig, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { config, embedder }
    }

    /// Build the index for every PDF in `docs_dir` and save it to `index_dir`.
    ///
    /// `n_docs` counts pages, since each page is loaded as its own document.
    pub async fn build(&self, docs_dir: &Path, index_dir: &Path) -> Result<IndexBuildSummary> {
        let dir = docs_dir.to_path_buf();
        let documents = tokio::task::spawn_blocking(move || load_documents(&dir))
            .await
            .map_err(|e| {
                error!(error = %e, "document loader task failed");
                RagError::PipelineError(format!("document loader task failed: {e}"))
            })??;

        let store = Arc::new(InMemoryVectorStore::new());
        let pipeline = RagPipeline::builder()
            .config(self.config.clone())
            .embedding_provider(self.embedder.clone())
            .vector_store(store.clone())
            .chunker(Arc::new(RecursiveChunker::new(
                self.config.chunk_size,
                self.config.chunk_overlap,
            )))
            .build()?;

        pipeline.create_collection(DEFAULT_COLLECTION).await?;
        pipeline.ingest_batch(DEFAULT_COLLECTION, &documents).await?;
        let chunks = store.chunks(DEFAULT_COLLECTION).await?;
        let dimensions = self.embedder.dimensions();
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dimensions) {
            error!(
                chunk_id = %bad.id,
                got = bad.embedding.len(),
                expected = dimensions,
                "embedding length disagrees with the provider"
            );
            return Err(RagError::IndexError {
                path: index_dir.to_path_buf(),
                message: format!(
                    "embedder '{}' reports {dimensions} dimensions but returned {} for chunk '{}'",
                    self.embedder.model_id(),
                    bad.embedding.len(),
                    bad.id
                ),
            });
        }

        let manifest = IndexManifest {
            collection: DEFAULT_COLLECTION.to_string(),
            embedding_model: self.embedder.model_id().to_string(),
            dimensions,
            chunk_size: self.config.chunk_size,
            chunk_overlap: self.config.chunk_overlap,
            n_docs: documents.len(),
            n_chunks: chunks.len(),
            created_at: Utc::now(),
        };
        save_index(index_dir, &manifest, &chunks).await?;

        let summary = IndexBuildSummary {
            n_docs: manifest.n_docs,
            n_chunks: manifest.n_chunks,
            chunk_size: manifest.chunk_size,
            chunk_overlap: manifest.chunk_overlap,
            index_dir: index_dir.to_path_buf(),
        };
        info!(
            n_docs = summary.n_docs,
            n_chunks = summary.n_chunks,
            index_dir = %index_dir.display(),
            "index built"
        );
        Ok(summary)
    }
}

/// Reopen a persisted index as a query-ready pipeline, without re-embedding.
///
/// Chunking parameters come from the manifest; retrieval parameters (`top_k`,
/// threshold) from `config`.
pub async fn open_index(
    index_dir: &Path,
    embedder: Arc<dyn EmbeddingProvider>,
    config: RagConfig,
) -> Result<(RagPipeline, IndexManifest)> {
    let (manifest, store) = load_index(index_dir, embedder.as_ref()).await?;
    let config = RagConfig {
        chunk_size: manifest.chunk_size,
        chunk_overlap: manifest.chunk_overlap,
        ..config
    };
    let pipeline = RagPipeline::builder()
        .chunker(Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap)))
        .config(config)
        .embedding_provider(embedder)
        .vector_store(Arc::new(store))
        .build()?;
    Ok((pipeline, manifest))
}
