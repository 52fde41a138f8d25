//! On-disk index artifact.
//!
//! An index directory holds two JSON files:
//!
//! - `manifest.json`: the [`IndexManifest`] with embedding model, dimensionality and
//!   build parameters
//! - `chunks.json`: every chunk with its text, metadata and embedding
//!
//! Loading rebuilds an [`InMemoryVectorStore`] without calling the embedding
//! provider.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::document::Chunk;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::inmemory::InMemoryVectorStore;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const CHUNKS_FILE: &str = "chunks.json";

/// Build-time facts about a persisted index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub collection: String,
    pub embedding_model: String,
    pub dimensions: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub n_docs: usize,
    pub n_chunks: usize,
    pub created_at: DateTime<Utc>,
}

fn index_err(path: &Path, message: impl Into<String>) -> RagError {
    RagError::IndexError { path: path.to_path_buf(), message: message.into() }
}

/// Write `manifest` and `chunks` into `dir`, creating it if needed.
///
/// Existing files are overwritten.
pub async fn save_index(dir: &Path, manifest: &IndexManifest, chunks: &[Chunk]) -> Result<()> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| index_err(dir, e.to_string()))?;

    let manifest_json = serde_json::to_vec_pretty(manifest)
        .map_err(|e| index_err(dir, format!("failed to serialize manifest: {e}")))?;
    let chunks_json = serde_json::to_vec(chunks)
        .map_err(|e| index_err(dir, format!("failed to serialize chunks: {e}")))?;

    tokio::fs::write(dir.join(CHUNKS_FILE), chunks_json)
        .await
        .map_err(|e| index_err(dir, format!("failed to write {CHUNKS_FILE}: {e}")))?;
    // Manifest last: a directory with a manifest always has its chunk table.
    tokio::fs::write(dir.join(MANIFEST_FILE), manifest_json)
        .await
        .map_err(|e| index_err(dir, format!("failed to write {MANIFEST_FILE}: {e}")))?;

    info!(dir = %dir.display(), n_chunks = chunks.len(), "saved index");
    Ok(())
}

/// Read the manifest of the index in `dir`.
pub async fn read_manifest(dir: &Path) -> Result<IndexManifest> {
    let bytes = tokio::fs::read(dir.join(MANIFEST_FILE))
        .await
        .map_err(|e| index_err(dir, format!("failed to read {MANIFEST_FILE}: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| index_err(dir, format!("malformed {MANIFEST_FILE}: {e}")))
}

/// Load the index in `dir` into a vector store.
///
/// `embedder` must be the provider queries will be embedded with. A
/// dimensionality mismatch makes every similarity meaningless, so it fails;
/// a different model id with the same dimensionality is only logged.
///
/// # Errors
///
/// Returns [`RagError::IndexError`] when files are missing or malformed, the
/// dimensionality differs from `embedder`, or a stored vector has the wrong length.
pub async fn load_index(
    dir: &Path,
    embedder: &dyn EmbeddingProvider,
) -> Result<(IndexManifest, InMemoryVectorStore)> {
    let manifest = read_manifest(dir).await?;

    if manifest.dimensions != embedder.dimensions() {
        return Err(index_err(
            dir,
            format!(
                "index was built with {}-dimensional embeddings ({}), query embedder '{}' produces {}",
                manifest.dimensions,
                manifest.embedding_model,
                embedder.model_id(),
                embedder.dimensions()
            ),
        ));
    }
    if manifest.embedding_model != embedder.model_id() {
        warn!(
            index_model = %manifest.embedding_model,
            query_model = %embedder.model_id(),
            "index was built with a different embedding model"
        );
    }

    let bytes = tokio::fs::read(dir.join(CHUNKS_FILE))
        .await
        .map_err(|e| index_err(dir, format!("failed to read {CHUNKS_FILE}: {e}")))?;
    let chunks: Vec<Chunk> = serde_json::from_slice(&bytes)
        .map_err(|e| index_err(dir, format!("malformed {CHUNKS_FILE}: {e}")))?;

    if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != manifest.dimensions) {
        return Err(index_err(
            dir,
            format!(
                "chunk '{}' has {} dimensions, manifest says {}",
                bad.id,
                bad.embedding.len(),
                manifest.dimensions
            ),
        ));
    }

    info!(dir = %dir.display(), n_chunks = chunks.len(), "loaded index");
    let store = InMemoryVectorStore::with_collection(&manifest.collection, chunks);
    Ok((manifest, store))
}
