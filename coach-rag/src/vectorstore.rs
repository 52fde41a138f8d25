//! Storage seam for embedded chunks.

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;

/// Where embedded chunks live between ingestion and retrieval.
///
/// An index build fills one collection and snapshots it with
/// [`chunks`](Self::chunks); a reopened index answers
/// [`search`](Self::search) from the restored snapshot.
///
/// ```rust,ignore
/// let store = InMemoryVectorStore::new();
/// store.create_collection(DEFAULT_COLLECTION, 384).await?;
/// store.upsert(DEFAULT_COLLECTION, &chunks).await?;
/// let hits = store.search(DEFAULT_COLLECTION, &question_embedding, 4).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Insert or replace chunks by id. Chunks must carry their embeddings.
    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// The `top_k` chunks closest to `embedding`, best first.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Every chunk of a collection, in id order, for persisting the index.
    async fn chunks(&self, collection: &str) -> Result<Vec<Chunk>>;
}
