//! Data types for documents, chunks, and search results.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Metadata key holding the source file path.
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the 1-based page number.
pub const PAGE_KEY: &str = "page";

/// A source document: one page of an ingested file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, String>,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Build the document for page `page` (1-based) of the file at `source`.
    ///
    /// The id is `{file_stem}_p{page}`; metadata records the source path and page.
    pub fn from_page(source: &Path, page: u32, text: impl Into<String>) -> Self {
        let stem = source.file_stem().and_then(|s| s.to_str()).unwrap_or("document");
        let source_str = source.to_string_lossy().into_owned();
        Self {
            id: format!("{stem}_p{page}"),
            text: text.into(),
            metadata: HashMap::from([
                (SOURCE_KEY.to_string(), source_str.clone()),
                (PAGE_KEY.to_string(), page.to_string()),
            ]),
            source_uri: Some(source_str),
        }
    }
}

/// A segment of a [`Document`] with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
    /// Metadata inherited from the parent document plus `chunk_index`.
    pub metadata: HashMap<String, String>,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}
