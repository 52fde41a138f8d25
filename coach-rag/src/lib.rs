//! # coach-rag
//!
//! Retrieval side of the training assistant.
//!
//! - [`loader`] reads PDFs page by page into [`Document`]s
//! - [`chunking`] splits them into overlapping windows
//! - [`EmbeddingProvider`] turns text into vectors ([`OpenAIEmbeddingProvider`],
//!   [`HashEmbeddingProvider`])
//! - [`InMemoryVectorStore`] answers similarity queries; [`persist`] saves and
//!   reloads it as an index directory
//! - [`IndexBuilder`] / [`open_index`] wrap the above into build-once,
//!   load-many
//! - [`RetrievalChain`] answers a question from the index with an LLM
//!
//! ```rust,ignore
//! let (pipeline, _manifest) = open_index(Path::new("vectorstore"), embedder, RagConfig::default()).await?;
//! let prompt = PromptTemplate::load(Path::new("prompts"), "v1_asistente_entrenamiento")?;
//! let chain = RetrievalChain::new(Arc::new(pipeline), DEFAULT_COLLECTION, llm, prompt);
//! let answer = chain.invoke("What is a deload week?", &[], &profile).await?;
//! ```

pub mod chain;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod hashing;
pub mod index;
pub mod inmemory;
pub mod loader;
#[cfg(feature = "openai")]
pub mod openai;
pub mod persist;
pub mod pipeline;
pub mod prompt;
pub mod vectorstore;

pub use chain::RetrievalChain;
pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use hashing::HashEmbeddingProvider;
pub use index::{DEFAULT_COLLECTION, IndexBuildSummary, IndexBuilder, open_index};
pub use inmemory::InMemoryVectorStore;
pub use loader::{load_documents, load_pdf};
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
pub use persist::{IndexManifest, load_index, save_index};
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use prompt::PromptTemplate;
pub use vectorstore::VectorStore;
