//! Runtime configuration.
//!
//! Every setting has a flag and an environment variable; the flag wins. A
//! `.env` file in the working directory is loaded before parsing.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, ValueEnum};
use coach_core::Llm;
use coach_eval::EvalSettings;
use coach_model::{OpenAIClient, OpenAIConfig};
use coach_rag::{
    DEFAULT_COLLECTION, EmbeddingProvider, HashEmbeddingProvider, OpenAIEmbeddingProvider,
    PromptTemplate, RagConfig, RetrievalChain, open_index,
};
use coach_store::{InMemoryStore, SupabaseStore};
use coach_tracking::{MlflowTracking, TrackingStore};
use tracing::{info, warn};

use crate::session::CoachStore;

/// Dimensions of the offline hashing embedder.
pub const HASH_DIMENSIONS: usize = 384;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbeddingBackend {
    /// OpenAI embeddings API.
    Openai,
    /// Local feature hashing; needs no API key.
    Hash,
}

#[derive(Debug, Clone, Args)]
pub struct AppConfig {
    /// Directory with the source PDFs
    #[arg(long, env = "DATA_DIR", default_value = "data/pdfs", global = true)]
    pub data_dir: PathBuf,

    /// Directory with the prompt templates
    #[arg(long, env = "PROMPT_DIR", default_value = "prompts", global = true)]
    pub prompt_dir: PathBuf,

    /// Index directory
    #[arg(long, env = "VECTOR_DIR", default_value = "vectorstore", global = true)]
    pub vector_dir: PathBuf,

    /// Evaluation dataset (JSON array of {question, answer})
    #[arg(long, env = "DATASET_PATH", default_value = "data/eval_dataset.json", global = true)]
    pub dataset_path: PathBuf,

    /// Prompt template version
    #[arg(long, env = "PROMPT_VERSION", default_value = "v1_asistente_entrenamiento", global = true)]
    pub prompt_version: String,

    #[arg(long, env = "CHUNK_SIZE", default_value_t = 512, global = true)]
    pub chunk_size: usize,

    #[arg(long, env = "CHUNK_OVERLAP", default_value_t = 50, global = true)]
    pub chunk_overlap: usize,

    /// Chunks handed to the model per question
    #[arg(long, env = "TOP_K", default_value_t = 4, global = true)]
    pub top_k: usize,

    #[arg(long, env = "EMBEDDING_BACKEND", value_enum, default_value = "openai", global = true)]
    pub embedding_backend: EmbeddingBackend,

    #[arg(long, env = "OPENAI_EMBEDDING_MODEL", default_value = "text-embedding-3-small", global = true)]
    pub embedding_model: String,

    /// Model answering questions
    #[arg(long, env = "OPENAI_CHAT_MODEL", default_value = "gpt-4o", global = true)]
    pub chat_model: String,

    /// Model grading answers during evaluation
    #[arg(long, env = "OPENAI_JUDGE_MODEL", default_value = "gpt-3.5-turbo", global = true)]
    pub judge_model: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL", global = true)]
    pub openai_base_url: Option<String>,

    /// Supabase project URL; without it chats are kept in memory
    #[arg(long, env = "SUPABASE_URL", global = true)]
    pub supabase_url: Option<String>,

    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true, global = true)]
    pub supabase_key: Option<String>,

    #[arg(long, env = "MLFLOW_TRACKING_URI", default_value = "http://127.0.0.1:5000", global = true)]
    pub mlflow_tracking_uri: String,
}

impl AppConfig {
    /// Labels and dataset location for an evaluation run.
    pub fn eval_settings(&self) -> EvalSettings {
        EvalSettings {
            prompt_version: self.prompt_version.clone(),
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            dataset_path: self.dataset_path.clone(),
        }
    }

    pub fn rag_config(&self) -> anyhow::Result<RagConfig> {
        RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k)
            .build()
            .context("invalid chunking or retrieval settings")
    }

    fn api_key(&self) -> anyhow::Result<&str> {
        self.openai_api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .context("OPENAI_API_KEY is not set")
    }

    pub fn embedder(&self) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
        match self.embedding_backend {
            EmbeddingBackend::Hash => Ok(Arc::new(HashEmbeddingProvider::new(HASH_DIMENSIONS))),
            EmbeddingBackend::Openai => {
                let mut provider = OpenAIEmbeddingProvider::new(self.api_key()?)?
                    .with_model(&self.embedding_model);
                if let Some(base_url) = &self.openai_base_url {
                    provider = provider.with_base_url(base_url);
                }
                Ok(Arc::new(provider))
            }
        }
    }

    fn openai_model(&self, model: &str) -> anyhow::Result<OpenAIConfig> {
        let mut config = OpenAIConfig::new(self.api_key()?, model);
        if let Some(base_url) = &self.openai_base_url {
            config = config.with_base_url(base_url);
        }
        Ok(config)
    }

    pub fn chat_llm(&self) -> anyhow::Result<Arc<dyn Llm>> {
        Ok(Arc::new(OpenAIClient::new(self.openai_model(&self.chat_model)?)?))
    }

    /// The grading model always runs at temperature 0.
    pub fn judge_llm(&self) -> anyhow::Result<Arc<dyn Llm>> {
        let config = self.openai_model(&self.judge_model)?.with_temperature(0.0);
        Ok(Arc::new(OpenAIClient::new(config)?))
    }

    /// Supabase when both URL and key are set, otherwise an in-memory store.
    pub fn store(&self) -> anyhow::Result<Arc<dyn CoachStore>> {
        match (&self.supabase_url, &self.supabase_key) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => {
                info!(%url, "using Supabase store");
                Ok(Arc::new(SupabaseStore::new(url.as_str(), key)?))
            }
            _ => {
                warn!("SUPABASE_URL/SUPABASE_KEY not set, chats are kept in memory");
                Ok(Arc::new(InMemoryStore::new()))
            }
        }
    }

    pub fn tracking(&self) -> Arc<dyn TrackingStore> {
        Arc::new(MlflowTracking::new(self.mlflow_tracking_uri.as_str()))
    }

    /// Open the persisted index and wire it to `llm` with the configured prompt.
    ///
    /// A missing prompt file or index is fatal.
    pub async fn retrieval_chain(&self, llm: Arc<dyn Llm>) -> anyhow::Result<RetrievalChain> {
        let prompt = PromptTemplate::load(&self.prompt_dir, &self.prompt_version)?;
        let (pipeline, manifest) =
            open_index(&self.vector_dir, self.embedder()?, self.rag_config()?).await?;
        info!(
            index_dir = %self.vector_dir.display(),
            n_chunks = manifest.n_chunks,
            prompt_version = %self.prompt_version,
            "retrieval chain ready"
        );
        Ok(RetrievalChain::new(Arc::new(pipeline), DEFAULT_COLLECTION, llm, prompt))
    }
}
