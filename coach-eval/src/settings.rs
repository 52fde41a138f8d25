//! Evaluation settings read from the environment.

use std::path::PathBuf;

use coach_tracking::EVAL_PREFIX;

use crate::error::{EvalError, Result};

pub const DEFAULT_PROMPT_VERSION: &str = "v1_asistente_entrenamiento";
pub const DEFAULT_CHUNK_SIZE: usize = 512;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;
pub const DEFAULT_DATASET_PATH: &str = "data/eval_dataset.json";

/// What an evaluation run is labelled with and where its dataset lives.
///
/// `chunk_size` and `chunk_overlap` are recorded as run parameters; they
/// describe the index the run is meant to exercise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalSettings {
    pub prompt_version: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub dataset_path: PathBuf,
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self {
            prompt_version: DEFAULT_PROMPT_VERSION.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
        }
    }
}

fn parse_usize(key: &str, raw: Option<String>, default: usize) -> Result<usize> {
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            EvalError::Config(format!("{key} must be a non-negative integer, got '{raw}'"))
        }),
    }
}

impl EvalSettings {
    /// Read `PROMPT_VERSION`, `CHUNK_SIZE`, `CHUNK_OVERLAP` and `DATASET_PATH`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            prompt_version: lookup("PROMPT_VERSION").unwrap_or(defaults.prompt_version),
            chunk_size: parse_usize("CHUNK_SIZE", lookup("CHUNK_SIZE"), defaults.chunk_size)?,
            chunk_overlap: parse_usize(
                "CHUNK_OVERLAP",
                lookup("CHUNK_OVERLAP"),
                defaults.chunk_overlap,
            )?,
            dataset_path: lookup("DATASET_PATH").map(PathBuf::from).unwrap_or(defaults.dataset_path),
        })
    }

    /// Name of the experiment this prompt version's runs are recorded under.
    pub fn experiment_name(&self) -> String {
        format!("{EVAL_PREFIX}{}", self.prompt_version)
    }
}
