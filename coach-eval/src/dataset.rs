//! The labeled evaluation dataset.

use std::path::Path;

use coach_core::{Gender, UserProfile};
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

/// A question and its reference answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub question: String,
    pub answer: String,
}

/// Read a JSON array of `{"question", "answer"}` objects.
///
/// # Errors
///
/// Fails if the file is missing, is not such an array, or is empty.
pub fn load_dataset(path: &Path) -> Result<Vec<DatasetRow>> {
    let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => EvalError::DatasetNotFound(path.to_path_buf()),
        _ => EvalError::MalformedDataset { path: path.to_path_buf(), message: e.to_string() },
    })?;
    let rows: Vec<DatasetRow> = serde_json::from_str(&raw).map_err(|e| {
        EvalError::MalformedDataset { path: path.to_path_buf(), message: e.to_string() }
    })?;
    if rows.is_empty() {
        return Err(EvalError::EmptyDataset(path.to_path_buf()));
    }
    Ok(rows)
}

/// Profile every evaluation question is asked with.
pub fn default_profile() -> UserProfile {
    UserProfile {
        gender: Some(Gender::Male),
        age: Some(25),
        height: Some(180),
        weight: Some(80),
        injury: false,
        injury_description: String::new(),
    }
}
