//! PDF loading: one [`Document`] per non-empty page.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::{RagError, Result};

fn is_pdf(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Load every PDF directly inside `dir`, in file-name order.
///
/// Files with other extensions are ignored. This does blocking I/O; async
/// callers should run it on `tokio::task::spawn_blocking`.
///
/// # Errors
///
/// Returns [`RagError::LoaderError`] if the directory cannot be read or a PDF
/// cannot be parsed.
pub fn load_documents(dir: &Path) -> Result<Vec<Document>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| RagError::LoaderError { path: dir.to_path_buf(), message: e.to_string() })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_pdf(path))
        .collect();
    paths.sort();

    let mut documents = Vec::new();
    for path in &paths {
        documents.extend(load_pdf(path)?);
    }

    info!(dir = %dir.display(), files = paths.len(), pages = documents.len(), "loaded documents");
    Ok(documents)
}

/// Extract the text of each page of a PDF.
///
/// Pages without extractable text are skipped; a page whose text cannot be
/// decoded is logged and skipped.
pub fn load_pdf(path: &Path) -> Result<Vec<Document>> {
    let pdf = lopdf::Document::load(path).map_err(|e| RagError::LoaderError {
        path: path.to_path_buf(),
        message: format!("invalid PDF: {e}"),
    })?;

    let mut documents = Vec::new();
    for page in pdf.get_pages().keys().copied() {
        match pdf.extract_text(&[page]) {
            Ok(text) if !text.trim().is_empty() => {
                documents.push(Document::from_page(path, page, text));
            }
            Ok(_) => debug!(path = %path.display(), page, "page has no text"),
            Err(e) => {
                warn!(path = %path.display(), page, error = %e, "failed to extract page text")
            }
        }
    }
    Ok(documents)
}
