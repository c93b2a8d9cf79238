//! PDF loading into page-level document records.

use super::types::{Document, LoadError};
use std::path::Path;

/// Turns a stored file into document records.
pub trait DocumentLoader: Send + Sync {
    /// Load `path`, tagging each record with `file_name`.
    fn load(&self, path: &Path, file_name: &str) -> Result<Vec<Document>, LoadError>;
}

/// Loads one document record per PDF page using `lopdf` text extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfLoader;

impl PdfLoader {
    /// Build a PDF loader.
    pub const fn new() -> Self {
        Self
    }

    /// Extract page records from in-memory PDF bytes.
    pub fn load_bytes(&self, bytes: &[u8], file_name: &str) -> Result<Vec<Document>, LoadError> {
        let pdf = lopdf::Document::load_mem(bytes)?;
        let pages = pdf.get_pages();
        let mut documents = Vec::with_capacity(pages.len());

        for page_number in pages.keys().copied() {
            let text = match pdf.extract_text(&[page_number]) {
                Ok(text) => normalize_page_text(&text),
                Err(error) => {
                    tracing::warn!(
                        file_name,
                        page = page_number,
                        error = %error,
                        "Skipping page with unreadable text"
                    );
                    String::new()
                }
            };
            documents.push(Document {
                text,
                file_name: file_name.to_string(),
                page_label: Some(page_number.to_string()),
            });
        }

        if documents.iter().all(|document| document.text.is_empty()) {
            return Err(LoadError::NoText);
        }

        tracing::debug!(file_name, pages = documents.len(), "PDF loaded");
        Ok(documents)
    }
}

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path, file_name: &str) -> Result<Vec<Document>, LoadError> {
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_bytes(&bytes, file_name)
    }
}

/// Collapse the per-fragment line breaks `lopdf` emits while keeping paragraph breaks.
fn normalize_page_text(raw: &str) -> String {
    let mut paragraphs = Vec::new();
    let mut current = Vec::new();

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
            continue;
        }
        current.push(trimmed);
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs.join("\n\n")
}
