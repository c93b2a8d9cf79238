//! Core data types and error definitions for the ingestion pipeline.

use anyhow::Error as TokenizerError;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while accepting an uploaded file.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The upload carried no bytes.
    #[error("uploaded file is empty")]
    Empty,
    /// The declared type or file name is not a PDF.
    #[error("unsupported file type '{0}'; only PDF uploads are accepted")]
    UnsupportedType(String),
    /// The bytes do not start with a PDF signature.
    #[error("uploaded file is not a PDF document")]
    NotPdf,
    /// Writing the upload to disk failed.
    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced while turning a stored upload into document records.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The stored file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The PDF structure could not be parsed.
    #[error("failed to parse PDF: {0}")]
    Pdf(#[from] lopdf::Error),
    /// The PDF parsed but contained no extractable text.
    #[error("PDF contains no extractable text")]
    NoText,
    /// The loading task was cancelled or panicked.
    #[error("document loading was interrupted: {0}")]
    Interrupted(String),
}

/// Errors produced while turning raw text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible token budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Tokenizer resources were unavailable for the configured model.
    #[error("failed to initialize tokenizer for model '{model}': {source}")]
    Tokenizer {
        /// Model whose tokenizer we attempted to load.
        model: String,
        /// Underlying error raised by the tokenizer library.
        #[source]
        source: TokenizerError,
    },
}

/// Upload persisted under its content hash.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    /// Location of the stored bytes.
    pub path: PathBuf,
    /// Hex-encoded SHA-256 of the bytes.
    pub content_hash: String,
    /// File name supplied by the client.
    pub file_name: String,
    /// Size of the upload in bytes.
    pub size: usize,
}

/// Page-level document record derived from an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Extracted page text.
    pub text: String,
    /// File name of the originating upload.
    pub file_name: String,
    /// 1-based page label within the file.
    pub page_label: Option<String>,
}

/// Bounded slice of a document used as the unit of indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    /// Position of the chunk in document order, starting at zero.
    pub ordinal: usize,
    /// Chunk text.
    pub text: String,
    /// Page the chunk was taken from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_label: Option<String>,
}
