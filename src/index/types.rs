//! Shared query-engine types and errors.

use crate::embedding::EmbeddingClientError;
use crate::llm::LlmClientError;
use crate::models::Models;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while building an index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Embedding provider failed while embedding chunks.
    #[error("Failed to embed chunks: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Provider returned a different number of vectors than chunks.
    #[error("Expected {expected} embeddings, received {actual}")]
    CountMismatch {
        /// Number of chunks submitted.
        expected: usize,
        /// Number of vectors returned.
        actual: usize,
    },
    /// Vectors of different lengths were returned.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the first vector.
        expected: usize,
        /// Offending dimension.
        actual: usize,
    },
}

/// Errors raised while answering a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Embedding the query text failed.
    #[error("Failed to embed query: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Generating the answer failed.
    #[error("Failed to generate answer: {0}")]
    Llm(#[from] LlmClientError),
    /// The query embedding could not be compared with the index.
    #[error("Query embedding has dimension {actual}, index expects {expected}")]
    DimensionMismatch {
        /// Dimension stored in the index.
        expected: usize,
        /// Dimension of the query embedding.
        actual: usize,
    },
    /// The index holds no chunks to answer from.
    #[error("The document has no indexed content")]
    EmptyIndex,
}

impl QueryError {
    /// Whether the failure came from the remote model service.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Embedding(_) | Self::Llm(_))
    }
}

/// Chunk that contributed to an answer.
#[derive(Debug, Clone, Serialize)]
pub struct SourceNode {
    /// Position of the chunk in document order.
    pub ordinal: usize,
    /// Page the chunk came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_label: Option<String>,
    /// Similarity score, when the engine ranks chunks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    /// Chunk text.
    pub text: String,
}

/// Answer produced by a query engine.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    /// Generated answer text.
    pub response: String,
    /// Chunks the answer was generated from.
    pub sources: Vec<SourceNode>,
}

/// Engine answering free-text questions over an index.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Answer `query` using the supplied model clients.
    async fn query(&self, models: &Models, query: &str) -> Result<QueryResponse, QueryError>;
}
