//! In-memory vector index with cosine similarity retrieval.

use super::prompts::{CONTEXT_SEPARATOR, question_answer_prompt};
use super::types::{IndexError, QueryEngine, QueryError, QueryResponse, SourceNode};
use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use crate::ingestion::Node;
use crate::llm::CompletionRequest;
use crate::models::Models;
use async_trait::async_trait;
use std::cmp::Ordering;

struct VectorEntry {
    node: Node,
    embedding: Vec<f32>,
}

/// Index over chunk embeddings, used for targeted questions.
pub struct VectorIndex {
    entries: Vec<VectorEntry>,
    dimension: usize,
    top_k: usize,
}

impl VectorIndex {
    /// Embed every node and build the index.
    pub async fn build(
        nodes: Vec<Node>,
        embedder: &dyn EmbeddingClient,
        top_k: usize,
    ) -> Result<Self, IndexError> {
        if nodes.is_empty() {
            return Ok(Self {
                entries: Vec::new(),
                dimension: 0,
                top_k: top_k.max(1),
            });
        }

        let texts = nodes.iter().map(|node| node.text.clone()).collect();
        let embeddings = embedder.generate_embeddings(texts).await?;
        if embeddings.len() != nodes.len() {
            return Err(IndexError::CountMismatch {
                expected: nodes.len(),
                actual: embeddings.len(),
            });
        }

        let dimension = embeddings.first().map(Vec::len).unwrap_or(0);
        if let Some(actual) = embeddings
            .iter()
            .map(Vec::len)
            .find(|len| *len != dimension || *len == 0)
        {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual,
            });
        }

        tracing::debug!(nodes = nodes.len(), dimension, "Vector index built");
        Ok(Self {
            entries: nodes
                .into_iter()
                .zip(embeddings)
                .map(|(node, embedding)| VectorEntry { node, embedding })
                .collect(),
            dimension,
            top_k: top_k.max(1),
        })
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nodes held by the index, in document order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.entries.iter().map(|entry| &entry.node)
    }

    /// Rank entries by similarity to `query`, best first, keeping `top_k`.
    fn retrieve(&self, query: &[f32]) -> Vec<(&Node, f32)> {
        let mut scored: Vec<(&Node, f32)> = self
            .entries
            .iter()
            .map(|entry| (&entry.node, cosine_similarity(query, &entry.embedding)))
            .collect();
        scored.sort_by(|left, right| {
            right
                .1
                .partial_cmp(&left.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| left.0.ordinal.cmp(&right.0.ordinal))
        });
        scored.truncate(self.top_k);
        scored
    }
}

#[async_trait]
impl QueryEngine for VectorIndex {
    async fn query(&self, models: &Models, query: &str) -> Result<QueryResponse, QueryError> {
        if self.entries.is_empty() {
            return Err(QueryError::EmptyIndex);
        }

        let query_embedding = models
            .embedder
            .generate_embeddings(vec![query.to_string()])
            .await?
            .pop()
            .ok_or_else(|| {
                EmbeddingClientError::InvalidResponse("no vector returned for query".into())
            })?;
        if query_embedding.len() != self.dimension {
            return Err(QueryError::DimensionMismatch {
                expected: self.dimension,
                actual: query_embedding.len(),
            });
        }

        let hits = self.retrieve(&query_embedding);
        tracing::debug!(
            retrieved = hits.len(),
            best_score = ?hits.first().map(|(_, score)| *score),
            "Retrieved context"
        );
        let context = hits
            .iter()
            .map(|(node, _)| node.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        let response = models
            .llm
            .complete(CompletionRequest::new(question_answer_prompt(&context, query)))
            .await?;

        Ok(QueryResponse {
            response,
            sources: hits
                .into_iter()
                .map(|(node, score)| SourceNode {
                    ordinal: node.ordinal,
                    page_label: node.page_label.clone(),
                    score: Some(score),
                    text: node.text.clone(),
                })
                .collect(),
        })
    }
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    let left_norm = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_norm = right.iter().map(|value| value * value).sum::<f32>().sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    dot / (left_norm * right_norm)
}
