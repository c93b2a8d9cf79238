//! Document pipeline: load, split, apply the chunk limit, and build both indexes.

use crate::config::Config;
use crate::index::{IndexError, SummaryIndex, VectorIndex};
use crate::ingestion::{ChunkingError, DocumentLoader, LoadError, Node, StoredUpload, TextSplitter};
use crate::models::Models;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while turning a stored upload into indexes.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Loading the document failed.
    #[error("Failed to load document: {0}")]
    Load(#[from] LoadError),
    /// Splitting produced nothing to index.
    #[error("Document produced no indexable chunks")]
    NoChunks,
    /// Building an index failed.
    #[error("Failed to build index: {0}")]
    Index(#[from] IndexError),
}

impl PipelineError {
    /// Whether the failure came from the remote model service.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Index(IndexError::Embedding(_)))
    }
}

/// Tunables for splitting and indexing.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Token budget per chunk.
    pub chunk_size: usize,
    /// Token overlap between adjacent chunks.
    pub chunk_overlap: usize,
    /// Model whose tokenizer counts tokens.
    pub tokenizer_model: String,
    /// Maximum chunks indexed per upload; `None` indexes all of them.
    pub max_indexed_chunks: Option<usize>,
    /// Chunks retrieved per vector query.
    pub similarity_top_k: usize,
    /// Token budget for each tree-summarize prompt.
    pub summary_context_tokens: usize,
}

impl PipelineSettings {
    /// Derive pipeline settings from the runtime configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            tokenizer_model: config.embedding_model.clone(),
            max_indexed_chunks: config.max_indexed_chunks,
            similarity_top_k: config.similarity_top_k,
            summary_context_tokens: config.summary_context_tokens,
        }
    }
}

/// Serializable description of an indexed upload.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    /// Hex SHA-256 of the upload bytes.
    pub content_hash: String,
    /// File name supplied with the upload.
    pub file_name: String,
    /// Number of document records (pages) loaded.
    pub documents: usize,
    /// Chunks produced by the splitter.
    pub total_chunks: usize,
    /// Chunks placed into the indexes.
    pub indexed_chunks: usize,
    /// Chunks left out by the chunk limit.
    pub dropped_chunks: usize,
}

/// Both indexes built from one upload.
pub struct IndexedDocument {
    /// Hex SHA-256 of the upload bytes.
    pub content_hash: String,
    /// File name of the upload the indexes were built from; sessions reusing them from the
    /// cache report their own name.
    pub file_name: String,
    /// Number of document records (pages) loaded.
    pub document_count: usize,
    /// Chunks produced by the splitter before the limit applied.
    pub total_chunks: usize,
    /// Index answering whole-document questions.
    pub summary: SummaryIndex,
    /// Index answering targeted questions.
    pub vector: VectorIndex,
}

impl IndexedDocument {
    /// Number of chunks held by the indexes.
    pub fn indexed_chunks(&self) -> usize {
        self.summary.nodes().len()
    }

    /// Number of chunks left out by the chunk limit.
    pub fn dropped_chunks(&self) -> usize {
        self.total_chunks - self.indexed_chunks()
    }

    /// Serializable description of this document.
    pub fn describe(&self) -> DocumentSummary {
        DocumentSummary {
            content_hash: self.content_hash.clone(),
            file_name: self.file_name.clone(),
            documents: self.document_count,
            total_chunks: self.total_chunks,
            indexed_chunks: self.indexed_chunks(),
            dropped_chunks: self.dropped_chunks(),
        }
    }
}

/// Turns stored uploads into [`IndexedDocument`]s.
pub struct DocumentPipeline {
    loader: Arc<dyn DocumentLoader>,
    splitter: TextSplitter,
    settings: PipelineSettings,
}

impl DocumentPipeline {
    /// Build a pipeline around a document loader.
    pub fn new(
        loader: Arc<dyn DocumentLoader>,
        settings: PipelineSettings,
    ) -> Result<Self, ChunkingError> {
        let splitter = TextSplitter::new(
            settings.chunk_size,
            settings.chunk_overlap,
            &settings.tokenizer_model,
        )?;
        Ok(Self::with_splitter(loader, splitter, settings))
    }

    /// Build a pipeline with an explicit splitter.
    pub fn with_splitter(
        loader: Arc<dyn DocumentLoader>,
        splitter: TextSplitter,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            loader,
            splitter,
            settings,
        }
    }

    /// Token budget per chunk.
    pub fn chunk_size(&self) -> usize {
        self.splitter.chunk_size()
    }

    /// Load, split, limit, and index a stored upload.
    pub async fn build(
        &self,
        upload: &StoredUpload,
        models: &Models,
    ) -> Result<IndexedDocument, PipelineError> {
        let loader = self.loader.clone();
        let splitter = self.splitter.clone();
        let path = upload.path.clone();
        let file_name = upload.file_name.clone();
        // PDF parsing and token counting are CPU bound; keep both off the async workers.
        let (document_count, nodes) = tokio::task::spawn_blocking(move || {
            let documents = loader.load(&path, &file_name)?;
            let nodes = splitter.split_documents(&documents);
            Ok::<_, LoadError>((documents.len(), nodes))
        })
        .await
        .map_err(|error| LoadError::Interrupted(error.to_string()))??;

        let total_chunks = nodes.len();
        if nodes.is_empty() {
            return Err(PipelineError::NoChunks);
        }

        let (nodes, dropped) = apply_chunk_limit(nodes, self.settings.max_indexed_chunks);
        if dropped > 0 {
            tracing::warn!(
                file_name = %upload.file_name,
                total_chunks,
                indexed = nodes.len(),
                dropped,
                "Chunk limit reached; trailing chunks are not indexed"
            );
        }
        tracing::debug!(
            file_name = %upload.file_name,
            documents = document_count,
            chunks = nodes.len(),
            chunk_size = self.splitter.chunk_size(),
            "Document split"
        );

        let vector = VectorIndex::build(
            nodes.clone(),
            models.embedder.as_ref(),
            self.settings.similarity_top_k,
        )
        .await?;
        let summary = SummaryIndex::new(
            nodes,
            self.settings.summary_context_tokens,
            self.splitter.token_counter(),
        );

        Ok(IndexedDocument {
            content_hash: upload.content_hash.clone(),
            file_name: upload.file_name.clone(),
            document_count,
            total_chunks,
            summary,
            vector,
        })
    }
}

/// Keep the first `limit` nodes in document order, returning how many were dropped.
pub fn apply_chunk_limit(mut nodes: Vec<Node>, limit: Option<usize>) -> (Vec<Node>, usize) {
    match limit {
        Some(limit) if nodes.len() > limit => {
            let dropped = nodes.len() - limit;
            nodes.truncate(limit);
            (nodes, dropped)
        }
        _ => (nodes, 0),
    }
}
