//! Token-bounded semantic splitting of documents into nodes.
//!
//! Highlights:
//!
//! - Splitting runs per document so every node keeps the page label of its source page.
//! - Overlap: a sliding token overlap (`TEXT_SPLITTER_CHUNK_OVERLAP`) carries the tail of the
//!   previous chunk into the next one, trimmed so the budget still holds.
//! - Token counting uses `tiktoken-rs`. Models unknown to tiktoken (the Mistral family among
//!   them) fall back to `cl100k_base`.

use super::types::{ChunkingError, Document, Node};
use anyhow::Error as TokenizerError;
use semchunk_rs::Chunker;
use std::sync::Arc;
use tiktoken_rs::{
    CoreBPE, cl100k_base, get_bpe_from_model, o200k_base, p50k_base, p50k_edit, r50k_base,
};

/// Shared token counting function.
pub type TokenCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Splits documents into token-bounded nodes.
#[derive(Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
    token_counter: TokenCounter,
}

impl TextSplitter {
    /// Build a splitter counting tokens with the encoding for `tokenizer_model`.
    pub fn new(
        chunk_size: usize,
        overlap: usize,
        tokenizer_model: &str,
    ) -> Result<Self, ChunkingError> {
        let token_counter = build_token_counter(tokenizer_model)?;
        Self::with_counter(chunk_size, overlap, token_counter)
    }

    /// Build a splitter with an explicit token counter.
    pub fn with_counter(
        chunk_size: usize,
        overlap: usize,
        token_counter: TokenCounter,
    ) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        Ok(Self {
            chunk_size,
            overlap,
            token_counter,
        })
    }

    /// Token budget per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Token counter shared with the query engines.
    pub fn token_counter(&self) -> TokenCounter {
        self.token_counter.clone()
    }

    /// Split documents into nodes numbered in document order.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Node> {
        let mut nodes = Vec::new();
        for document in documents {
            for text in self.split_text(&document.text) {
                nodes.push(Node {
                    ordinal: nodes.len(),
                    text,
                    page_label: document.page_label.clone(),
                });
            }
        }
        nodes
    }

    /// Split a single text. Returns an empty vector for whitespace-only input.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        chunk_text_with_counter(text, self.chunk_size, self.overlap, &self.token_counter)
            .into_iter()
            .filter(|chunk| !chunk.trim().is_empty())
            .collect()
    }
}

/// Build a tiktoken-backed token counter for `model`.
pub fn build_token_counter(model: &str) -> Result<TokenCounter, ChunkingError> {
    let normalized = model.trim();
    let target = if normalized.is_empty() {
        "cl100k_base"
    } else {
        normalized
    };
    let encoding = resolve_encoding(target).map_err(|source| ChunkingError::Tokenizer {
        model: target.to_string(),
        source,
    })?;
    let encoding = Arc::new(encoding);

    Ok(Arc::new(move |segment: &str| {
        encoding.encode_ordinary(segment).len()
    }))
}

fn resolve_encoding(model: &str) -> Result<CoreBPE, TokenizerError> {
    match get_bpe_from_model(model) {
        Ok(encoding) => Ok(encoding),
        Err(model_err) => {
            tracing::debug!(
                model,
                error = %model_err,
                "Tokenizer model lookup failed; trying encoding name"
            );
            if let Some(candidate) = encoding_from_name(model) {
                candidate
            } else {
                tracing::info!(
                    model,
                    "Using 'cl100k_base' encoding for token counting"
                );
                cl100k_base()
            }
        }
    }
}

fn encoding_from_name(name: &str) -> Option<Result<CoreBPE, TokenizerError>> {
    match name {
        "cl100k_base" => Some(cl100k_base()),
        "o200k_base" => Some(o200k_base()),
        "p50k_base" => Some(p50k_base()),
        "p50k_edit" => Some(p50k_edit()),
        "r50k_base" | "gpt2" => Some(r50k_base()),
        _ => None,
    }
}

fn chunk_text_with_counter(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    token_counter: &TokenCounter,
) -> Vec<String> {
    let counter_for_chunker = token_counter.clone();
    let chunker = Chunker::new(
        chunk_size,
        Box::new(move |segment: &str| counter_for_chunker.as_ref()(segment)),
    );
    let base_chunks = chunker.chunk(text);
    apply_overlap(base_chunks, chunk_size, overlap, token_counter)
}

/// Prefix each chunk with a token-limited tail of its predecessor.
///
/// The overlapped chunk is trimmed from the start until it fits `chunk_size` again.
fn apply_overlap(
    chunks: Vec<String>,
    chunk_size: usize,
    overlap: usize,
    token_counter: &TokenCounter,
) -> Vec<String> {
    let effective_overlap = overlap.min(chunk_size.saturating_sub(1));
    if chunks.len() < 2 || effective_overlap == 0 {
        return chunks;
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    let mut previous: Option<String> = None;

    for current in chunks {
        let chunk = match previous.as_deref() {
            Some(prev) => build_overlapped_chunk(
                prev,
                &current,
                effective_overlap,
                chunk_size,
                token_counter,
            ),
            None => current.clone(),
        };
        overlapped.push(chunk);
        previous = Some(current);
    }

    overlapped
}

fn build_overlapped_chunk(
    previous: &str,
    current: &str,
    overlap: usize,
    chunk_size: usize,
    token_counter: &TokenCounter,
) -> String {
    let tail = trim_from_start(previous, overlap, token_counter);
    let mut combined = String::with_capacity(tail.len() + current.len() + 1);

    if !tail.is_empty() {
        combined.push_str(tail);
        if !ends_with_whitespace(tail) && !starts_with_whitespace(current) {
            combined.push(' ');
        }
    }

    combined.push_str(current);
    trim_from_start(&combined, chunk_size, token_counter).to_string()
}

/// Longest suffix of `text` (left-trimmed) whose token count fits `token_limit`.
///
/// Binary search over char boundaries keeps this at O(log n) counter calls; a suffix never
/// counts more tokens than a longer suffix of the same text.
fn trim_from_start<'a>(text: &'a str, token_limit: usize, token_counter: &TokenCounter) -> &'a str {
    if token_limit == 0 {
        return "";
    }

    let trimmed_text = text.trim_start();
    if token_counter.as_ref()(trimmed_text) <= token_limit {
        return trimmed_text;
    }

    let mut starts: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
    starts.push(text.len());
    let fits = |start: usize| token_counter.as_ref()(text[start..].trim_start()) <= token_limit;

    // `high` always indexes a fitting start; the empty suffix fits any limit.
    let mut low = 1;
    let mut high = starts.len() - 1;
    while low < high {
        let mid = low + (high - low) / 2;
        if fits(starts[mid]) {
            high = mid;
        } else {
            low = mid + 1;
        }
    }
    text[starts[high]..].trim_start()
}

fn starts_with_whitespace(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_whitespace)
}

fn ends_with_whitespace(text: &str) -> bool {
    text.chars().next_back().is_some_and(char::is_whitespace)
}
