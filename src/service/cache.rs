//! Built indexes cached by upload content hash.

use super::pipeline::IndexedDocument;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, Arc<IndexedDocument>>,
    order: VecDeque<String>,
}

/// Least-recently-used cache of indexed documents keyed by content hash.
pub struct IndexCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl IndexCache {
    /// Create a cache holding at most `capacity` documents; zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Look up a document, marking it as recently used.
    pub fn get(&self, content_hash: &str) -> Option<Arc<IndexedDocument>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let document = state.entries.get(content_hash).cloned()?;
        state.order.retain(|key| key != content_hash);
        state.order.push_back(content_hash.to_string());
        Some(document)
    }

    /// Insert a document, evicting the least recently used entry when full.
    pub fn insert(&self, document: Arc<IndexedDocument>) {
        if self.capacity == 0 {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let key = document.content_hash.clone();
        state.order.retain(|existing| existing != &key);
        state.order.push_back(key.clone());
        state.entries.insert(key, document);

        while state.entries.len() > self.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
            tracing::debug!(content_hash = %oldest, "Evicted cached index");
        }
    }

    /// Number of cached documents.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
