use crate::routing::Route;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing indexing and query activity.
#[derive(Default)]
pub struct RagMetrics {
    documents_indexed: AtomicU64,
    chunks_indexed: AtomicU64,
    chunks_dropped: AtomicU64,
    cache_hits: AtomicU64,
    summary_queries: AtomicU64,
    vector_queries: AtomicU64,
    failed_queries: AtomicU64,
}

impl RagMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly built upload with its indexed and dropped chunk counts.
    pub fn record_document(&self, indexed: u64, dropped: u64) {
        self.documents_indexed.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(indexed, Ordering::Relaxed);
        self.chunks_dropped.fetch_add(dropped, Ordering::Relaxed);
    }

    /// Record an upload served from the index cache.
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an answered query on the given route.
    pub fn record_query(&self, route: Route) {
        let counter = match route {
            Route::Summary => &self.summary_queries,
            Route::Vector => &self.vector_queries,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a query that failed to produce an answer.
    pub fn record_failed_query(&self) {
        self.failed_queries.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_indexed: self.documents_indexed.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            chunks_dropped: self.chunks_dropped.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            summary_queries: self.summary_queries.load(Ordering::Relaxed),
            vector_queries: self.vector_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of the counters used for reporting.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of uploads indexed since startup (cache hits excluded).
    pub documents_indexed: u64,
    /// Total chunks placed into indexes.
    pub chunks_indexed: u64,
    /// Total chunks left out by the chunk limit.
    pub chunks_dropped: u64,
    /// Uploads answered from the index cache.
    pub cache_hits: u64,
    /// Queries answered by the summary engine.
    pub summary_queries: u64,
    /// Queries answered by the vector engine.
    pub vector_queries: u64,
    /// Queries that ended in an error.
    pub failed_queries: u64,
}
