//! Session-scoped RAG service coordinating uploads, indexing, routing, and queries.

mod cache;
pub mod pipeline;

pub use cache::IndexCache;
pub use pipeline::{
    DocumentPipeline, DocumentSummary, IndexedDocument, PipelineError, PipelineSettings,
    apply_chunk_limit,
};

use crate::config::Config;
use crate::index::{QueryEngine, QueryError, SourceNode};
use crate::ingestion::{ChunkingError, PdfLoader, UploadError, UploadStore, UploadedFile};
use crate::metrics::{MetricsSnapshot, RagMetrics};
use crate::models::Models;
use crate::routing::{KeywordRouter, QueryRouter, Route};
use crate::session::{ActiveDocument, HistoryEntry, InstallOutcome, SessionPhase, SessionStore};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by [`RagApi`] operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No session exists with the given id.
    #[error("Session {0} not found")]
    SessionNotFound(Uuid),
    /// A query arrived before any document was indexed.
    #[error("Upload a document before asking questions")]
    NoDocument,
    /// The query was empty after trimming.
    #[error("Query must not be empty")]
    EmptyQuery,
    /// A newer upload to the same session started while this one was indexing.
    #[error("A newer upload replaced this document")]
    Superseded,
    /// The upload was rejected or could not be stored.
    #[error(transparent)]
    Upload(#[from] UploadError),
    /// The document could not be indexed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// The query engine failed.
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Session details returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    /// Session identifier.
    pub session_id: Uuid,
    /// Current phase.
    pub phase: SessionPhase,
    /// Active document, if one has been indexed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentSummary>,
    /// Number of answered queries.
    pub history_len: usize,
}

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    /// Description of the indexed document.
    #[serde(flatten)]
    pub document: DocumentSummary,
    /// Whether the indexes were reused from the cache.
    pub cached: bool,
    /// Token budget used when splitting.
    pub chunk_size: usize,
}

/// Answer to a session query.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// Engine that produced the answer.
    pub route: Route,
    /// Generated answer text.
    pub response: String,
    /// Chunks the answer was built from.
    pub sources: Vec<SourceNode>,
}

/// Operations exposed to the HTTP surface.
#[async_trait]
pub trait RagApi: Send + Sync {
    /// Open a new idle session.
    async fn open_session(&self) -> SessionInfo;

    /// Describe an existing session.
    async fn session_info(&self, session_id: Uuid) -> Result<SessionInfo, ServiceError>;

    /// Close a session and drop its state.
    async fn close_session(&self, session_id: Uuid) -> Result<(), ServiceError>;

    /// Store and index an uploaded PDF as the session's active document.
    ///
    /// The previous document is dropped as soon as the upload starts, so a failed upload
    /// leaves the session idle.
    async fn upload(
        &self,
        session_id: Uuid,
        file: UploadedFile,
    ) -> Result<UploadOutcome, ServiceError>;

    /// Route and answer a question against the session's active document.
    async fn ask(&self, session_id: Uuid, query: String) -> Result<Answer, ServiceError>;

    /// Answered queries in the order they were asked.
    async fn history(&self, session_id: Uuid) -> Result<Vec<HistoryEntry>, ServiceError>;

    /// Current counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Default [`RagApi`] implementation backed by in-memory sessions.
///
/// Built once at startup and shared through an `Arc`. Model clients, the upload store, and the
/// index cache are shared by every session; documents and histories are per session.
/// Stored uploads are deleted as soon as their indexes are built or the build fails.
pub struct RagService {
    models: Models,
    pipeline: DocumentPipeline,
    uploads: UploadStore,
    router: Box<dyn QueryRouter>,
    cache: IndexCache,
    sessions: SessionStore,
    metrics: RagMetrics,
}

impl RagService {
    /// Build the service from runtime configuration.
    pub fn from_config(config: &Config, models: Models) -> Result<Self, ChunkingError> {
        let pipeline = DocumentPipeline::new(
            Arc::new(PdfLoader::new()),
            PipelineSettings::from_config(config),
        )?;
        tracing::info!(
            upload_dir = %config.upload_dir.display(),
            llm_model = %config.llm_model,
            embedding_model = %config.embedding_model,
            "RAG service initialized"
        );
        Ok(Self::new(
            models,
            pipeline,
            UploadStore::new(config.upload_dir.clone()),
            Box::new(KeywordRouter::default()),
            IndexCache::new(config.index_cache_capacity),
            SessionStore::with_idle_ttl(config.session_idle_ttl),
        ))
    }

    /// Assemble the service from explicit parts.
    pub fn new(
        models: Models,
        pipeline: DocumentPipeline,
        uploads: UploadStore,
        router: Box<dyn QueryRouter>,
        cache: IndexCache,
        sessions: SessionStore,
    ) -> Self {
        Self {
            models,
            pipeline,
            uploads,
            router,
            cache,
            sessions,
            metrics: RagMetrics::new(),
        }
    }

    /// Drop sessions idle past their TTL, returning how many were removed.
    pub async fn prune_idle_sessions(&self) -> usize {
        let removed = self.sessions.prune_expired().await;
        if removed > 0 {
            tracing::info!(removed, "Expired idle sessions");
        }
        removed
    }

    /// Sweep idle sessions every `every` until the service is dropped.
    pub fn spawn_session_sweeper(self: &Arc<Self>, every: Duration) {
        let service = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(service) = service.upgrade() else {
                    break;
                };
                service.prune_idle_sessions().await;
            }
        });
    }

    async fn index_upload(
        &self,
        file: &UploadedFile,
    ) -> Result<(Arc<IndexedDocument>, bool), ServiceError> {
        let stored = self.uploads.persist(file).await?;
        if let Some(document) = self.cache.get(&stored.content_hash) {
            tracing::debug!(content_hash = %stored.content_hash, "Index cache hit");
            self.uploads.discard(&stored).await;
            self.metrics.record_cache_hit();
            return Ok((document, true));
        }

        let built = self.pipeline.build(&stored, &self.models).await;
        self.uploads.discard(&stored).await;
        let document = Arc::new(built?);
        self.metrics.record_document(
            document.indexed_chunks() as u64,
            document.dropped_chunks() as u64,
        );
        self.cache.insert(document.clone());
        Ok((document, false))
    }
}

#[async_trait]
impl RagApi for RagService {
    async fn open_session(&self) -> SessionInfo {
        let session_id = self.sessions.create().await;
        tracing::info!(%session_id, "Session opened");
        SessionInfo {
            session_id,
            phase: SessionPhase::Idle,
            document: None,
            history_len: 0,
        }
    }

    async fn session_info(&self, session_id: Uuid) -> Result<SessionInfo, ServiceError> {
        let snapshot = self
            .sessions
            .snapshot(session_id)
            .await
            .ok_or(ServiceError::SessionNotFound(session_id))?;
        Ok(SessionInfo {
            session_id,
            phase: snapshot.phase,
            document: snapshot.document.map(|document| document.describe()),
            history_len: snapshot.history_len,
        })
    }

    async fn close_session(&self, session_id: Uuid) -> Result<(), ServiceError> {
        if self.sessions.remove(session_id).await {
            tracing::info!(%session_id, "Session closed");
            Ok(())
        } else {
            Err(ServiceError::SessionNotFound(session_id))
        }
    }

    async fn upload(
        &self,
        session_id: Uuid,
        file: UploadedFile,
    ) -> Result<UploadOutcome, ServiceError> {
        let ticket = self
            .sessions
            .begin_upload(session_id)
            .await
            .ok_or(ServiceError::SessionNotFound(session_id))?;

        let (index, cached) = match self.index_upload(&file).await {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(%session_id, file_name = %file.file_name, error = %error, "Upload failed");
                return Err(error);
            }
        };

        let document = ActiveDocument {
            file_name: file.file_name,
            index,
        };
        match self
            .sessions
            .install_document(session_id, ticket, document.clone())
            .await
        {
            InstallOutcome::Installed => {}
            InstallOutcome::Superseded => {
                tracing::info!(%session_id, file_name = %document.file_name, "Upload superseded");
                return Err(ServiceError::Superseded);
            }
            InstallOutcome::SessionGone => return Err(ServiceError::SessionNotFound(session_id)),
        }
        tracing::info!(
            %session_id,
            file_name = %document.file_name,
            indexed_chunks = document.index.indexed_chunks(),
            cached,
            "Document ready for queries"
        );

        Ok(UploadOutcome {
            document: document.describe(),
            cached,
            chunk_size: self.pipeline.chunk_size(),
        })
    }

    async fn ask(&self, session_id: Uuid, query: String) -> Result<Answer, ServiceError> {
        let snapshot = self
            .sessions
            .snapshot(session_id)
            .await
            .ok_or(ServiceError::SessionNotFound(session_id))?;
        let query = query.trim();
        if query.is_empty() {
            return Err(ServiceError::EmptyQuery);
        }
        let document = snapshot.document.ok_or(ServiceError::NoDocument)?;

        let route = self.router.route(query);
        tracing::debug!(%session_id, route = route.as_str(), "Query routed");
        let engine: &dyn QueryEngine = match route {
            Route::Summary => &document.index.summary,
            Route::Vector => &document.index.vector,
        };

        let result = match engine.query(&self.models, query).await {
            Ok(result) => result,
            Err(error) => {
                self.metrics.record_failed_query();
                tracing::warn!(%session_id, route = route.as_str(), error = %error, "Query failed");
                return Err(error.into());
            }
        };

        self.metrics.record_query(route);
        self.sessions
            .append_history(
                session_id,
                HistoryEntry::new(query.to_string(), route, result.response.clone()),
            )
            .await;

        Ok(Answer {
            route,
            response: result.response,
            sources: result.sources,
        })
    }

    async fn history(&self, session_id: Uuid) -> Result<Vec<HistoryEntry>, ServiceError> {
        self.sessions
            .history(session_id)
            .await
            .ok_or(ServiceError::SessionNotFound(session_id))
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::pipeline::tests::{FileTextLoader, file_pipeline, numbered_pages, pipeline};
    use super::*;
    use crate::ingestion::{Document, DocumentLoader, LoadError};
    use crate::testing::{FakeEmbedder, FakeLlm};
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::mpsc;

    struct Harness {
        service: RagService,
        llm: Arc<FakeLlm>,
        embedder: Arc<FakeEmbedder>,
        dir: tempfile::TempDir,
    }

    fn harness(pages: Vec<String>, cache_capacity: usize) -> Harness {
        harness_with(pipeline(pages, Some(10)), cache_capacity)
    }

    fn harness_with(pipeline: DocumentPipeline, cache_capacity: usize) -> Harness {
        let dir = tempfile::tempdir().expect("tempdir");
        let llm = Arc::new(FakeLlm::new());
        let embedder = Arc::new(FakeEmbedder::new());
        let service = RagService::new(
            Models::new(llm.clone(), embedder.clone()),
            pipeline,
            UploadStore::new(dir.path()),
            Box::new(KeywordRouter::default()),
            IndexCache::new(cache_capacity),
            SessionStore::new(),
        );
        Harness {
            service,
            llm,
            embedder,
            dir,
        }
    }

    fn stored_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
    }

    fn pdf(name: &str, body: &str) -> UploadedFile {
        UploadedFile {
            file_name: name.into(),
            content_type: Some("application/pdf".into()),
            bytes: format!("%PDF-1.4\n{body}").into_bytes(),
        }
    }

    #[tokio::test]
    async fn queries_before_upload_are_rejected() {
        let harness = harness(numbered_pages(3), 4);
        let session = harness.service.open_session().await;

        let error = harness
            .service
            .ask(session.session_id, "what is this?".into())
            .await
            .expect_err("no document");
        assert!(matches!(error, ServiceError::NoDocument));
        assert!(harness.service.history(session.session_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_moves_session_to_awaiting_query() {
        let harness = harness(numbered_pages(3), 4);
        let session = harness.service.open_session().await;
        assert_eq!(session.phase, SessionPhase::Idle);

        let outcome = harness
            .service
            .upload(session.session_id, pdf("paper.pdf", "one"))
            .await
            .expect("upload");
        assert!(!outcome.cached);
        assert_eq!(outcome.document.indexed_chunks, 3);
        assert_eq!(outcome.chunk_size, 4);

        let info = harness.service.session_info(session.session_id).await.unwrap();
        assert_eq!(info.phase, SessionPhase::AwaitingQuery);
        assert_eq!(info.document.expect("document").file_name, "paper.pdf");
    }

    #[tokio::test]
    async fn summarize_keyword_routes_to_summary_engine() {
        let harness = harness(numbered_pages(3), 4);
        let id = harness.service.open_session().await.session_id;
        harness.service.upload(id, pdf("paper.pdf", "one")).await.unwrap();

        let summary = harness
            .service
            .ask(id, "Please SUMMARIZE the paper".into())
            .await
            .unwrap();
        assert_eq!(summary.route, Route::Summary);
        assert_eq!(summary.sources.len(), 3);

        let targeted = harness
            .service
            .ask(id, "what does marker1 describe?".into())
            .await
            .unwrap();
        assert_eq!(targeted.route, Route::Vector);
        assert_eq!(targeted.sources.len(), 2);

        let metrics = harness.service.metrics_snapshot();
        assert_eq!(metrics.summary_queries, 1);
        assert_eq!(metrics.vector_queries, 1);
    }

    #[tokio::test]
    async fn history_records_answers_in_order() {
        let harness = harness(numbered_pages(3), 4);
        let id = harness.service.open_session().await.session_id;
        harness.service.upload(id, pdf("paper.pdf", "one")).await.unwrap();

        let first = harness.service.ask(id, "first question".into()).await.unwrap();
        let second = harness.service.ask(id, "summarize it".into()).await.unwrap();

        let history = harness.service.history(id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].query, "first question");
        assert_eq!(history[0].response, first.response);
        assert_eq!(history[1].route, Route::Summary);
        assert_eq!(history[1].response, second.response);
    }

    #[tokio::test]
    async fn failed_queries_keep_the_session_usable() {
        let harness = harness(numbered_pages(3), 4);
        let id = harness.service.open_session().await.session_id;
        harness.service.upload(id, pdf("paper.pdf", "one")).await.unwrap();

        harness.llm.set_failing(true);
        let error = harness
            .service
            .ask(id, "what is marker2?".into())
            .await
            .expect_err("outage");
        assert!(matches!(&error, ServiceError::Query(query) if query.is_remote()));
        assert!(harness.service.history(id).await.unwrap().is_empty());

        harness.llm.set_failing(false);
        harness.service.ask(id, "what is marker2?".into()).await.expect("recovered");
        let info = harness.service.session_info(id).await.unwrap();
        assert_eq!(info.phase, SessionPhase::AwaitingQuery);
        assert_eq!(info.history_len, 1);
        assert_eq!(harness.service.metrics_snapshot().failed_queries, 1);
    }

    #[tokio::test]
    async fn blank_queries_are_rejected() {
        let harness = harness(numbered_pages(3), 4);
        let id = harness.service.open_session().await.session_id;
        let error = harness.service.ask(id, "   ".into()).await.expect_err("blank");
        assert!(matches!(error, ServiceError::EmptyQuery));
    }

    #[tokio::test]
    async fn identical_uploads_reuse_cached_indexes() {
        let harness = harness(numbered_pages(3), 4);
        let first = harness.service.open_session().await.session_id;
        let second = harness.service.open_session().await.session_id;

        harness.service.upload(first, pdf("a.pdf", "same")).await.unwrap();
        let calls = harness.embedder.calls();
        let outcome = harness.service.upload(second, pdf("b.pdf", "same")).await.unwrap();

        assert!(outcome.cached);
        assert_eq!(harness.embedder.calls(), calls);
        let metrics = harness.service.metrics_snapshot();
        assert_eq!(metrics.cache_hits, 1);
        assert_eq!(metrics.documents_indexed, 1);
    }

    #[tokio::test]
    async fn reupload_answers_only_from_the_new_document() {
        let harness = harness_with(file_pipeline(Arc::new(FileTextLoader)), 0);
        let id = harness.service.open_session().await.session_id;
        harness
            .service
            .upload(id, pdf("old.pdf", "oldmarker alpha beta"))
            .await
            .unwrap();
        let before = harness.service.ask(id, "what is oldmarker?".into()).await.unwrap();
        assert!(before.sources.iter().any(|source| source.text.contains("oldmarker")));

        let outcome = harness
            .service
            .upload(id, pdf("new.pdf", "newmarker gamma delta"))
            .await
            .unwrap();
        assert!(!outcome.cached);

        for query in ["what is oldmarker?", "summarize the paper"] {
            let answer = harness.service.ask(id, query.into()).await.unwrap();
            assert!(!answer.sources.is_empty());
            assert!(
                answer
                    .sources
                    .iter()
                    .all(|source| source.text.contains("newmarker")
                        && !source.text.contains("oldmarker")),
                "{query}: {:?}",
                answer.sources
            );
            assert!(!answer.response.contains("oldmarker"));
        }
        let info = harness.service.session_info(id).await.unwrap();
        assert_eq!(info.document.expect("document").file_name, "new.pdf");
        assert_eq!(info.history_len, 3);
    }

    #[tokio::test]
    async fn failed_reupload_leaves_the_session_idle() {
        let harness = harness_with(file_pipeline(Arc::new(FileTextLoader)), 0);
        let id = harness.service.open_session().await.session_id;
        harness
            .service
            .upload(id, pdf("old.pdf", "oldmarker alpha beta"))
            .await
            .unwrap();

        harness.embedder.set_failing(true);
        let error = harness
            .service
            .upload(id, pdf("new.pdf", "newmarker gamma delta"))
            .await
            .expect_err("embedding outage");
        assert!(matches!(&error, ServiceError::Pipeline(failure) if failure.is_remote()));

        let info = harness.service.session_info(id).await.unwrap();
        assert_eq!(info.phase, SessionPhase::Idle);
        assert!(info.document.is_none());
        let error = harness
            .service
            .ask(id, "what is oldmarker?".into())
            .await
            .expect_err("old document is gone");
        assert!(matches!(error, ServiceError::NoDocument));

        harness.embedder.set_failing(false);
        harness
            .service
            .upload(id, pdf("new.pdf", "newmarker gamma delta"))
            .await
            .expect("retry succeeds");
        let answer = harness.service.ask(id, "what is newmarker?".into()).await.unwrap();
        assert!(answer.sources.iter().all(|source| source.text.contains("newmarker")));
    }

    /// Blocks loading any file mentioning `slowmarker` until the test releases it.
    struct GatedLoader {
        started: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl DocumentLoader for GatedLoader {
        fn load(&self, path: &Path, file_name: &str) -> Result<Vec<Document>, LoadError> {
            let documents = FileTextLoader.load(path, file_name)?;
            if documents.iter().any(|document| document.text.contains("slowmarker")) {
                let _ = self.started.lock().unwrap().send(());
                let _ = self.release.lock().unwrap().recv();
            }
            Ok(documents)
        }
    }

    #[tokio::test]
    async fn older_upload_finishing_last_does_not_replace_newer_one() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let loader = GatedLoader {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
        };
        let harness = harness_with(file_pipeline(Arc::new(loader)), 0);
        let service = &harness.service;
        let id = service.open_session().await.session_id;

        let slow = service.upload(id, pdf("slow.pdf", "slowmarker alpha beta"));
        let fast = async {
            tokio::task::spawn_blocking(move || started_rx.recv())
                .await
                .expect("join")
                .expect("slow upload started");
            let outcome = service.upload(id, pdf("fast.pdf", "fastmarker gamma delta")).await;
            release_tx.send(()).expect("release slow upload");
            outcome
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert!(matches!(slow, Err(ServiceError::Superseded)), "{slow:?}");
        assert_eq!(fast.expect("newer upload").document.file_name, "fast.pdf");
        let info = service.session_info(id).await.unwrap();
        assert_eq!(info.document.expect("document").file_name, "fast.pdf");
        let answer = service.ask(id, "what is slowmarker?".into()).await.unwrap();
        assert!(answer.sources.iter().all(|source| !source.text.contains("slowmarker")));
    }

    #[tokio::test]
    async fn cache_hits_report_each_sessions_file_name() {
        let harness = harness(numbered_pages(3), 4);
        let first = harness.service.open_session().await.session_id;
        let second = harness.service.open_session().await.session_id;

        harness.service.upload(first, pdf("a.pdf", "same")).await.unwrap();
        let outcome = harness.service.upload(second, pdf("b.pdf", "same")).await.unwrap();

        assert!(outcome.cached);
        assert_eq!(outcome.document.file_name, "b.pdf");
        let second_info = harness.service.session_info(second).await.unwrap();
        assert_eq!(second_info.document.expect("document").file_name, "b.pdf");
        let first_info = harness.service.session_info(first).await.unwrap();
        assert_eq!(first_info.document.expect("document").file_name, "a.pdf");
    }

    #[tokio::test]
    async fn stored_uploads_are_deleted_after_indexing() {
        let harness = harness(numbered_pages(3), 4);
        let id = harness.service.open_session().await.session_id;

        harness.service.upload(id, pdf("a.pdf", "first")).await.unwrap();
        assert_eq!(stored_files(harness.dir.path()), 0);

        let cached = harness.service.upload(id, pdf("a.pdf", "first")).await.unwrap();
        assert!(cached.cached);
        assert_eq!(stored_files(harness.dir.path()), 0);

        harness.embedder.set_failing(true);
        harness
            .service
            .upload(id, pdf("b.pdf", "second"))
            .await
            .expect_err("outage");
        assert_eq!(stored_files(harness.dir.path()), 0);
    }

    #[tokio::test]
    async fn unknown_session_is_reported_before_blank_query() {
        let harness = harness(numbered_pages(3), 4);
        let error = harness
            .service
            .ask(Uuid::new_v4(), "   ".into())
            .await
            .expect_err("unknown session");
        assert!(matches!(error, ServiceError::SessionNotFound(_)));
    }

    fn service_with_ttl(ttl: Duration) -> (RagService, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = RagService::new(
            Models::new(Arc::new(FakeLlm::new()), Arc::new(FakeEmbedder::new())),
            pipeline(numbered_pages(3), Some(10)),
            UploadStore::new(dir.path()),
            Box::new(KeywordRouter::default()),
            IndexCache::new(4),
            SessionStore::with_idle_ttl(Some(ttl)),
        );
        (service, dir)
    }

    #[tokio::test]
    async fn idle_sweep_closes_expired_sessions() {
        let (service, _dir) = service_with_ttl(Duration::ZERO);
        let id = service.open_session().await.session_id;

        assert_eq!(service.prune_idle_sessions().await, 1);
        assert!(matches!(
            service.session_info(id).await,
            Err(ServiceError::SessionNotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn background_sweeper_drops_abandoned_sessions() {
        let (service, _dir) = service_with_ttl(Duration::from_secs(60));
        let service = Arc::new(service);
        service.spawn_session_sweeper(Duration::from_secs(60));
        let abandoned = service.open_session().await.session_id;

        tokio::time::sleep(Duration::from_secs(150)).await;

        assert!(service.sessions.is_empty().await);
        assert!(matches!(
            service.history(abandoned).await,
            Err(ServiceError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn sessions_do_not_share_documents() {
        let harness = harness(numbered_pages(3), 4);
        let first = harness.service.open_session().await.session_id;
        let second = harness.service.open_session().await.session_id;
        harness.service.upload(first, pdf("a.pdf", "a")).await.unwrap();

        let error = harness
            .service
            .ask(second, "question".into())
            .await
            .expect_err("no document");
        assert!(matches!(error, ServiceError::NoDocument));
    }

    #[tokio::test]
    async fn rejected_uploads_leave_session_idle() {
        let harness = harness(numbered_pages(3), 4);
        let id = harness.service.open_session().await.session_id;
        let error = harness
            .service
            .upload(
                id,
                UploadedFile {
                    file_name: "notes.txt".into(),
                    content_type: Some("text/plain".into()),
                    bytes: b"hello".to_vec(),
                },
            )
            .await
            .expect_err("rejected");
        assert!(matches!(error, ServiceError::Upload(_)));
        let info = harness.service.session_info(id).await.unwrap();
        assert_eq!(info.phase, SessionPhase::Idle);
    }

    #[tokio::test]
    async fn unknown_and_closed_sessions_are_not_found() {
        let harness = harness(numbered_pages(3), 4);
        let id = harness.service.open_session().await.session_id;
        harness.service.close_session(id).await.unwrap();

        assert!(matches!(
            harness.service.history(id).await,
            Err(ServiceError::SessionNotFound(_))
        ));
        assert!(matches!(
            harness.service.upload(id, pdf("a.pdf", "a")).await,
            Err(ServiceError::SessionNotFound(_))
        ));
        assert!(matches!(
            harness.service.close_session(id).await,
            Err(ServiceError::SessionNotFound(_))
        ));
    }
}
