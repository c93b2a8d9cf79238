//! Per-session state: the active document and the query history.
//!
//! A session starts `idle`, moves to `awaiting-query` once an upload is indexed, and keeps an
//! append-only history of answered queries until it is closed or sits idle past its TTL.
//!
//! Every upload takes a ticket from [`SessionStore::begin_upload`], which also clears the active
//! document. Only the holder of the newest ticket may install its indexes, so a slow or failed
//! build can never leave an older file answering questions.

use crate::routing::Route;
use crate::service::{DocumentSummary, IndexedDocument};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

/// Where a session stands in the upload/query cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPhase {
    /// No document has been indexed yet.
    Idle,
    /// A document is indexed and queries are accepted.
    AwaitingQuery,
}

/// Answered query recorded in a session's history.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    /// Question as submitted.
    pub query: String,
    /// Engine that answered it.
    pub route: Route,
    /// Generated answer.
    pub response: String,
    /// RFC 3339 time the answer was recorded.
    pub answered_at: String,
}

impl HistoryEntry {
    /// Build an entry stamped with the current time.
    pub fn new(query: String, route: Route, response: String) -> Self {
        Self {
            query,
            route,
            response,
            answered_at: current_timestamp_rfc3339(),
        }
    }
}

/// Indexes installed in a session, under the name this session uploaded them with.
///
/// The indexes may be shared with other sessions through the cache; the file name is not.
#[derive(Clone)]
pub struct ActiveDocument {
    /// File name supplied with this session's upload.
    pub file_name: String,
    /// Shared indexes.
    pub index: Arc<IndexedDocument>,
}

impl ActiveDocument {
    /// Serializable description reporting this session's file name.
    pub fn describe(&self) -> DocumentSummary {
        DocumentSummary {
            file_name: self.file_name.clone(),
            ..self.index.describe()
        }
    }
}

/// Proof that an upload was started; see [`SessionStore::begin_upload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket(u64);

/// Result of [`SessionStore::install_document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The document is now active.
    Installed,
    /// A newer upload started after this ticket was issued.
    Superseded,
    /// The session no longer exists.
    SessionGone,
}

struct Session {
    document: Option<ActiveDocument>,
    history: Vec<HistoryEntry>,
    upload_seq: u64,
    last_active: Instant,
}

impl Session {
    fn new(now: Instant) -> Self {
        Self {
            document: None,
            history: Vec::new(),
            upload_seq: 0,
            last_active: now,
        }
    }

    fn phase(&self) -> SessionPhase {
        if self.document.is_some() {
            SessionPhase::AwaitingQuery
        } else {
            SessionPhase::Idle
        }
    }
}

/// Point-in-time view of a session.
#[derive(Clone)]
pub struct SessionSnapshot {
    /// Current phase.
    pub phase: SessionPhase,
    /// Active document, if any.
    pub document: Option<ActiveDocument>,
    /// Number of history entries.
    pub history_len: usize,
}

/// In-memory registry of sessions keyed by id.
///
/// Any access refreshes a session. With an idle TTL configured, sessions untouched for that
/// long are dropped on the next access or sweep, releasing their documents.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
    idle_ttl: Option<Duration>,
}

impl SessionStore {
    /// Create an empty store whose sessions never expire.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store expiring sessions idle for `idle_ttl`; `None` keeps them forever.
    pub fn with_idle_ttl(idle_ttl: Option<Duration>) -> Self {
        Self {
            sessions: RwLock::default(),
            idle_ttl,
        }
    }

    fn is_expired(&self, session: &Session, now: Instant) -> bool {
        self.idle_ttl
            .is_some_and(|ttl| now.saturating_duration_since(session.last_active) >= ttl)
    }

    /// Look up a live session and mark it active, dropping it if it has expired.
    fn touch<'a>(
        &self,
        sessions: &'a mut HashMap<Uuid, Session>,
        id: Uuid,
    ) -> Option<&'a mut Session> {
        let now = Instant::now();
        if sessions
            .get(&id)
            .is_some_and(|session| self.is_expired(session, now))
        {
            sessions.remove(&id);
            tracing::info!(session_id = %id, "Session expired");
            return None;
        }
        let session = sessions.get_mut(&id)?;
        session.last_active = now;
        Some(session)
    }

    /// Open a new idle session, sweeping expired ones first.
    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        sessions.retain(|_, session| !self.is_expired(session, now));
        sessions.insert(id, Session::new(now));
        id
    }

    /// Drop every session idle past the TTL, returning how many were removed.
    pub async fn prune_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|_, session| !self.is_expired(session, now));
        before - sessions.len()
    }

    /// Close a session, dropping its document reference and history.
    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    /// Whether the session exists and has not expired.
    pub async fn contains(&self, id: Uuid) -> bool {
        let mut sessions = self.sessions.write().await;
        self.touch(&mut sessions, id).is_some()
    }

    /// Snapshot a session.
    pub async fn snapshot(&self, id: Uuid) -> Option<SessionSnapshot> {
        let mut sessions = self.sessions.write().await;
        self.touch(&mut sessions, id).map(|session| SessionSnapshot {
            phase: session.phase(),
            document: session.document.clone(),
            history_len: session.history.len(),
        })
    }

    /// Start an upload: clear the active document and issue a ticket that supersedes any
    /// earlier one.
    pub async fn begin_upload(&self, id: Uuid) -> Option<UploadTicket> {
        let mut sessions = self.sessions.write().await;
        let session = self.touch(&mut sessions, id)?;
        session.document = None;
        session.upload_seq += 1;
        Some(UploadTicket(session.upload_seq))
    }

    /// Install a built document if `ticket` is still the session's newest upload.
    pub async fn install_document(
        &self,
        id: Uuid,
        ticket: UploadTicket,
        document: ActiveDocument,
    ) -> InstallOutcome {
        let mut sessions = self.sessions.write().await;
        let Some(session) = self.touch(&mut sessions, id) else {
            return InstallOutcome::SessionGone;
        };
        if session.upload_seq != ticket.0 {
            return InstallOutcome::Superseded;
        }
        session.document = Some(document);
        InstallOutcome::Installed
    }

    /// Append an answered query to the session history.
    pub async fn append_history(&self, id: Uuid, entry: HistoryEntry) -> bool {
        let mut sessions = self.sessions.write().await;
        match self.touch(&mut sessions, id) {
            Some(session) => {
                session.history.push(entry);
                true
            }
            None => false,
        }
    }

    /// Copy of the session history in append order.
    pub async fn history(&self, id: Uuid) -> Option<Vec<HistoryEntry>> {
        let mut sessions = self.sessions.write().await;
        self.touch(&mut sessions, id)
            .map(|session| session.history.clone())
    }

    /// Number of stored sessions, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no sessions are stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}
