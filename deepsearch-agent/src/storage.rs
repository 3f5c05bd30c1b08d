//! Session persistence: an optional durable record of a session's
//! lifecycle, keyed by [`SessionId`].

use crate::AgentStatus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deepsearch_types::{Query, ResearchResult, SessionId};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A session's persisted lifecycle record.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// The session this record belongs to.
    pub session_id: SessionId,
    /// The query the session was started for.
    pub query: Query,
    /// Current lifecycle status.
    pub status: AgentStatus,
    /// When the record was first created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
    /// The aggregated result, populated once `status` is `Completed`.
    pub result: Option<ResearchResult>,
    /// Short human-readable error, populated once `status` is `Failed`.
    pub error: Option<String>,
}

impl SessionRecord {
    /// Build a freshly created record with no result or error yet.
    pub fn new(session_id: SessionId, query: Query, status: AgentStatus) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            query,
            status,
            created_at: now,
            updated_at: now,
            result: None,
            error: None,
        }
    }
}

/// Durable storage for session records, consumed by the Agent to record
/// status transitions and the final outcome.
///
/// Any backend that preserves the session lifecycle is acceptable; the
/// Agent only relies on read-your-writes consistency per session id.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Persist a freshly created record.
    async fn create(&self, record: SessionRecord);

    /// Update just the status of an existing record.
    async fn set_status(&self, session_id: &SessionId, status: AgentStatus);

    /// Mark the session failed with a human-readable error.
    async fn fail(&self, session_id: &SessionId, error: String);

    /// Mark the session completed with its aggregated result.
    async fn complete(&self, session_id: &SessionId, result: ResearchResult);

    /// Fetch the current record, if one exists.
    async fn get(&self, session_id: &SessionId) -> Option<SessionRecord>;
}

/// An in-memory [`SessionStorage`], suitable for tests and for
/// single-process deployments with no cross-restart durability
/// requirement (the engine treats jobs as at-most-once across crashes
/// unless a real store is plugged in).
#[derive(Default)]
pub struct InMemorySessionStorage {
    records: RwLock<HashMap<SessionId, SessionRecord>>,
}

impl InMemorySessionStorage {
    /// Build an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn create(&self, record: SessionRecord) {
        self.records.write().await.insert(record.session_id.clone(), record);
    }

    async fn set_status(&self, session_id: &SessionId, status: AgentStatus) {
        if let Some(record) = self.records.write().await.get_mut(session_id) {
            record.status = status;
            record.updated_at = Utc::now();
        }
    }

    async fn fail(&self, session_id: &SessionId, error: String) {
        let mut records = self.records.write().await;
        match records.get_mut(session_id) {
            Some(record) => {
                record.status = AgentStatus::Failed;
                record.error = Some(error);
                record.updated_at = Utc::now();
            }
            None => {
                // Validation failures never create a record, so a
                // planning/orchestration failure on an unknown session
                // is a no-op rather than a panic.
            }
        }
    }

    async fn complete(&self, session_id: &SessionId, result: ResearchResult) {
        if let Some(record) = self.records.write().await.get_mut(session_id) {
            record.status = AgentStatus::Completed;
            record.result = Some(result);
            record.updated_at = Utc::now();
        }
    }

    async fn get(&self, session_id: &SessionId) -> Option<SessionRecord> {
        self.records.read().await.get(session_id).cloned()
    }
}
