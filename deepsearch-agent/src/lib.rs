#![deny(missing_docs)]
//! Research Agent: binds a query to a session, driving it through
//! Planner then Orchestrator, and persisting the outcome if a
//! [`SessionStorage`] is configured.

mod storage;

pub use storage::{InMemorySessionStorage, SessionRecord, SessionStorage};

use deepsearch_memory::ResearchMemory;
use deepsearch_orchestrator::{OrchError, Orchestrator};
use deepsearch_planner::{PlanError, Planner};
use deepsearch_tool::ToolRegistry;
use deepsearch_types::{EngineConfig, ProgressEvent, Query, ResearchResult, SessionId, ToolContext};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

/// Errors surfaced directly to the caller of [`ResearchAgent::run`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AgentError {
    /// `query` failed validation; no session was created.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Plan synthesis failed.
    #[error(transparent)]
    Plan(#[from] PlanError),
    /// Orchestration failed before it could aggregate a result.
    #[error(transparent)]
    Orch(#[from] OrchError),
}

/// A session's position in its lifecycle. `Failed` is reachable from any
/// non-terminal state; terminal states are sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    /// Accepted, not yet validated/planned.
    Idle,
    /// Planner is synthesizing a plan.
    Planning,
    /// Orchestrator is executing the plan.
    Researching,
    /// Orchestrator has finished; building the final result.
    Aggregating,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully.
    Failed,
}

impl AgentStatus {
    /// Whether this status is sticky (never transitions further).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Validate a query per the rules in the component design: non-empty
/// text, at least one enabled source, every document path non-empty.
/// Depth has no invalid-value case to check here since it is a Rust
/// enum, not a free-form string.
pub fn validate(query: &Query) -> Result<(), AgentError> {
    if query.text.trim().is_empty() {
        return Err(AgentError::Validation("query text must not be empty".into()));
    }
    if !query.use_web && !query.use_wiki && query.documents.is_empty() {
        return Err(AgentError::Validation(
            "at least one of use_web, use_wiki, or documents must be set".into(),
        ));
    }
    if query.documents.iter().any(|d| d.trim().is_empty()) {
        return Err(AgentError::Validation("document paths must not be empty".into()));
    }
    Ok(())
}

/// Binds a [`Query`] to a session id, invoking the Planner then the
/// Orchestrator and persisting the outcome through an optional
/// [`SessionStorage`].
pub struct ResearchAgent {
    registry: Arc<ToolRegistry>,
    config: EngineConfig,
    storage: Option<Arc<dyn SessionStorage>>,
}

impl ResearchAgent {
    /// Build an agent dispatching through `registry`, bounded by `config`,
    /// with no session persistence.
    pub fn new(registry: Arc<ToolRegistry>, config: EngineConfig) -> Self {
        Self { registry, config, storage: None }
    }

    /// Attach session persistence.
    pub fn with_storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Run one session to completion: validate, plan, execute, aggregate,
    /// persisting status transitions along the way.
    #[instrument(skip(self, ctx, progress), fields(session = %session_id))]
    pub async fn run(
        &self,
        session_id: SessionId,
        query: Query,
        ctx: &ToolContext,
        progress: Option<mpsc::Sender<ProgressEvent>>,
    ) -> Result<ResearchResult, AgentError> {
        validate(&query)?;

        if let Some(storage) = &self.storage {
            storage
                .create(SessionRecord::new(session_id.clone(), query.clone(), AgentStatus::Planning))
                .await;
        }

        let plan = match Planner::plan(&query, &self.registry, &self.config).await {
            Ok(plan) => plan,
            Err(e) => {
                self.mark_failed(&session_id, e.to_string()).await;
                return Err(e.into());
            }
        };
        info!(steps = plan.steps.len(), research_type = ?plan.research_type, "plan synthesized");

        self.transition(&session_id, AgentStatus::Researching).await;

        let memory = Arc::new(ResearchMemory::new(session_id.clone(), query.text.clone()));
        let orchestrator = Orchestrator::new(self.registry.clone(), self.config.clone());
        let result = match orchestrator.execute(&plan, &session_id, &memory, ctx, progress).await {
            Ok(result) => result,
            Err(e) => {
                self.mark_failed(&session_id, e.to_string()).await;
                return Err(e.into());
            }
        };

        self.transition(&session_id, AgentStatus::Aggregating).await;
        info!(
            successful = result.successful_steps,
            failed = result.failed_steps,
            confidence = result.confidence,
            "session aggregated"
        );

        if let Some(storage) = &self.storage {
            storage.complete(&session_id, result.clone()).await;
        }
        self.transition(&session_id, AgentStatus::Completed).await;

        Ok(result)
    }

    async fn transition(&self, session_id: &SessionId, status: AgentStatus) {
        if let Some(storage) = &self.storage {
            storage.set_status(session_id, status).await;
        }
    }

    async fn mark_failed(&self, session_id: &SessionId, error: String) {
        warn!(%error, "session failed");
        if let Some(storage) = &self.storage {
            storage.fail(session_id, error).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepsearch_tool::builtin::WebSearchTool;
    use deepsearch_types::Depth;
    use std::time::Duration;

    fn registry() -> Arc<ToolRegistry> {
        Arc::new(ToolRegistry::new(Duration::from_secs(1)))
    }

    fn valid_query() -> Query {
        Query {
            text: "golang channels".to_string(),
            depth: Depth::Shallow,
            documents: vec![],
            use_web: true,
            use_wiki: false,
            max_steps: 0,
        }
    }

    #[test]
    fn rejects_empty_text() {
        let mut q = valid_query();
        q.text = "   ".to_string();
        assert!(validate(&q).is_err());
    }

    #[test]
    fn rejects_no_enabled_source() {
        let mut q = valid_query();
        q.use_web = false;
        assert!(validate(&q).is_err());
    }

    #[test]
    fn rejects_blank_document_path() {
        let mut q = valid_query();
        q.use_web = false;
        q.documents = vec!["  ".to_string()];
        assert!(validate(&q).is_err());
    }

    #[test]
    fn accepts_minimally_valid_query() {
        assert!(validate(&valid_query()).is_ok());
    }

    #[tokio::test]
    async fn full_run_completes_and_persists_session() {
        let reg = registry();
        reg.register(Arc::new(WebSearchTool::default())).await.unwrap();
        let storage = Arc::new(InMemorySessionStorage::new());
        let agent = ResearchAgent::new(reg, EngineConfig::default()).with_storage(storage.clone());

        let session_id = SessionId::new("s-test");
        let ctx = ToolContext::new();
        let result = agent.run(session_id.clone(), valid_query(), &ctx, None).await.unwrap();
        assert_eq!(result.total_steps, 1);

        let record = storage.get(&session_id).await.unwrap();
        assert_eq!(record.status, AgentStatus::Completed);
        assert!(record.result.is_some());
    }

    #[tokio::test]
    async fn invalid_query_never_creates_a_session() {
        let reg = registry();
        let storage = Arc::new(InMemorySessionStorage::new());
        let agent = ResearchAgent::new(reg, EngineConfig::default()).with_storage(storage.clone());
        let mut q = valid_query();
        q.text = String::new();

        let ctx = ToolContext::new();
        let session_id = SessionId::new("s-invalid");
        let err = agent.run(session_id.clone(), q, &ctx, None).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
        assert!(storage.get(&session_id).await.is_none());
    }
}
