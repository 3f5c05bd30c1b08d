//! Whole-workspace integration test: wires every crate together the way
//! a real caller would, without mocking anything below the tool layer.
//!
//! 1. **Agent run** — `ResearchAgent` drives planning and orchestration
//!    over the built-in tools to a completed `ResearchResult`.
//! 2. **Queue run** — the same query through `JobQueue`, observed via a
//!    `ProgressHub` subscription rather than the agent's return value.

use deepsearch_agent::ResearchAgent;
use deepsearch_queue::{InMemoryJobStore, JobQueue, ProgressHub};
use deepsearch_tool::builtin::{WebSearchTool, WikipediaTool};
use deepsearch_tool::ToolRegistry;
use deepsearch_types::{Depth, EngineConfig, Query, SessionId, ToolContext};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn query() -> Query {
    Query {
        text: "history of the channel type in golang".into(),
        depth: Depth::Shallow,
        documents: vec![],
        use_web: true,
        use_wiki: true,
        max_steps: 0,
    }
}

async fn seeded_registry(config: &EngineConfig) -> Arc<ToolRegistry> {
    let registry = Arc::new(ToolRegistry::new(config.step_timeout.to_std()));
    registry.register(Arc::new(WebSearchTool::default())).await.unwrap();
    registry.register(Arc::new(WikipediaTool::default())).await.unwrap();
    registry
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Agent
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn agent_completes_a_multi_source_query() {
    let config = EngineConfig::default();
    let registry = seeded_registry(&config).await;
    let agent = ResearchAgent::new(registry, config.clone());

    let ctx = ToolContext {
        deadline: Some(Instant::now() + config.timeout.to_std()),
        cancellation: CancellationToken::new(),
    };

    let result = agent
        .run(SessionId::new("e2e-agent"), query(), &ctx, None)
        .await
        .unwrap();

    assert!(result.successful_steps > 0);
    assert!(!result.sources.is_empty());
    assert!(result.confidence > 0.0);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Queue
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn queue_drives_a_job_to_completion_while_streaming_progress() {
    let config = EngineConfig::default();
    let registry = seeded_registry(&config).await;
    let store = Arc::new(InMemoryJobStore::new());
    let hub = Arc::new(ProgressHub::new());
    let queue = JobQueue::new(store, registry, config, hub, 8, 1);

    let job = queue.enqueue(query()).await.unwrap();
    let (_, mut events) = queue.subscribe(job.id.clone()).await;

    let mut saw_event = false;
    while events.recv().await.is_some() {
        saw_event = true;
    }
    assert!(saw_event, "expected at least one progress event before the channel closed");

    let final_job = queue.get(&job.id).await.unwrap();
    assert!(final_job.status.is_terminal());
    assert!(final_job.result.is_some());

    queue.shutdown().await;
}
