#![deny(missing_docs)]
//! Command-line front end for the deep research engine: plan and run a
//! query synchronously, or serve it through the job queue while
//! streaming progress.

mod args;

pub use args::Cli;

use args::{Commands, QueryArgs};
use deepsearch_agent::ResearchAgent;
use deepsearch_queue::{InMemoryJobStore, JobQueue, ProgressHub};
use deepsearch_tool::builtin::{docx_processor, pdf_processor, FactCheckerTool, SummarizerTool, WebSearchTool, WikipediaTool};
use deepsearch_tool::ToolRegistry;
use deepsearch_types::{EngineConfig, Query, ResearchResult, SessionId, ToolContext};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

/// Errors surfaced to `main`, each mapping to a process exit with a
/// printed message.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CliError {
    /// The query failed validation or planning.
    #[error(transparent)]
    Agent(#[from] deepsearch_agent::AgentError),
    /// The job queue rejected the request.
    #[error(transparent)]
    Queue(#[from] deepsearch_queue::QueueError),
    /// Failed to render a result as JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Dispatch a parsed [`Cli`] invocation.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Run(query_args) => run_once(query_args).await,
        Commands::Serve { query, workers, queue_capacity } => serve(query, workers, queue_capacity).await,
    }
}

fn registry(config: &EngineConfig) -> Arc<ToolRegistry> {
    Arc::new(ToolRegistry::new(config.step_timeout.to_std()))
}

async fn seed_builtin_tools(registry: &ToolRegistry) {
    let _ = registry.register(Arc::new(WebSearchTool::default())).await;
    let _ = registry.register(Arc::new(WikipediaTool::default())).await;
    let _ = registry.register(Arc::new(pdf_processor())).await;
    let _ = registry.register(Arc::new(docx_processor())).await;
    let _ = registry.register(Arc::new(SummarizerTool::default())).await;
    let _ = registry.register(Arc::new(FactCheckerTool::default())).await;
}

fn to_query(args: QueryArgs) -> Query {
    Query {
        text: args.text,
        depth: args.depth.into(),
        documents: args.documents,
        use_web: args.web,
        use_wiki: args.wiki,
        max_steps: args.max_steps,
    }
}

async fn run_once(query_args: QueryArgs) -> Result<(), CliError> {
    let config = EngineConfig::default();
    let registry = registry(&config);
    seed_builtin_tools(&registry).await;

    let agent = ResearchAgent::new(registry, config.clone());
    let session_id = SessionId::new(Uuid::new_v4().to_string());
    let ctx = ToolContext {
        deadline: Some(Instant::now() + config.timeout.to_std()),
        cancellation: CancellationToken::new(),
    };

    info!(session = %session_id, "starting research session");
    let result = agent.run(session_id, to_query(query_args), &ctx, None).await?;
    print_result(&result)?;
    Ok(())
}

async fn serve(query_args: QueryArgs, workers: usize, queue_capacity: usize) -> Result<(), CliError> {
    let config = EngineConfig::default();
    let registry = registry(&config);
    seed_builtin_tools(&registry).await;

    let store = Arc::new(InMemoryJobStore::new());
    let hub = Arc::new(ProgressHub::new());
    let queue = JobQueue::new(store, registry, config, hub, queue_capacity, workers);

    let job = queue.enqueue(to_query(query_args)).await?;
    println!("enqueued job {}", job.id);

    let (_, mut events) = queue.subscribe(job.id.clone()).await;
    while let Some(event) = events.recv().await {
        println!(
            "[{}/{}] {:?} {:.0}% {}",
            event.current_step,
            event.total_steps,
            event.status,
            event.progress,
            event.step_description
        );
    }

    if let Some(final_job) = queue.get(&job.id).await {
        println!("job finished: {:?}", final_job.status);
        if let Some(result) = &final_job.result {
            println!("{}", serde_json::to_string_pretty(result)?);
        }
        if let Some(error) = &final_job.error {
            println!("error: {error}");
        }
    }

    queue.shutdown().await;
    Ok(())
}

fn print_result(result: &ResearchResult) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}
