#![deny(missing_docs)]
//! Job Queue & Progress Hub: the asynchronous surface for external
//! callers. Accepts research requests, runs them on a pool of
//! background workers, and multiplexes progress to live subscribers.

mod hub;
mod store;

pub use hub::{ProgressHub, SubscriberId};
pub use store::{InMemoryJobStore, JobStore};

use deepsearch_agent::ResearchAgent;
use deepsearch_tool::ToolRegistry;
use deepsearch_types::{EngineConfig, Job, JobId, JobStatus, ProgressEvent, Query, SessionId, ToolContext};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex as AsyncMutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Errors from queue operations, returned synchronously to the caller.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum QueueError {
    /// `query` failed the same validation the Agent enforces; no job was
    /// created.
    #[error("validation failed: {0}")]
    Validation(String),
    /// The internal dispatch channel is saturated; no job was created.
    #[error("queue is full")]
    Full,
    /// The queue is shutting down and is no longer accepting new jobs.
    #[error("queue is shutting down")]
    ShuttingDown,
    /// No job is registered under this id.
    #[error("job not found")]
    NotFound,
    /// Catch-all for other queue failures.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Accepts research requests and runs them on a pool of background
/// workers, fanning out progress through a [`ProgressHub`].
pub struct JobQueue {
    store: Arc<dyn JobStore>,
    registry: Arc<ToolRegistry>,
    config: EngineConfig,
    hub: Arc<ProgressHub>,
    tx: mpsc::Sender<JobId>,
    tokens: RwLock<HashMap<JobId, CancellationToken>>,
    accepting: AtomicBool,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl JobQueue {
    /// Build a queue backed by `store`, dispatching tool calls through
    /// `registry` bounded by `config`, with `queue_capacity` buffered
    /// dispatch slots and `worker_count` background workers.
    pub fn new(
        store: Arc<dyn JobStore>,
        registry: Arc<ToolRegistry>,
        config: EngineConfig,
        hub: Arc<ProgressHub>,
        queue_capacity: usize,
        worker_count: usize,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let shared_rx = Arc::new(AsyncMutex::new(rx));

        let queue = Arc::new(Self {
            store,
            registry,
            config,
            hub,
            tx,
            tokens: RwLock::new(HashMap::new()),
            accepting: AtomicBool::new(true),
            workers: std::sync::Mutex::new(Vec::new()),
        });

        let handles: Vec<JoinHandle<()>> = (0..worker_count)
            .map(|_| {
                let queue = queue.clone();
                let shared_rx = shared_rx.clone();
                tokio::spawn(async move { queue.worker_loop(shared_rx).await })
            })
            .collect();
        *queue.workers.lock().expect("workers lock poisoned") = handles;

        queue
    }

    /// Validate and enqueue `query`, returning the freshly created job
    /// record with `status=queued`.
    pub async fn enqueue(&self, query: Query) -> Result<Job, QueueError> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(QueueError::ShuttingDown);
        }
        deepsearch_agent::validate(&query).map_err(|e| QueueError::Validation(e.to_string()))?;

        let id = JobId::new(Uuid::new_v4().to_string());
        self.tx.try_send(id.clone()).map_err(|_| QueueError::Full)?;

        let job = Job::new(id, query);
        self.store.create(job.clone()).await;
        Ok(job)
    }

    /// Fetch a job's current record.
    pub async fn get(&self, id: &JobId) -> Option<Job> {
        self.store.get(id).await
    }

    /// Cancel a queued or running job by cancelling its session context.
    /// A no-op on an already-terminal job or an unknown one other than
    /// returning `NotFound`.
    pub async fn cancel(&self, id: &JobId) -> Result<(), QueueError> {
        let job = self.store.get(id).await.ok_or(QueueError::NotFound)?;
        if job.status.is_terminal() {
            return Ok(());
        }
        if let Some(token) = self.tokens.read().await.get(id) {
            token.cancel();
        }
        self.store.update_status(id, JobStatus::Cancelled, None).await;
        self.hub.close(id).await;
        Ok(())
    }

    /// Counts of jobs per status.
    pub async fn stats(&self) -> HashMap<JobStatus, usize> {
        self.store.stats().await
    }

    /// Subscribe to progress events for `id`.
    pub async fn subscribe(&self, id: JobId) -> (SubscriberId, mpsc::Receiver<ProgressEvent>) {
        self.hub.subscribe(id).await
    }

    /// Stop accepting new jobs, cancel every running session, wait for
    /// workers to drain, then close the hub.
    pub async fn shutdown(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        for token in self.tokens.read().await.values() {
            token.cancel();
        }
        let handles = std::mem::take(&mut *self.workers.lock().expect("workers lock poisoned"));
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker task panicked during shutdown");
            }
        }
        self.hub.close_all().await;
    }

    async fn worker_loop(self: Arc<Self>, shared_rx: Arc<AsyncMutex<mpsc::Receiver<JobId>>>) {
        loop {
            let job_id = {
                let mut rx = shared_rx.lock().await;
                rx.recv().await
            };
            let Some(job_id) = job_id else { break };
            self.process_job(job_id).await;
        }
    }

    async fn process_job(&self, job_id: JobId) {
        let Some(job) = self.store.get(&job_id).await else { return };
        if job.status != JobStatus::Queued {
            self.hub.close(&job_id).await;
            return;
        }

        let token = CancellationToken::new();
        self.tokens.write().await.insert(job_id.clone(), token.clone());
        self.store.update_status(&job_id, JobStatus::Running, None).await;

        let ctx = ToolContext {
            deadline: Some(Instant::now() + self.config.timeout.to_std()),
            cancellation: token.clone(),
        };

        let (progress_tx, mut progress_rx) = mpsc::channel::<ProgressEvent>(64);
        let store = self.store.clone();
        let hub = self.hub.clone();
        let forward_id = job_id.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = progress_rx.recv().await {
                store
                    .update_progress(&forward_id, event.current_step, event.total_steps, event.progress)
                    .await;
                hub.publish(&forward_id, event).await;
            }
        });

        let agent = ResearchAgent::new(self.registry.clone(), self.config.clone());
        let session_id = SessionId::new(job_id.as_str());
        let outcome = agent.run(session_id, job.query.clone(), &ctx, Some(progress_tx)).await;
        let _ = forwarder.await;

        match outcome {
            Ok(result) => {
                info!(job = %job_id, "job completed");
                self.store.complete(&job_id, result).await;
            }
            Err(e) => {
                let status = if token.is_cancelled() { JobStatus::Cancelled } else { JobStatus::Failed };
                warn!(job = %job_id, error = %e, ?status, "job finished unsuccessfully");
                self.store.update_status(&job_id, status, Some(e.to_string())).await;
            }
        }

        self.hub.close(&job_id).await;
        self.tokens.write().await.remove(&job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepsearch_types::Depth;

    fn query(use_web: bool) -> Query {
        Query {
            text: "golang channels".into(),
            depth: Depth::Shallow,
            documents: vec![],
            use_web,
            use_wiki: false,
            max_steps: 0,
        }
    }

    fn queue_with(worker_count: usize) -> Arc<JobQueue> {
        let registry = Arc::new(ToolRegistry::new(std::time::Duration::from_secs(5)));
        JobQueue::new(
            Arc::new(InMemoryJobStore::new()),
            registry,
            EngineConfig::default(),
            Arc::new(ProgressHub::new()),
            16,
            worker_count,
        )
    }

    #[tokio::test]
    async fn enqueue_rejects_invalid_query_without_creating_a_job() {
        let queue = queue_with(1);
        let err = queue.enqueue(query(false)).await.unwrap_err();
        assert!(matches!(err, QueueError::Validation(_)));
    }

    #[tokio::test]
    async fn enqueue_then_get_finds_the_job() {
        let queue = queue_with(1);
        let job = queue.enqueue(query(true)).await.unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert!(queue.get(&job.id).await.is_some());
    }

    #[tokio::test]
    async fn job_reaches_a_terminal_state_without_any_registered_tools() {
        let queue = queue_with(1);
        let job = queue.enqueue(query(true)).await.unwrap();

        for _ in 0..50 {
            if queue.get(&job.id).await.unwrap().status.is_terminal() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        let final_job = queue.get(&job.id).await.unwrap();
        assert!(final_job.status.is_terminal());
    }

    #[tokio::test]
    async fn cancelling_an_already_terminal_job_is_a_no_op() {
        let queue = queue_with(1);
        let job = queue.enqueue(query(true)).await.unwrap();
        for _ in 0..50 {
            if queue.get(&job.id).await.unwrap().status.is_terminal() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        let before = queue.get(&job.id).await.unwrap().status;
        queue.cancel(&job.id).await.unwrap();
        let after = queue.get(&job.id).await.unwrap().status;
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn cancel_of_unknown_job_is_not_found() {
        let queue = queue_with(1);
        let err = queue.cancel(&JobId::new("missing")).await.unwrap_err();
        assert!(matches!(err, QueueError::NotFound));
    }

    #[tokio::test]
    async fn stats_reflects_enqueued_jobs() {
        let queue = queue_with(0);
        queue.enqueue(query(true)).await.unwrap();
        queue.enqueue(query(true)).await.unwrap();
        let stats = queue.stats().await;
        assert_eq!(stats.get(&JobStatus::Queued), Some(&2));
    }
}
