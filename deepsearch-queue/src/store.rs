//! Job store: the durable record of every job's lifecycle.

use async_trait::async_trait;
use chrono::Utc;
use deepsearch_types::{Job, JobId, JobStatus, ResearchResult};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Durable storage for job records.
///
/// Any backend that preserves the job lifecycle and survives process
/// boundaries is acceptable; the queue only relies on read-your-writes
/// consistency per job id.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a freshly enqueued job.
    async fn create(&self, job: Job);

    /// Fetch a job by id.
    async fn get(&self, id: &JobId) -> Option<Job>;

    /// Transition a job's status, stamping `started_at` the first time it
    /// becomes `Running` and `completed_at` when it reaches a terminal
    /// state. `error`, when present, is recorded alongside `Failed` or
    /// `Cancelled`.
    async fn update_status(&self, id: &JobId, status: JobStatus, error: Option<String>);

    /// Update the live progress fields of a running job.
    async fn update_progress(&self, id: &JobId, current_step: u32, total_steps: u32, progress: f64);

    /// Mark a job completed and attach its serialized result.
    async fn complete(&self, id: &JobId, result: ResearchResult);

    /// Snapshot of every job currently known to the store.
    async fn list(&self) -> Vec<Job>;

    /// Remove a job's record.
    async fn delete(&self, id: &JobId);

    /// Counts of jobs per status.
    async fn stats(&self) -> HashMap<JobStatus, usize> {
        let mut counts = HashMap::new();
        for job in self.list().await {
            *counts.entry(job.status).or_insert(0) += 1;
        }
        counts
    }
}

/// An in-memory [`JobStore`]. Jobs are at-most-once across process
/// restarts, matching the core's documented non-goal of not persisting
/// partial state across crashes unless a real store is plugged in.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    /// Build an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: Job) {
        self.jobs.write().await.insert(job.id.clone(), job);
    }

    async fn get(&self, id: &JobId) -> Option<Job> {
        self.jobs.read().await.get(id).cloned()
    }

    async fn update_status(&self, id: &JobId, status: JobStatus, error: Option<String>) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(id) {
            if status == JobStatus::Running && job.started_at.is_none() {
                job.started_at = Some(Utc::now());
            }
            if status.is_terminal() {
                job.completed_at = Some(Utc::now());
            }
            job.status = status;
            if error.is_some() {
                job.error = error;
            }
        }
    }

    async fn update_progress(&self, id: &JobId, current_step: u32, total_steps: u32, progress: f64) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(id) {
            job.current_step = current_step;
            job.total_steps = total_steps;
            job.progress = progress;
        }
    }

    async fn complete(&self, id: &JobId, result: ResearchResult) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(id) {
            job.status = JobStatus::Completed;
            job.completed_at = Some(Utc::now());
            job.progress = 100.0;
            job.current_step = job.total_steps;
            job.result = serde_json::to_value(&result).ok();
        }
    }

    async fn list(&self) -> Vec<Job> {
        self.jobs.read().await.values().cloned().collect()
    }

    async fn delete(&self, id: &JobId) {
        self.jobs.write().await.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepsearch_types::{Depth, Query};

    fn query() -> Query {
        Query {
            text: "test".into(),
            depth: Depth::Shallow,
            documents: vec![],
            use_web: true,
            use_wiki: false,
            max_steps: 0,
        }
    }

    #[tokio::test]
    async fn running_transition_stamps_started_at_once() {
        let store = InMemoryJobStore::new();
        let id = JobId::new("j1");
        store.create(Job::new(id.clone(), query())).await;
        store.update_status(&id, JobStatus::Running, None).await;
        let first = store.get(&id).await.unwrap().started_at.unwrap();
        store.update_status(&id, JobStatus::Running, None).await;
        let second = store.get(&id).await.unwrap().started_at.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn terminal_transition_stamps_completed_at() {
        let store = InMemoryJobStore::new();
        let id = JobId::new("j2");
        store.create(Job::new(id.clone(), query())).await;
        store.update_status(&id, JobStatus::Failed, Some("boom".into())).await;
        let job = store.get(&id).await.unwrap();
        assert!(job.completed_at.is_some());
        assert_eq!(job.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn stats_counts_by_status() {
        let store = InMemoryJobStore::new();
        store.create(Job::new(JobId::new("a"), query())).await;
        store.create(Job::new(JobId::new("b"), query())).await;
        store.update_status(&JobId::new("b"), JobStatus::Running, None).await;
        let stats = store.stats().await;
        assert_eq!(stats.get(&JobStatus::Queued), Some(&1));
        assert_eq!(stats.get(&JobStatus::Running), Some(&1));
    }
}
