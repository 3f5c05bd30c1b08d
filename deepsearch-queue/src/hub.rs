//! Progress Hub: a long-lived fan-out point between running sessions and
//! external subscribers, keyed by job id.

use deepsearch_types::{JobId, ProgressEvent};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, RwLock};

const SUBSCRIBER_BUFFER: usize = 32;

/// Handle returned on subscribe; pair it with [`ProgressHub::unsubscribe`]
/// to stop receiving events for a job before it reaches a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberId(u64);

/// Fans out [`ProgressEvent`]s to every subscriber registered against a
/// job id. Delivery is non-blocking per-subscriber: a slow subscriber is
/// skipped for that event rather than stalling the publisher.
#[derive(Default)]
pub struct ProgressHub {
    subscribers: RwLock<HashMap<JobId, Vec<(SubscriberId, mpsc::Sender<ProgressEvent>)>>>,
    next_id: AtomicU64,
}

impl ProgressHub {
    /// Build an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for `job_id`, returning its id (for
    /// unsubscribe) and the receiving end of its channel.
    pub async fn subscribe(&self, job_id: JobId) -> (SubscriberId, mpsc::Receiver<ProgressEvent>) {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.subscribers.write().await.entry(job_id).or_default().push((id, tx));
        (id, rx)
    }

    /// Remove a single subscriber from a job's fan-out list.
    pub async fn unsubscribe(&self, job_id: &JobId, subscriber_id: SubscriberId) {
        if let Some(subs) = self.subscribers.write().await.get_mut(job_id) {
            subs.retain(|(id, _)| *id != subscriber_id);
        }
    }

    /// Deliver `event` to every current subscriber of `job_id`. Full
    /// subscriber buffers are dropped for this event, not awaited.
    pub async fn publish(&self, job_id: &JobId, event: ProgressEvent) {
        if let Some(subs) = self.subscribers.read().await.get(job_id) {
            for (_, tx) in subs {
                let _ = tx.try_send(event.clone());
            }
        }
    }

    /// Drop every subscriber registered for `job_id`. Called once the
    /// job reaches a terminal state; each subscriber's receiver observes
    /// the channel close and should reconcile against `get(job_id)`.
    pub async fn close(&self, job_id: &JobId) {
        self.subscribers.write().await.remove(job_id);
    }

    /// Drop every subscriber for every job, used at queue shutdown.
    pub async fn close_all(&self) {
        self.subscribers.write().await.clear();
    }

    /// Number of subscribers currently registered for `job_id`.
    pub async fn subscriber_count(&self, job_id: &JobId) -> usize {
        self.subscribers.read().await.get(job_id).map(Vec::len).unwrap_or(0)
    }
}
