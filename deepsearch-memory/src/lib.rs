#![deny(missing_docs)]
//! Research Memory: a concurrent, deduplicating store for sources,
//! findings, and per-step results.
//!
//! A `ResearchMemory` lives exactly one session: created at plan start,
//! mutated by the orchestrator and by tools' returned sources, and
//! discarded (or serialized into the final result) at session end.

use chrono::{DateTime, Utc};
use deepsearch_types::{DurationMs, Finding, SessionId, Source, StepResult};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Thread-safe store parameterized by a session id and the query string.
///
/// All mutating operations acquire an exclusive lock; all reads acquire
/// a shared lock and return deep copies so callers never observe
/// concurrent mutation after the call returns.
pub struct ResearchMemory {
    session_id: SessionId,
    query: String,
    created_at: DateTime<Utc>,
    sources: RwLock<Vec<Source>>,
    findings: RwLock<Vec<Finding>>,
    step_results: RwLock<Vec<StepResult>>,
}

impl ResearchMemory {
    /// Create an empty memory for `session_id` researching `query`.
    pub fn new(session_id: SessionId, query: impl Into<String>) -> Self {
        Self {
            session_id,
            query: query.into(),
            created_at: Utc::now(),
            sources: RwLock::new(Vec::new()),
            findings: RwLock::new(Vec::new()),
            step_results: RwLock::new(Vec::new()),
        }
    }

    /// The session this memory belongs to.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Stamp `finding.timestamp`, append it, then insert its source into
    /// the source table (deduplicating).
    pub async fn add_finding(&self, mut finding: Finding) {
        finding.timestamp = Utc::now();
        let source = finding.source.clone();
        self.findings.write().await.push(finding);
        self.add_source(source).await;
    }

    /// Insert `source` if its dedup key is not already present;
    /// otherwise a no-op. The first insertion for a given key wins.
    pub async fn add_source(&self, mut source: Source) {
        let key = source.dedup_key();
        let mut sources = self.sources.write().await;
        if sources.iter().any(|s| s.dedup_key() == key) {
            return;
        }
        source.id = key;
        sources.push(source);
    }

    /// Append `result` to step history and insert each of its sources.
    pub async fn add_step_result(&self, result: StepResult) {
        let sources = result.sources.clone();
        self.step_results.write().await.push(result);
        for source in sources {
            self.add_source(source).await;
        }
    }

    /// Findings whose content contains any of `terms`, case-insensitive.
    pub async fn query_related_findings(&self, terms: &[String]) -> Vec<Finding> {
        let lowered: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
        self.findings
            .read()
            .await
            .iter()
            .filter(|f| {
                let content = f.content.to_lowercase();
                lowered.iter().any(|t| content.contains(t.as_str()))
            })
            .cloned()
            .collect()
    }

    /// Up to `n` sources ordered by `relevance` descending, stable on
    /// ties (insertion order preserved among equal-relevance sources).
    pub async fn top_sources(&self, n: usize) -> Vec<Source> {
        let mut sources = self.sources.read().await.clone();
        sources.sort_by(|a, b| b.relevance.partial_cmp(&a.relevance).unwrap());
        sources.truncate(n);
        sources
    }

    /// All findings, in insertion order.
    pub async fn findings(&self) -> Vec<Finding> {
        self.findings.read().await.clone()
    }

    /// All sources, in insertion order.
    pub async fn sources(&self) -> Vec<Source> {
        self.sources.read().await.clone()
    }

    /// All step results, in insertion order.
    pub async fn step_results(&self) -> Vec<StepResult> {
        self.step_results.read().await.clone()
    }

    /// A string summarizing session id, query, and step counts.
    pub async fn summary(&self) -> String {
        let steps = self.step_results.read().await;
        let successful = steps.iter().filter(|s| s.success).count();
        let failed = steps.len() - successful;
        format!(
            "session {} | query: \"{}\" | steps: {} ({} ok, {} failed) | findings: {} | sources: {}",
            self.session_id,
            self.query,
            steps.len(),
            successful,
            failed,
            self.findings.read().await.len(),
            self.sources.read().await.len(),
        )
    }

    /// Empty every store, leaving the session id, query, and creation
    /// time untouched.
    pub async fn clear(&self) {
        self.sources.write().await.clear();
        self.findings.write().await.clear();
        self.step_results.write().await.clear();
    }

    /// Wall-clock time elapsed since this memory was created.
    pub fn duration(&self) -> DurationMs {
        let elapsed = Utc::now().signed_duration_since(self.created_at);
        DurationMs::from_millis(elapsed.num_milliseconds().max(0) as u64)
    }

    /// Mean confidence across all findings; `0.0` if there are none.
    pub async fn average_confidence(&self) -> f64 {
        let findings = self.findings.read().await;
        if findings.is_empty() {
            return 0.0;
        }
        findings.iter().map(|f| f.confidence).sum::<f64>() / findings.len() as f64
    }

    /// Number of distinct sources currently stored.
    pub async fn source_count(&self) -> usize {
        self.sources.read().await.len()
    }
}

/// Generate a fresh finding id. Exposed so callers assembling a
/// [`Finding`] before calling [`ResearchMemory::add_finding`] can fill
/// in a unique id without depending on a specific id scheme.
pub fn new_finding_id() -> String {
    Uuid::new_v4().to_string()
}
