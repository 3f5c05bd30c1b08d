//! Data model shared by the planner, orchestrator, memory, and queue.

use crate::duration::DurationMs;
use crate::id::{JobId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Research depth, governing how many steps a plan synthesizes and how
/// aggressively tools are asked to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    /// Minimal coverage, fewest steps.
    Shallow,
    /// Default coverage.
    Medium,
    /// Maximal coverage, includes a refinement step.
    Deep,
}

impl Default for Depth {
    fn default() -> Self {
        Self::Medium
    }
}

impl Depth {
    /// Parse a depth from its lowercase wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "shallow" => Some(Self::Shallow),
            "medium" => Some(Self::Medium),
            "deep" => Some(Self::Deep),
            _ => None,
        }
    }

    /// The `max_results` hint passed down to tools for steps at this depth.
    pub fn max_results_hint(self) -> u32 {
        match self {
            Self::Shallow => 3,
            Self::Medium => 5,
            Self::Deep => 8,
        }
    }
}

/// A natural-language research request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    /// The research question or topic.
    pub text: String,
    /// How thoroughly to research.
    #[serde(default)]
    pub depth: Depth,
    /// Paths to attached documents to analyze.
    #[serde(default)]
    pub documents: Vec<String>,
    /// Whether web search tools may be used.
    #[serde(default)]
    pub use_web: bool,
    /// Whether Wikipedia tools may be used.
    #[serde(default)]
    pub use_wiki: bool,
    /// Upper bound on plan length; `0` means "use the engine default".
    #[serde(default)]
    pub max_steps: u32,
}

/// How a query was classified by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchType {
    /// No special signal; falls back to web/wiki search.
    General,
    /// Query text matched an academic-research keyword.
    Academic,
    /// Only attached documents, no web/wiki.
    Document,
    /// Attached documents plus web/wiki.
    Multi,
}

/// The attributable origin of a piece of content.
///
/// `id` is a deterministic function of the source's identity fields so
/// that two `Source`s describing the same origin compare equal for
/// deduplication purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Content-derived identifier; see [`Source::dedup_key`].
    pub id: String,
    /// Source kind: `web`, `wikipedia`, `pdf`, `docx`, ...
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable title.
    pub title: Option<String>,
    /// Web URL, if any.
    pub url: Option<String>,
    /// Local file path, if any.
    pub file_path: Option<String>,
    /// Author attribution.
    pub author: Option<String>,
    /// Publisher attribution.
    pub publisher: Option<String>,
    /// Publication date, as an opaque string (source-format dependent).
    pub publish_date: Option<String>,
    /// When the source was accessed.
    pub access_date: Option<DateTime<Utc>>,
    /// Full extracted content.
    pub content: Option<String>,
    /// Short excerpt for display.
    pub excerpt: Option<String>,
    /// Page number, for paginated sources.
    pub page_number: Option<u32>,
    /// Relevance score in `[0, 1]`.
    pub relevance: f64,
    /// When this `Source` value was constructed.
    pub timestamp: DateTime<Utc>,
    /// Arbitrary tool-specific metadata.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Source {
    /// The deduplication key used by [`crate`](crate) consumers (the
    /// research memory) to decide whether two sources are "the same
    /// source": the URL if present, else `title|page_number`, else a
    /// content hash so that identity-less sources never collapse onto
    /// each other by accident.
    pub fn dedup_key(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        if let Some(title) = &self.title {
            return format!("{}|{}", title, self.page_number.unwrap_or(0));
        }
        let mut hasher = Sha256::new();
        hasher.update(self.content.as_deref().unwrap_or("").as_bytes());
        hasher.update(self.excerpt.as_deref().unwrap_or("").as_bytes());
        format!("sha256:{:x}", hasher.finalize())
    }
}

/// An atomic claim extracted or asserted during research.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Unique identifier, assigned on insertion into memory.
    pub id: String,
    /// The claim text.
    pub content: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// The source this finding was drawn from.
    pub source: Source,
    /// When this finding was recorded.
    pub timestamp: DateTime<Utc>,
}

/// One tool invocation declared by the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchStep {
    /// 1-based, unique within a plan.
    pub step_number: u32,
    /// Name of the tool to invoke.
    pub tool: String,
    /// Action the tool should perform.
    pub action: String,
    /// Tool parameters.
    pub parameters: HashMap<String, serde_json::Value>,
    /// Human-readable rationale for why this step exists.
    pub reasoning: String,
    /// Step numbers this step depends on.
    #[serde(default)]
    pub depends_on: Vec<u32>,
    /// Lower runs earlier; steps sharing a priority form a tier.
    pub priority: u32,
    /// Maximum retry attempts after the first.
    #[serde(default)]
    pub max_retries: u32,
}

/// An ordered, priority-grouped plan of tool calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchPlan {
    /// The query this plan was synthesized for.
    pub query: Query,
    /// Ordered steps.
    pub steps: Vec<ResearchStep>,
    /// Sum of per-tool nominal costs plus overhead.
    pub estimated_time: DurationMs,
    /// How the query was classified.
    pub research_type: ResearchType,
    /// Concise human-readable rationale.
    pub strategy: String,
}

/// The execution record of a single [`ResearchStep`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// The step number this result belongs to.
    pub step_number: u32,
    /// Whether the step ultimately succeeded.
    pub success: bool,
    /// Opaque tool output.
    pub data: Option<serde_json::Value>,
    /// Sources returned by the tool.
    #[serde(default)]
    pub sources: Vec<Source>,
    /// Human-readable error, if `success` is false.
    pub error: Option<String>,
    /// When execution of this step began.
    pub start_time: DateTime<Utc>,
    /// When execution of this step ended.
    pub end_time: DateTime<Utc>,
    /// Wall-clock duration of the (possibly retried) execution.
    pub duration: DurationMs,
    /// Number of retries beyond the first attempt.
    pub retries: u32,
}

/// The final synthesized outcome of a research session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResult {
    /// The original query.
    pub query: Query,
    /// Templated human-readable summary.
    pub summary: String,
    /// All findings collected into memory.
    pub key_findings: Vec<Finding>,
    /// All sources collected into memory.
    pub sources: Vec<Source>,
    /// Every step's execution record.
    pub steps: Vec<StepResult>,
    /// Overall confidence in `[0, 1]`.
    pub confidence: f64,
    /// Total wall-clock duration of the session.
    pub duration: DurationMs,
    /// Number of steps in the plan.
    pub total_steps: u32,
    /// Number of steps that succeeded.
    pub successful_steps: u32,
    /// Number of steps that failed.
    pub failed_steps: u32,
    /// Carried over from the plan.
    pub research_type: ResearchType,
    /// When aggregation completed.
    pub completion_time: DateTime<Utc>,
}

/// Lifecycle status of a single step's progress, as observed externally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    /// The step has started but not yet finished.
    InProgress,
    /// The step finished successfully.
    Completed,
    /// The step finished unsuccessfully (after exhausting retries).
    Failed,
}

/// A single progress update, emitted exactly twice per step lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The session this event belongs to.
    pub session_id: SessionId,
    /// 1-based index of the step this event describes.
    pub current_step: u32,
    /// Total steps in the plan.
    pub total_steps: u32,
    /// Human-readable description of the step.
    pub step_description: String,
    /// Overall progress in `[0, 100]`.
    pub progress: f64,
    /// Step lifecycle status.
    pub status: ProgressStatus,
    /// Freeform message.
    pub message: Option<String>,
    /// When this event was emitted.
    pub timestamp: DateTime<Utc>,
}

/// Lifecycle status of a queued job. Terminal states never transition
/// again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted, waiting for a worker.
    Queued,
    /// Currently being executed by a worker.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully.
    Failed,
    /// Cancelled before or during execution.
    Cancelled,
}

impl JobStatus {
    /// Whether this status is sticky (never transitions further).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// A research request accepted by the job queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: JobId,
    /// The request this job was created for.
    pub query: Query,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Overall progress in `[0, 100]`.
    pub progress: f64,
    /// 1-based index of the step currently executing, if any.
    pub current_step: u32,
    /// Total steps in the plan, once known.
    pub total_steps: u32,
    /// When the job was enqueued.
    pub created_at: DateTime<Utc>,
    /// When a worker began executing the job.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Short human-readable error, populated for `failed` jobs.
    pub error: Option<String>,
    /// The serialized [`ResearchResult`], populated once completed.
    pub result: Option<serde_json::Value>,
}

impl Job {
    /// Create a freshly queued job for `query`.
    pub fn new(id: JobId, query: Query) -> Self {
        Self {
            id,
            query,
            status: JobStatus::Queued,
            progress: 0.0,
            current_step: 0,
            total_steps: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
            result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(url: Option<&str>, title: Option<&str>, page: Option<u32>) -> Source {
        Source {
            id: String::new(),
            kind: "web".into(),
            title: title.map(str::to_owned),
            url: url.map(str::to_owned),
            file_path: None,
            author: None,
            publisher: None,
            publish_date: None,
            access_date: None,
            content: None,
            excerpt: None,
            page_number: page,
            relevance: 0.5,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn dedup_key_prefers_url() {
        let s = source(Some("https://example.com/a"), Some("A"), None);
        assert_eq!(s.dedup_key(), "https://example.com/a");
    }

    #[test]
    fn dedup_key_falls_back_to_title_and_page() {
        let s = source(None, Some("Report"), Some(3));
        assert_eq!(s.dedup_key(), "Report|3");
    }

    #[test]
    fn dedup_key_hashes_content_when_identity_is_absent() {
        let mut a = source(None, None, None);
        a.content = Some("same text".into());
        let mut b = source(None, None, None);
        b.content = Some("same text".into());
        let mut c = source(None, None, None);
        c.content = Some("different text".into());

        assert_eq!(a.dedup_key(), b.dedup_key());
        assert_ne!(a.dedup_key(), c.dedup_key());
        assert!(a.dedup_key().starts_with("sha256:"));
    }

    #[test]
    fn job_starts_queued_with_zero_progress() {
        let job = Job::new(JobId::new("job-1"), Query {
            text: "x".into(),
            depth: Depth::Medium,
            documents: vec![],
            use_web: true,
            use_wiki: false,
            max_steps: 0,
        });
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0.0);
        assert!(!job.status.is_terminal());
    }
}
