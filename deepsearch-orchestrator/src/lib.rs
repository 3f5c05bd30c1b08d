#![deny(missing_docs)]
//! Orchestrator: executes a [`ResearchPlan`] with a worker pool,
//! retry/backoff, timeouts, and progress emission.
//!
//! Steps are grouped by `priority` into ascending tiers. A tier is
//! parallelizable iff no step in it depends on another step in the same
//! tier; otherwise it runs sequentially in declared order. Tiers
//! themselves always run sequentially.

use chrono::Utc;
use deepsearch_memory::ResearchMemory;
use deepsearch_tool::ToolRegistry;
use deepsearch_types::{
    DurationMs, ProgressEvent, ProgressStatus, Query, ResearchPlan, ResearchResult, ResearchStep,
    ResearchType, SessionId, StepResult, ToolContext,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Errors from orchestration.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum OrchError {
    /// The plan's `depends_on` relation contains a cycle; planners must
    /// not emit cycles, and the orchestrator refuses to execute one
    /// rather than silently parallelizing cycle members.
    #[error("plan contains a cyclic dependency among steps: {0:?}")]
    CyclicDependency(Vec<u32>),
    /// Catch-all for other orchestration failures.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Executes research plans: groups steps into tiers, parallelizes within
/// a tier under a semaphore, retries failed steps, and emits progress.
pub struct Orchestrator {
    registry: Arc<ToolRegistry>,
    config: deepsearch_types::EngineConfig,
}

impl Orchestrator {
    /// Build an orchestrator dispatching through `registry`, bounded by
    /// `config`.
    pub fn new(registry: Arc<ToolRegistry>, config: deepsearch_types::EngineConfig) -> Self {
        Self { registry, config }
    }

    /// Execute `plan`, writing sources and step history into `memory`
    /// and emitting [`ProgressEvent`]s on `progress` (non-blocking;
    /// dropped if the channel is full). `ctx`'s cancellation token
    /// governs the whole session; cancelling it short-circuits
    /// subsequent tiers without failing the ones already collected.
    pub async fn execute(
        &self,
        plan: &ResearchPlan,
        session_id: &SessionId,
        memory: &Arc<ResearchMemory>,
        ctx: &ToolContext,
        progress: Option<mpsc::Sender<ProgressEvent>>,
    ) -> Result<ResearchResult, OrchError> {
        validate_no_cycles(&plan.steps)?;

        let total_steps = plan.steps.len() as u32;
        if total_steps == 0 {
            return Ok(empty_result(&plan.query, plan.research_type));
        }

        let tiers = group_into_tiers(&plan.steps);
        let counter = Arc::new(AtomicU32::new(0));
        let mut all_results: Vec<StepResult> = Vec::new();

        for (priority, tier_steps) in tiers {
            if ctx.is_cancelled() {
                debug!(priority, "session cancelled, skipping remaining tiers");
                break;
            }
            let parallel = can_parallelize(&tier_steps);
            debug!(priority, parallel, steps = tier_steps.len(), "executing tier");

            let results = if parallel {
                self.run_tier_parallel(&tier_steps, session_id, memory, ctx, &progress, &counter, total_steps)
                    .await
            } else {
                self.run_tier_sequential(&tier_steps, session_id, memory, ctx, &progress, &counter, total_steps)
                    .await
            };
            all_results.extend(results);
        }

        all_results.sort_by_key(|r| r.step_number);
        Ok(self.aggregate(&plan.query, plan.research_type, total_steps, all_results, memory).await)
    }

    async fn run_tier_sequential(
        &self,
        steps: &[ResearchStep],
        session_id: &SessionId,
        memory: &Arc<ResearchMemory>,
        ctx: &ToolContext,
        progress: &Option<mpsc::Sender<ProgressEvent>>,
        counter: &Arc<AtomicU32>,
        total_steps: u32,
    ) -> Vec<StepResult> {
        let mut results = Vec::with_capacity(steps.len());
        for step in steps {
            results.push(
                execute_step(
                    self.registry.clone(),
                    self.config.clone(),
                    memory.clone(),
                    ctx.clone(),
                    step.clone(),
                    progress.clone(),
                    session_id.clone(),
                    counter.clone(),
                    total_steps,
                )
                .await,
            );
        }
        results
    }

    async fn run_tier_parallel(
        &self,
        steps: &[ResearchStep],
        session_id: &SessionId,
        memory: &Arc<ResearchMemory>,
        ctx: &ToolContext,
        progress: &Option<mpsc::Sender<ProgressEvent>>,
        counter: &Arc<AtomicU32>,
        total_steps: u32,
    ) -> Vec<StepResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrent_tools.max(1)));
        let mut handles = Vec::with_capacity(steps.len());
        for step in steps {
            let permit_source = semaphore.clone();
            let registry = self.registry.clone();
            let config = self.config.clone();
            let memory = memory.clone();
            let ctx = ctx.clone();
            let step = step.clone();
            let progress = progress.clone();
            let session_id = session_id.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit_source.acquire_owned().await.expect("semaphore not closed");
                execute_step(registry, config, memory, ctx, step, progress, session_id, counter, total_steps).await
            }));
        }
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(r) => results.push(r),
                Err(e) => warn!(error = %e, "step task panicked"),
            }
        }
        results
    }

    async fn aggregate(
        &self,
        query: &Query,
        research_type: ResearchType,
        total_steps: u32,
        steps: Vec<StepResult>,
        memory: &Arc<ResearchMemory>,
    ) -> ResearchResult {
        let successful_steps = steps.iter().filter(|s| s.success).count() as u32;
        let failed_steps = steps.iter().filter(|s| !s.success).count() as u32;

        let findings = memory.findings().await;
        let sources = memory.sources().await;
        let mut confidence = memory.average_confidence().await;
        if confidence == 0.0 && !sources.is_empty() {
            confidence = (0.5 + 0.05 * sources.len() as f64).min(0.9);
        }

        ResearchResult {
            query: query.clone(),
            summary: build_summary(&findings, &sources, successful_steps, failed_steps),
            key_findings: findings,
            sources,
            steps,
            confidence,
            duration: memory.duration(),
            total_steps,
            successful_steps,
            failed_steps,
            research_type,
            completion_time: Utc::now(),
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn execute_step(
    registry: Arc<ToolRegistry>,
    config: deepsearch_types::EngineConfig,
    memory: Arc<ResearchMemory>,
    ctx: ToolContext,
    step: ResearchStep,
    progress: Option<mpsc::Sender<ProgressEvent>>,
    session_id: SessionId,
    counter: Arc<AtomicU32>,
    total_steps: u32,
) -> StepResult {
    let current = counter.fetch_add(1, Ordering::SeqCst) + 1;
    let start_time = Utc::now();
    let description = format!("step {}: {} ({})", step.step_number, step.tool, step.action);

    emit(
        &progress,
        ProgressEvent {
            session_id: session_id.clone(),
            current_step: current,
            total_steps,
            step_description: description.clone(),
            progress: percent(current.saturating_sub(1), total_steps),
            status: ProgressStatus::InProgress,
            message: None,
            timestamp: Utc::now(),
        },
    );

    let outcome = if registry.get(&step.tool).await.is_err() {
        StepOutcome {
            tool_result: None,
            error: Some("tool not found".to_string()),
            retries: 0,
        }
    } else {
        run_with_retries(&registry, &config, &ctx, &step).await
    };

    let success = outcome.tool_result.as_ref().map(|r| r.success).unwrap_or(false);
    let (sources, data, error) = match outcome.tool_result {
        Some(r) => (r.sources, r.data, r.error.or(outcome.error)),
        None => (Vec::new(), None, outcome.error),
    };

    let end_time = Utc::now();
    let step_result = StepResult {
        step_number: step.step_number,
        success,
        data,
        sources,
        error,
        start_time,
        end_time,
        duration: (end_time - start_time).to_std().map(DurationMs::from).unwrap_or(DurationMs::ZERO),
        retries: outcome.retries,
    };

    // Per step 4 of the execution contract, sources are only meant to
    // land in memory on success; a failed StepResult never carries
    // sources in practice, so recording history unconditionally here
    // has the same effect while keeping one insertion point.
    memory.add_step_result(step_result.clone()).await;

    emit(
        &progress,
        ProgressEvent {
            session_id,
            current_step: current,
            total_steps,
            step_description: description,
            progress: percent(current, total_steps),
            status: if success { ProgressStatus::Completed } else { ProgressStatus::Failed },
            message: step_result.error.clone(),
            timestamp: Utc::now(),
        },
    );

    step_result
}

struct StepOutcome {
    tool_result: Option<deepsearch_types::ToolResult>,
    error: Option<String>,
    retries: u32,
}

async fn run_with_retries(
    registry: &ToolRegistry,
    config: &deepsearch_types::EngineConfig,
    ctx: &ToolContext,
    step: &ResearchStep,
) -> StepOutcome {
    let attempts = 1 + step.max_retries;
    let mut retries = 0;
    let mut last_error = None;
    for attempt in 0..attempts {
        let step_ctx = ctx.with_timeout(config.step_timeout.to_std());
        match registry.execute(&step_ctx, &step.tool, step.parameters.clone()).await {
            Ok(result) if result.success => {
                return StepOutcome { tool_result: Some(result), error: None, retries };
            }
            Ok(result) => {
                last_error = result.error.clone();
                last_error_or_default(&mut last_error);
            }
            Err(e) => {
                last_error = Some(e.to_string());
            }
        }
        if attempt + 1 < attempts {
            retries += 1;
            sleep(config.retry_delay.to_std()).await;
        }
        if ctx.is_cancelled() {
            break;
        }
    }
    StepOutcome { tool_result: None, error: last_error, retries }
}

fn last_error_or_default(error: &mut Option<String>) {
    if error.is_none() {
        *error = Some("tool reported failure".to_string());
    }
}

fn emit(progress: &Option<mpsc::Sender<ProgressEvent>>, event: ProgressEvent) {
    if let Some(tx) = progress {
        let _ = tx.try_send(event);
    }
}

fn percent(current: u32, total: u32) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (current as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

/// Group steps by priority into ascending tiers, preserving each tier's
/// declared (insertion) order.
fn group_into_tiers(steps: &[ResearchStep]) -> BTreeMap<u32, Vec<ResearchStep>> {
    let mut tiers: BTreeMap<u32, Vec<ResearchStep>> = BTreeMap::new();
    for step in steps {
        tiers.entry(step.priority).or_default().push(step.clone());
    }
    tiers
}

/// A tier is parallelizable iff no step in it depends on another step in
/// the same tier.
fn can_parallelize(tier: &[ResearchStep]) -> bool {
    let numbers: HashSet<u32> = tier.iter().map(|s| s.step_number).collect();
    !tier.iter().any(|s| s.depends_on.iter().any(|d| numbers.contains(d)))
}

/// Reject plans whose `depends_on` relation contains a cycle, per the
/// explicit topological validation recommended for implementations that
/// cannot trust the planner to only ever emit DAGs.
fn validate_no_cycles(steps: &[ResearchStep]) -> Result<(), OrchError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        Visiting,
        Done,
    }

    let by_number: std::collections::HashMap<u32, &ResearchStep> =
        steps.iter().map(|s| (s.step_number, s)).collect();
    let mut marks: std::collections::HashMap<u32, Mark> =
        steps.iter().map(|s| (s.step_number, Mark::Unvisited)).collect();

    fn visit(
        n: u32,
        by_number: &std::collections::HashMap<u32, &ResearchStep>,
        marks: &mut std::collections::HashMap<u32, Mark>,
        path: &mut Vec<u32>,
    ) -> Result<(), OrchError> {
        match marks.get(&n).copied() {
            Some(Mark::Done) | None => return Ok(()),
            Some(Mark::Visiting) => {
                path.push(n);
                return Err(OrchError::CyclicDependency(path.clone()));
            }
            Some(Mark::Unvisited) => {}
        }
        marks.insert(n, Mark::Visiting);
        path.push(n);
        if let Some(step) = by_number.get(&n) {
            for &dep in &step.depends_on {
                visit(dep, by_number, marks, path)?;
            }
        }
        path.pop();
        marks.insert(n, Mark::Done);
        Ok(())
    }

    for step in steps {
        let mut path = Vec::new();
        visit(step.step_number, &by_number, &mut marks, &mut path)?;
    }
    Ok(())
}

fn build_summary(
    findings: &[deepsearch_types::Finding],
    sources: &[deepsearch_types::Source],
    successful_steps: u32,
    failed_steps: u32,
) -> String {
    if findings.is_empty() && sources.is_empty() {
        return "No findings were collected.".to_string();
    }
    let mut histogram: BTreeMap<String, usize> = BTreeMap::new();
    for source in sources {
        *histogram.entry(source.kind.clone()).or_insert(0) += 1;
    }
    let histogram_str = histogram
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join(", ");

    let top: Vec<String> = findings
        .iter()
        .take(5)
        .map(|f| format!("- {}", f.content))
        .collect();

    format!(
        "Completed {} step(s) successfully, {} failed. Top findings:\n{}\nSources by type: {}",
        successful_steps,
        failed_steps,
        top.join("\n"),
        histogram_str,
    )
}

fn empty_result(query: &Query, research_type: ResearchType) -> ResearchResult {
    ResearchResult {
        query: query.clone(),
        summary: "No findings were collected.".to_string(),
        key_findings: Vec::new(),
        sources: Vec::new(),
        steps: Vec::new(),
        confidence: 0.0,
        duration: DurationMs::ZERO,
        total_steps: 0,
        successful_steps: 0,
        failed_steps: 0,
        research_type,
        completion_time: Utc::now(),
    }
}
