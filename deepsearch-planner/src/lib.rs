#![deny(missing_docs)]
//! Planner: classifies a [`Query`] and synthesizes an ordered,
//! priority-grouped [`ResearchPlan`] of tool calls.

use deepsearch_tool::ToolRegistry;
use deepsearch_types::{Depth, DurationMs, EngineConfig, Query, ResearchPlan, ResearchStep, ResearchType};
use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;

const ACADEMIC_KEYWORDS: &[&str] = &[
    "research",
    "study",
    "paper",
    "academic",
    "scientific",
    "analysis",
    "experiment",
];

/// Errors from plan synthesis.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PlanError {
    /// Catch-all for unexpected planning failures.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Derives an ordered, priority-grouped plan of tool calls from a query
/// and the tools currently available in a [`ToolRegistry`].
pub struct Planner;

impl Planner {
    /// Classify a query's `research_type`. Matching against the academic
    /// keyword list is a lowercase substring match.
    pub fn classify(query: &Query) -> ResearchType {
        let has_documents = !query.documents.is_empty();
        let uses_sources = query.use_web || query.use_wiki;
        if has_documents && uses_sources {
            return ResearchType::Multi;
        }
        if has_documents {
            return ResearchType::Document;
        }
        let lowered = query.text.to_lowercase();
        if ACADEMIC_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            return ResearchType::Academic;
        }
        ResearchType::General
    }

    /// Build a plan for `query` given the tools currently registered in
    /// `registry`, bounded by `config`.
    pub async fn plan(
        query: &Query,
        registry: &ToolRegistry,
        config: &EngineConfig,
    ) -> Result<ResearchPlan, PlanError> {
        let research_type = Self::classify(query);
        let mut steps = Vec::new();
        let mut next_step = 1u32;
        let max_results = query.depth.max_results_hint();

        let document_tool_for = |path: &str| -> &'static str {
            let lower = path.to_lowercase();
            if lower.ends_with(".docx") || lower.ends_with(".doc") {
                "docx_processor"
            } else {
                "pdf_processor"
            }
        };

        let push_document_steps = |steps: &mut Vec<ResearchStep>, next_step: &mut u32, priority: u32| {
            for doc in &query.documents {
                let tool = document_tool_for(doc);
                steps.push(ResearchStep {
                    step_number: *next_step,
                    tool: tool.to_string(),
                    action: "analyze_document".to_string(),
                    parameters: params(&[
                        ("query", json!(query.text)),
                        ("file_path", json!(doc)),
                        ("max_results", json!(max_results)),
                    ]),
                    reasoning: format!("Analyze attached document {doc}"),
                    depends_on: vec![],
                    priority,
                    max_retries: 2,
                });
                *next_step += 1;
            }
        };

        let push_web_step = |steps: &mut Vec<ResearchStep>, next_step: &mut u32, priority: u32| {
            if !query.use_web {
                return;
            }
            steps.push(ResearchStep {
                step_number: *next_step,
                tool: "web_search".to_string(),
                action: "search".to_string(),
                parameters: params(&[("query", json!(query.text)), ("max_results", json!(max_results))]),
                reasoning: "Search the web for relevant sources".to_string(),
                depends_on: vec![],
                priority,
                max_retries: config.retry_attempts,
            });
            *next_step += 1;
        };

        let push_wiki_step = |steps: &mut Vec<ResearchStep>, next_step: &mut u32, priority: u32| {
            if !query.use_wiki {
                return;
            }
            steps.push(ResearchStep {
                step_number: *next_step,
                tool: "wikipedia".to_string(),
                action: "search".to_string(),
                parameters: params(&[("query", json!(query.text)), ("max_results", json!(max_results))]),
                reasoning: "Search Wikipedia for background context".to_string(),
                depends_on: vec![],
                priority,
                max_retries: config.retry_attempts,
            });
            *next_step += 1;
        };

        match research_type {
            ResearchType::Document => {
                push_document_steps(&mut steps, &mut next_step, 1);
            }
            ResearchType::Academic => {
                push_wiki_step(&mut steps, &mut next_step, 1);
                push_web_step(&mut steps, &mut next_step, 1);
            }
            ResearchType::General => {
                push_web_step(&mut steps, &mut next_step, 1);
                push_wiki_step(&mut steps, &mut next_step, 2);
            }
            ResearchType::Multi => {
                push_document_steps(&mut steps, &mut next_step, 1);
                push_web_step(&mut steps, &mut next_step, 2);
                push_wiki_step(&mut steps, &mut next_step, 2);
            }
        }

        if query.depth == Depth::Deep && query.use_web {
            steps.push(ResearchStep {
                step_number: next_step,
                tool: "web_search".to_string(),
                action: "refine_search".to_string(),
                parameters: params(&[
                    ("query", json!(query.text)),
                    ("max_results", json!(max_results)),
                ]),
                reasoning: "Refine the initial web search with a deeper pass".to_string(),
                depends_on: vec![1],
                priority: 3,
                max_retries: config.retry_attempts,
            });
        }

        // Drop steps whose tool is not actually registered; scheduling
        // must only reference tools the orchestrator can reach.
        let mut available = Vec::with_capacity(steps.len());
        for step in steps {
            if registry.get(&step.tool).await.is_ok() {
                available.push(step);
            }
        }
        let mut steps = available;

        let effective_max = if query.max_steps == 0 {
            config.max_steps
        } else {
            query.max_steps.min(config.max_steps)
        };
        steps.truncate(effective_max as usize);

        let estimated_time = steps
            .iter()
            .map(|s| nominal_cost(&s.tool))
            .fold(DurationMs::ZERO, DurationMs::saturating_add)
            .saturating_add(DurationMs::from_secs(5));

        let strategy = strategy_string(research_type, query.depth, steps.len());

        Ok(ResearchPlan {
            query: query.clone(),
            steps,
            estimated_time,
            research_type,
            strategy,
        })
    }
}

fn params(pairs: &[(&str, serde_json::Value)]) -> HashMap<String, serde_json::Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn nominal_cost(tool: &str) -> DurationMs {
    match tool {
        "pdf_processor" | "docx_processor" => DurationMs::from_secs(15),
        "web_search" => DurationMs::from_secs(8),
        "wikipedia" => DurationMs::from_secs(5),
        _ => DurationMs::from_secs(10),
    }
}

fn strategy_string(research_type: ResearchType, depth: Depth, step_count: usize) -> String {
    let type_desc = match research_type {
        ResearchType::General => "a general web and encyclopedic search",
        ResearchType::Academic => "an academic-leaning search across Wikipedia and the web",
        ResearchType::Document => "analysis of the attached documents",
        ResearchType::Multi => "document analysis followed by web and Wikipedia corroboration",
    };
    let depth_desc = match depth {
        Depth::Shallow => "a shallow pass",
        Depth::Medium => "a standard pass",
        Depth::Deep => "a deep pass with an additional refinement step",
    };
    format!("Plan performs {type_desc} using {depth_desc} ({step_count} step(s)).")
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepsearch_tool::builtin::{docx_processor, pdf_processor, WebSearchTool, WikipediaTool};
    use std::sync::Arc;
    use std::time::Duration;

    async fn registry_with_all_tools() -> ToolRegistry {
        let reg = ToolRegistry::new(Duration::from_secs(1));
        reg.register(Arc::new(WebSearchTool::default())).await.unwrap();
        reg.register(Arc::new(WikipediaTool::default())).await.unwrap();
        reg.register(Arc::new(pdf_processor())).await.unwrap();
        reg.register(Arc::new(docx_processor())).await.unwrap();
        reg
    }

    fn base_query(text: &str) -> Query {
        Query {
            text: text.to_string(),
            depth: Depth::Shallow,
            documents: vec![],
            use_web: false,
            use_wiki: false,
            max_steps: 0,
        }
    }

    #[tokio::test]
    async fn scenario_general_web_and_wiki_shallow() {
        let reg = registry_with_all_tools().await;
        let mut query = base_query("golang channels");
        query.use_web = true;
        query.use_wiki = true;
        let plan = Planner::plan(&query, &reg, &EngineConfig::default()).await.unwrap();

        assert_eq!(plan.research_type, ResearchType::General);
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].tool, "web_search");
        assert_eq!(plan.steps[0].priority, 1);
        assert_eq!(plan.steps[1].tool, "wikipedia");
        assert_eq!(plan.steps[1].priority, 2);
    }

    #[tokio::test]
    async fn scenario_multi_source_medium() {
        let reg = registry_with_all_tools().await;
        let mut query = base_query("AI trends");
        query.depth = Depth::Medium;
        query.documents = vec!["report.pdf".to_string()];
        query.use_web = true;
        query.use_wiki = true;
        let plan = Planner::plan(&query, &reg, &EngineConfig::default()).await.unwrap();

        assert_eq!(plan.research_type, ResearchType::Multi);
        assert_eq!(plan.steps.len(), 3);
        assert_eq!(plan.steps[0].tool, "pdf_processor");
        assert_eq!(plan.steps[0].priority, 1);
        assert_eq!(plan.steps[1].priority, 2);
        assert_eq!(plan.steps[2].priority, 2);
    }

    #[tokio::test]
    async fn scenario_document_only_shallow() {
        let reg = registry_with_all_tools().await;
        let mut query = base_query("summarize");
        query.documents = vec!["report.pdf".to_string(), "notes.docx".to_string()];
        let plan = Planner::plan(&query, &reg, &EngineConfig::default()).await.unwrap();

        assert_eq!(plan.steps.len(), 2);
        assert!(plan.steps.iter().all(|s| s.priority == 1));
        assert_eq!(plan.steps[0].tool, "pdf_processor");
        assert_eq!(plan.steps[1].tool, "docx_processor");
    }

    #[tokio::test]
    async fn scenario_deep_refinement() {
        let reg = registry_with_all_tools().await;
        let mut query = base_query("quantum computing");
        query.depth = Depth::Deep;
        query.use_web = true;
        let plan = Planner::plan(&query, &reg, &EngineConfig::default()).await.unwrap();

        let last = plan.steps.last().unwrap();
        assert_eq!(last.priority, 3);
        assert_eq!(last.depends_on, vec![1]);
        assert_eq!(last.tool, "web_search");
    }

    #[tokio::test]
    async fn truncates_to_configured_max_steps() {
        let reg = registry_with_all_tools().await;
        let mut query = base_query("AI trends");
        query.documents = vec!["a.pdf".into(), "b.pdf".into(), "c.pdf".into()];
        query.max_steps = 2;
        let plan = Planner::plan(&query, &reg, &EngineConfig::default()).await.unwrap();
        assert_eq!(plan.steps.len(), 2);
    }

    #[tokio::test]
    async fn zero_max_steps_uses_config_default() {
        let reg = registry_with_all_tools().await;
        let mut query = base_query("topic");
        query.use_web = true;
        query.max_steps = 0;
        let mut config = EngineConfig::default();
        config.max_steps = 1;
        let plan = Planner::plan(&query, &reg, &config).await.unwrap();
        assert_eq!(plan.steps.len(), 1);
    }

    #[tokio::test]
    async fn unavailable_tools_are_skipped_rather_than_erroring() {
        let reg = ToolRegistry::new(Duration::from_secs(1)); // no tools registered
        let mut query = base_query("golang channels");
        query.use_web = true;
        query.use_wiki = true;
        let plan = Planner::plan(&query, &reg, &EngineConfig::default()).await.unwrap();
        assert!(plan.steps.is_empty());
    }

    #[test]
    fn classification_matches_keyword_table() {
        assert_eq!(
            Planner::classify(&base_query("a scientific analysis of bees")),
            ResearchType::Academic
        );
        assert_eq!(Planner::classify(&base_query("what is rust")), ResearchType::General);
    }
}
