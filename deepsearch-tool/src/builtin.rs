//! Illustrative built-in tools.
//!
//! The tools' internal logic (actual web search, PDF parsing, and so on)
//! is explicitly out of scope: these are deterministic stand-ins that
//! honor the [`Tool`] contract so the planner and orchestrator have
//! something real to dispatch to in tests and the CLI demo.

use async_trait::async_trait;
use chrono::Utc;
use deepsearch_types::tool::{ParameterSchema, ToolError};
use deepsearch_types::{Source, Tool, ToolContext, ToolResult};
use serde_json::json;
use std::collections::HashMap;

fn query_param() -> ParameterSchema {
    ParameterSchema {
        name: "query".to_string(),
        kind: "string".to_string(),
        required: true,
        default: None,
        description: "The research query or document-analysis question".to_string(),
    }
}

fn max_results_param() -> ParameterSchema {
    ParameterSchema {
        name: "max_results".to_string(),
        kind: "integer".to_string(),
        required: false,
        default: Some(json!(5)),
        description: "Upper bound on results returned".to_string(),
    }
}

fn text_param(name: &str, desc: &str, params: &HashMap<String, serde_json::Value>) -> String {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .unwrap_or_else(|| desc.to_string())
}

/// Stand-in for a web search engine.
pub struct WebSearchTool {
    params: Vec<ParameterSchema>,
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self {
            params: vec![query_param(), max_results_param()],
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }
    fn description(&self) -> &str {
        "Searches the web for pages relevant to a query"
    }
    fn parameters(&self) -> &[ParameterSchema] {
        &self.params
    }
    async fn execute(
        &self,
        _ctx: &ToolContext,
        params: HashMap<String, serde_json::Value>,
    ) -> Result<ToolResult, ToolError> {
        let query = text_param("query", "", &params);
        if query.is_empty() {
            return Err(ToolError::InvalidInput("query must not be empty".into()));
        }
        let now = Utc::now();
        let source = Source {
            id: String::new(),
            kind: "web".to_string(),
            title: Some(format!("Web results for {query}")),
            url: Some(format!("https://example.com/search?q={query}")),
            file_path: None,
            author: None,
            publisher: None,
            publish_date: None,
            access_date: Some(now),
            content: Some(format!("Web search summary for '{query}'.")),
            excerpt: Some(format!("Summary for '{query}'.")),
            page_number: None,
            relevance: 0.8,
            timestamp: now,
            metadata: HashMap::new(),
        };
        Ok(ToolResult {
            success: true,
            data: Some(json!({"query": query})),
            sources: vec![source],
            error: None,
            metadata: HashMap::new(),
        })
    }
}

/// Stand-in for a Wikipedia search.
pub struct WikipediaTool {
    params: Vec<ParameterSchema>,
}

impl Default for WikipediaTool {
    fn default() -> Self {
        Self {
            params: vec![query_param(), max_results_param()],
        }
    }
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }
    fn description(&self) -> &str {
        "Searches Wikipedia for articles relevant to a query"
    }
    fn parameters(&self) -> &[ParameterSchema] {
        &self.params
    }
    async fn execute(
        &self,
        _ctx: &ToolContext,
        params: HashMap<String, serde_json::Value>,
    ) -> Result<ToolResult, ToolError> {
        let query = text_param("query", "", &params);
        if query.is_empty() {
            return Err(ToolError::InvalidInput("query must not be empty".into()));
        }
        let now = Utc::now();
        let source = Source {
            id: String::new(),
            kind: "wikipedia".to_string(),
            title: Some(query.clone()),
            url: Some(format!(
                "https://en.wikipedia.org/wiki/{}",
                query.replace(' ', "_")
            )),
            file_path: None,
            author: None,
            publisher: Some("Wikipedia".to_string()),
            publish_date: None,
            access_date: Some(now),
            content: Some(format!("Wikipedia article body for '{query}'.")),
            excerpt: Some(format!("Article summary for '{query}'.")),
            page_number: None,
            relevance: 0.7,
            timestamp: now,
            metadata: HashMap::new(),
        };
        Ok(ToolResult {
            success: true,
            data: Some(json!({"query": query})),
            sources: vec![source],
            error: None,
            metadata: HashMap::new(),
        })
    }
}

fn document_tool(name: &'static str, kind: &'static str, description: &'static str) -> DocumentTool {
    DocumentTool {
        name,
        kind,
        description,
        params: vec![
            ParameterSchema {
                name: "file_path".to_string(),
                kind: "string".to_string(),
                required: true,
                default: None,
                description: "Path to the document to analyze".to_string(),
            },
            query_param(),
        ],
    }
}

/// Stand-in for a document-analysis tool, parameterized by document kind
/// (`pdf_processor`, `docx_processor`).
pub struct DocumentTool {
    name: &'static str,
    kind: &'static str,
    description: &'static str,
    params: Vec<ParameterSchema>,
}

/// Build the `pdf_processor` tool.
pub fn pdf_processor() -> DocumentTool {
    document_tool("pdf_processor", "pdf", "Extracts and analyzes content from PDF documents")
}

/// Build the `docx_processor` tool.
pub fn docx_processor() -> DocumentTool {
    document_tool(
        "docx_processor",
        "docx",
        "Extracts and analyzes content from Word documents",
    )
}

#[async_trait]
impl Tool for DocumentTool {
    fn name(&self) -> &str {
        self.name
    }
    fn description(&self) -> &str {
        self.description
    }
    fn parameters(&self) -> &[ParameterSchema] {
        &self.params
    }
    async fn execute(
        &self,
        _ctx: &ToolContext,
        params: HashMap<String, serde_json::Value>,
    ) -> Result<ToolResult, ToolError> {
        let file_path = text_param("file_path", "", &params);
        if file_path.is_empty() {
            return Err(ToolError::InvalidInput("file_path must not be empty".into()));
        }
        let now = Utc::now();
        let source = Source {
            id: String::new(),
            kind: self.kind.to_string(),
            title: Some(file_path.clone()),
            url: None,
            file_path: Some(file_path.clone()),
            author: None,
            publisher: None,
            publish_date: None,
            access_date: Some(now),
            content: Some(format!("Extracted content of {file_path}.")),
            excerpt: Some(format!("Excerpt of {file_path}.")),
            page_number: Some(1),
            relevance: 0.9,
            timestamp: now,
            metadata: HashMap::new(),
        };
        Ok(ToolResult {
            success: true,
            data: Some(json!({"file_path": file_path})),
            sources: vec![source],
            error: None,
            metadata: HashMap::new(),
        })
    }
}

/// Stand-in for an LLM-backed summarizer. Per the core's non-goals, the
/// core never synthesizes text itself; a real implementation would call
/// out to a language model here.
pub struct SummarizerTool {
    params: Vec<ParameterSchema>,
}

impl Default for SummarizerTool {
    fn default() -> Self {
        Self {
            params: vec![ParameterSchema {
                name: "content".to_string(),
                kind: "string".to_string(),
                required: true,
                default: None,
                description: "Text to summarize".to_string(),
            }],
        }
    }
}

#[async_trait]
impl Tool for SummarizerTool {
    fn name(&self) -> &str {
        "summarizer"
    }
    fn description(&self) -> &str {
        "Produces a condensed summary of supplied text"
    }
    fn parameters(&self) -> &[ParameterSchema] {
        &self.params
    }
    async fn execute(
        &self,
        _ctx: &ToolContext,
        params: HashMap<String, serde_json::Value>,
    ) -> Result<ToolResult, ToolError> {
        let content = text_param("content", "", &params);
        Ok(ToolResult::ok(json!({
            "summary": content.chars().take(200).collect::<String>(),
        })))
    }
}

/// Stand-in for an LLM-backed fact checker.
pub struct FactCheckerTool {
    params: Vec<ParameterSchema>,
}

impl Default for FactCheckerTool {
    fn default() -> Self {
        Self {
            params: vec![ParameterSchema {
                name: "claim".to_string(),
                kind: "string".to_string(),
                required: true,
                default: None,
                description: "The claim to verify".to_string(),
            }],
        }
    }
}

#[async_trait]
impl Tool for FactCheckerTool {
    fn name(&self) -> &str {
        "fact_checker"
    }
    fn description(&self) -> &str {
        "Assesses the plausibility of a claim against known sources"
    }
    fn parameters(&self) -> &[ParameterSchema] {
        &self.params
    }
    async fn execute(
        &self,
        _ctx: &ToolContext,
        params: HashMap<String, serde_json::Value>,
    ) -> Result<ToolResult, ToolError> {
        let claim = text_param("claim", "", &params);
        Ok(ToolResult::ok(json!({"claim": claim, "verdict": "unverified"})))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn web_search_rejects_empty_query() {
        let tool = WebSearchTool::default();
        let ctx = ToolContext::new();
        let err = tool.execute(&ctx, HashMap::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn pdf_processor_returns_one_source() {
        let tool = pdf_processor();
        let ctx = ToolContext::new();
        let mut params = HashMap::new();
        params.insert("file_path".to_string(), json!("report.pdf"));
        let result = tool.execute(&ctx, params).await.unwrap();
        assert!(result.success);
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].kind, "pdf");
    }

    #[tokio::test]
    async fn docx_processor_tags_docx_kind() {
        let tool = docx_processor();
        let ctx = ToolContext::new();
        let mut params = HashMap::new();
        params.insert("file_path".to_string(), json!("notes.docx"));
        let result = tool.execute(&ctx, params).await.unwrap();
        assert_eq!(result.sources[0].kind, "docx");
    }
}
