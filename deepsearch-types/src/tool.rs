//! The tool contract consumed by the orchestrator via the registry.
//!
//! Tools are a capability set `{name, description, parameters, execute}`;
//! there is no class hierarchy and no open recursion. Parameter schemas
//! are data, not types.

use crate::model::Source;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// One parameter accepted by a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name.
    pub name: String,
    /// Parameter type, as a free-form tag (`"string"`, `"integer"`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Whether the caller must supply this parameter.
    pub required: bool,
    /// Default value used when the caller omits this parameter.
    pub default: Option<serde_json::Value>,
    /// Human-readable description.
    pub description: String,
}

/// A request-scoped context bundling a deadline and a cancellation
/// signal, threaded through every tool invocation.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Absolute instant by which the call must complete.
    pub deadline: Option<Instant>,
    /// Cooperative cancellation signal.
    pub cancellation: CancellationToken,
}

impl ToolContext {
    /// A context with no deadline, cancellable via the returned token's
    /// clones.
    pub fn new() -> Self {
        Self {
            deadline: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Derive a child context with a deadline `timeout` from now,
    /// inheriting the parent's cancellation signal (a child token linked
    /// to the parent so that cancelling the parent cancels the child).
    pub fn with_timeout(&self, timeout: std::time::Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancellation: self.cancellation.child_token(),
        }
    }

    /// Whether the context has already been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The outcome of a single tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool considers the call successful.
    pub success: bool,
    /// Opaque tool output.
    pub data: Option<serde_json::Value>,
    /// Sources the tool discovered while executing.
    #[serde(default)]
    pub sources: Vec<Source>,
    /// Human-readable error, populated when `success` is false.
    pub error: Option<String>,
    /// Arbitrary tool-specific metadata.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ToolResult {
    /// Build a successful result with no sources or metadata.
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            sources: Vec::new(),
            error: None,
            metadata: HashMap::new(),
        }
    }

    /// Build a failed result carrying a human-readable message.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            sources: Vec::new(),
            error: Some(error.into()),
            metadata: HashMap::new(),
        }
    }
}

/// Errors surfaced directly by a tool call, before registry normalization.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The call's deadline elapsed before the tool finished.
    #[error("tool call timed out")]
    Timeout,
    /// The call was cancelled via the context's cancellation token.
    #[error("tool call cancelled")]
    Cancelled,
    /// The tool rejected its input parameters.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The tool failed for a reason of its own.
    #[error("execution failed: {0}")]
    ExecutionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Any other tool error.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// A uniquely named, pluggable unit of work invoked by the orchestrator.
///
/// Object-safe: stored behind `Arc<dyn Tool>` in the registry so tools can
/// be swapped or added without altering scheduling logic.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique, non-empty name this tool is registered under.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// The parameters this tool accepts.
    fn parameters(&self) -> &[ParameterSchema];

    /// Execute the tool. Must honor `ctx`'s deadline and cancellation
    /// signal; must not mutate research memory directly (sources flow
    /// back through the returned `ToolResult`).
    async fn execute(
        &self,
        ctx: &ToolContext,
        params: HashMap<String, serde_json::Value>,
    ) -> Result<ToolResult, ToolError>;
}
