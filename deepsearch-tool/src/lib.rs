#![deny(missing_docs)]
//! Tool registry: a type-erased, thread-safe catalog of pluggable tools
//! invoked by name.
//!
//! Dispatch without inheritance: tools are a capability set
//! `{name, description, parameters, execute}`; the registry is a name →
//! capability mapping. No class hierarchy, no open recursion. Parameter
//! schemas are data, not types.

pub mod builtin;

use deepsearch_types::tool::{ParameterSchema, ToolError};
use deepsearch_types::{Tool, ToolContext, ToolResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from registry operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A tool with this name is already registered.
    #[error("tool already registered: {0}")]
    AlreadyRegistered(String),
    /// The given tool name is empty.
    #[error("invalid tool name: must be non-empty")]
    InvalidName,
    /// No tool is registered under this name.
    #[error("tool not found: {0}")]
    NotFound(String),
    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// A name/description/schema snapshot of a registered tool, safe to hand
/// to callers that should not receive an executable handle.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// Tool parameter schema.
    pub parameters: Vec<ParameterSchema>,
}

/// Maintains a mapping from tool name to tool instance.
///
/// All operations are safe under concurrent readers and concurrent
/// writers; registration writes under an exclusive lock, lookups under a
/// shared lock.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
    call_timeout: Duration,
}

impl ToolRegistry {
    /// Create an empty registry with the given per-call timeout.
    pub fn new(call_timeout: Duration) -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
            call_timeout,
        }
    }

    /// Register a tool. Fails with [`RegistryError::AlreadyRegistered`] if
    /// the name is taken, or [`RegistryError::InvalidName`] if the name
    /// is empty.
    pub async fn register(&self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if name.is_empty() {
            return Err(RegistryError::InvalidName);
        }
        let mut tools = self.tools.write().await;
        if tools.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        tools.insert(name, tool);
        Ok(())
    }

    /// Look up a tool by name.
    pub async fn get(&self, name: &str) -> Result<Arc<dyn Tool>, RegistryError> {
        self.tools
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Snapshot of every registered tool's name/description/schema.
    pub async fn list(&self) -> Vec<ToolInfo> {
        self.tools
            .read()
            .await
            .values()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters().to_vec(),
            })
            .collect()
    }

    /// Snapshot of every registered tool's name.
    pub async fn list_names(&self) -> Vec<String> {
        self.tools.read().await.keys().cloned().collect()
    }

    /// Snapshot info for a single tool, without an executable handle.
    pub async fn get_info(&self, name: &str) -> Option<ToolInfo> {
        self.tools.read().await.get(name).map(|t| ToolInfo {
            name: t.name().to_string(),
            description: t.description().to_string(),
            parameters: t.parameters().to_vec(),
        })
    }

    /// Wraps `ctx` with the registry's configured per-call timeout,
    /// invokes the tool, and normalizes outcomes: tool errors become
    /// `ToolResult{success=false, error=<string>}` rather than
    /// propagating, so callers always get a result to record.
    ///
    /// The call is raced against both the derived deadline (via
    /// `tokio::time::timeout_at`, yielding `ToolError::Timeout`) and the
    /// context's cancellation signal, whichever fires first.
    pub async fn execute(
        &self,
        ctx: &ToolContext,
        name: &str,
        params: HashMap<String, serde_json::Value>,
    ) -> Result<ToolResult, RegistryError> {
        let tool = self.get(name).await?;
        let call_ctx = ctx.with_timeout(self.call_timeout);
        let deadline = call_ctx.deadline.map(tokio::time::Instant::from_std);

        let call = async {
            match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, tool.execute(&call_ctx, params)).await {
                    Ok(outcome) => outcome,
                    Err(_elapsed) => Err(ToolError::Timeout),
                },
                None => tool.execute(&call_ctx, params).await,
            }
        };

        let result = tokio::select! {
            biased;
            _ = call_ctx.cancellation.cancelled() => {
                Ok(ToolResult::failed("tool call cancelled"))
            }
            outcome = call => {
                Ok(match outcome {
                    Ok(r) => r,
                    Err(e) => ToolResult::failed(e.to_string()),
                })
            }
        };
        result
    }
}
