//! Integration coverage for `ToolRegistry` against tools defined outside
//! the crate, exercising the same surface external callers would.

use async_trait::async_trait;
use deepsearch_tool::{RegistryError, ToolRegistry};
use deepsearch_types::tool::{ParameterSchema, ToolError};
use deepsearch_types::{Tool, ToolContext, ToolResult};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

struct SlowTool {
    delay: Duration,
}

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }
    fn description(&self) -> &str {
        "Sleeps for a fixed delay before returning"
    }
    fn parameters(&self) -> &[ParameterSchema] {
        &[]
    }
    async fn execute(
        &self,
        _ctx: &ToolContext,
        _params: HashMap<String, serde_json::Value>,
    ) -> Result<ToolResult, ToolError> {
        tokio::time::sleep(self.delay).await;
        Ok(ToolResult::ok(json!("done")))
    }
}

#[tokio::test]
async fn a_tool_slower_than_the_call_timeout_fails_with_timeout() {
    let registry = ToolRegistry::new(Duration::from_millis(20));
    registry
        .register(Arc::new(SlowTool { delay: Duration::from_secs(5) }))
        .await
        .unwrap();

    let ctx = ToolContext::new();
    let result = registry.execute(&ctx, "slow", HashMap::new()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some(ToolError::Timeout.to_string().as_str()));
}

#[tokio::test]
async fn a_tool_faster_than_the_call_timeout_succeeds() {
    let registry = ToolRegistry::new(Duration::from_secs(5));
    registry
        .register(Arc::new(SlowTool { delay: Duration::from_millis(5) }))
        .await
        .unwrap();

    let ctx = ToolContext::new();
    let result = registry.execute(&ctx, "slow", HashMap::new()).await.unwrap();

    assert!(result.success);
}

#[tokio::test]
async fn cancellation_wins_over_a_hanging_tool() {
    let registry = ToolRegistry::new(Duration::from_secs(30));
    registry
        .register(Arc::new(SlowTool { delay: Duration::from_secs(30) }))
        .await
        .unwrap();

    let ctx = ToolContext::new();
    ctx.cancellation.cancel();
    let result = registry.execute(&ctx, "slow", HashMap::new()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("tool call cancelled"));
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let registry = ToolRegistry::new(Duration::from_secs(1));
    registry
        .register(Arc::new(SlowTool { delay: Duration::from_millis(1) }))
        .await
        .unwrap();
    let err = registry
        .register(Arc::new(SlowTool { delay: Duration::from_millis(1) }))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyRegistered(_)));
}
