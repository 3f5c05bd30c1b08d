//! Engine-wide configuration recognized by the Planner, Orchestrator, and
//! Job Queue.

use crate::duration::DurationMs;
use serde::{Deserialize, Serialize};

/// Recognized configuration options for a research engine instance.
///
/// Every field has a sensible default so a caller may override only the
/// knobs it cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on plan length.
    pub max_steps: u32,
    /// Overall session deadline.
    pub timeout: DurationMs,
    /// Per-step deadline.
    pub step_timeout: DurationMs,
    /// Default retries when a step does not override `max_retries`.
    pub retry_attempts: u32,
    /// Constant delay between retry attempts.
    pub retry_delay: DurationMs,
    /// Parallelism within a tier.
    pub concurrent_tools: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: 10,
            timeout: DurationMs::from_secs(300),
            step_timeout: DurationMs::from_secs(30),
            retry_attempts: 2,
            retry_delay: DurationMs::from_millis(500),
            concurrent_tools: 3,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// any field the file omits.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}
