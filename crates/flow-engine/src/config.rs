//! Configuration types for the run engine

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sort::SortPolicy;

/// Default values for engine configuration
pub mod defaults {
    /// No pacing between node steps
    pub const STEP_DELAY_MS: u64 = 0;
}

/// Engine settings applied to every run of a `WorkflowRunner`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pause between two node steps, for UI pacing
    pub step_delay_ms: u64,
    /// How to order a graph that cannot be fully sorted
    pub sort_policy: SortPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_delay_ms: defaults::STEP_DELAY_MS,
            sort_policy: SortPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_sort_policy(mut self, policy: SortPolicy) -> Self {
        self.sort_policy = policy;
        self
    }

    /// Step delay as a `Duration`, `None` when pacing is off
    pub fn step_delay(&self) -> Option<Duration> {
        (self.step_delay_ms > 0).then(|| Duration::from_millis(self.step_delay_ms))
    }
}
