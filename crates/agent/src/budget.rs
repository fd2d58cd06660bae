//! Step and tool-error budgets.

use codicode_config::AgentConfig;
use codicode_core::RunCounters;
use serde::{Deserialize, Serialize};

/// Ceilings on one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub max_steps: u32,
    pub max_tool_errors: u32,
}

/// Outcome of a budget check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetVerdict {
    Continue,
    TooManyErrors,
    StepLimitReached,
}

impl Budget {
    pub fn new(max_steps: u32, max_tool_errors: u32) -> Self {
        Self {
            max_steps,
            max_tool_errors,
        }
    }

    /// Run before every iteration, ahead of the gateway call.
    ///
    /// The error ceiling is checked first, so when both trip at the same
    /// boundary the run is reported as aborted on errors.
    pub fn check(&self, counters: &RunCounters) -> BudgetVerdict {
        if counters.tool_error_count >= self.max_tool_errors {
            BudgetVerdict::TooManyErrors
        } else if counters.step_count >= self.max_steps {
            BudgetVerdict::StepLimitReached
        } else {
            BudgetVerdict::Continue
        }
    }

    pub fn errors_message(&self, tool_error_count: u32) -> String {
        format!(
            "Task aborted: Too many tool errors ({tool_error_count}/{})",
            self.max_tool_errors
        )
    }

    pub fn step_limit_message(&self) -> String {
        format!(
            "Task incomplete: Reached maximum step limit ({})",
            self.max_steps
        )
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::from(&AgentConfig::default())
    }
}

impl From<&AgentConfig> for Budget {
    fn from(config: &AgentConfig) -> Self {
        Self::new(config.max_steps, config.max_tool_errors)
    }
}
