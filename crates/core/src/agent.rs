//! Run-state types shared between the agent loop and its callers.

use serde::{Deserialize, Serialize};

use crate::message::Conversation;

/// Where a run currently stands.
///
/// `Idle` and `Running` are transient; every other variant is terminal and a
/// run reaches at most one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    /// A completion phrase matched.
    Completed,
    /// Too many failed tool dispatches.
    AbortedErrors,
    /// `max_steps` iterations passed without a completion signal.
    AbortedStepLimit,
    /// The model answered without a tool call or a completion phrase, so
    /// there was nothing left to act on.
    Replied,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Idle | RunStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::AbortedErrors => "aborted_errors",
            RunStatus::AbortedStepLimit => "aborted_step_limit",
            RunStatus::Replied => "replied",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of a run's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunCounters {
    pub step_count: u32,
    pub tool_error_count: u32,
    pub is_complete: bool,
}

/// The mutable state of exactly one run, owned by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct AgentRunState {
    pub step_count: u32,
    pub tool_error_count: u32,
    pub is_complete: bool,
    pub status: RunStatus,
    pub conversation: Conversation,
}

impl AgentRunState {
    /// Start a fresh run for `task`.
    pub fn start(&mut self, task: impl Into<String>) {
        self.step_count = 0;
        self.tool_error_count = 0;
        self.is_complete = false;
        self.status = RunStatus::Running;
        self.conversation.seed(task);
    }

    /// Move to a terminal status. Later calls are ignored.
    pub fn finish(&mut self, status: RunStatus) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        self.is_complete = status == RunStatus::Completed;
    }

    pub fn counters(&self) -> RunCounters {
        RunCounters {
            step_count: self.step_count,
            tool_error_count: self.tool_error_count,
            is_complete: self.is_complete,
        }
    }

    /// Back to `Idle` with an empty conversation.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// What `execute` hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    /// The model's own text, or one of the fixed abort messages.
    pub result: String,
    pub step_count: u32,
    pub tool_error_count: u32,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }
}
