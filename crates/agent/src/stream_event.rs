//! Agent-level run events.
//!
//! `AgentStreamEvent` reports what the loop is doing so a front end can
//! render progress while a run is in flight.

use codicode_core::RunStatus;
use serde::{Deserialize, Serialize};

/// Events emitted by the orchestrator during a run.
///
/// - `step_started`      — a new iteration began
/// - `chunk`             — text from the gateway (a fragment, or the whole reply)
/// - `tool_call`         — the agent is invoking a tool
/// - `tool_result`       — tool execution completed
/// - `protocol_warning`  — a tool-call payload could not be used
/// - `done`              — the run reached a terminal status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    StepStarted { step: u32, max_steps: u32 },

    /// Text from the gateway.
    Chunk { content: String },

    /// The agent is calling a tool.
    ToolCall {
        id: String,
        name: String,
        arguments: serde_json::Map<String, serde_json::Value>,
    },

    /// Tool execution completed.
    ToolResult {
        id: String,
        name: String,
        success: bool,
        output: String,
    },

    ProtocolWarning { reason: String },

    /// The run is over.
    Done {
        status: RunStatus,
        step_count: u32,
        tool_error_count: u32,
    },
}

impl AgentStreamEvent {
    /// Stable name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StepStarted { .. } => "step_started",
            Self::Chunk { .. } => "chunk",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::ProtocolWarning { .. } => "protocol_warning",
            Self::Done { .. } => "done",
        }
    }
}
