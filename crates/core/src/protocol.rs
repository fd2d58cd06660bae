//! The embedded tool-call protocol.
//!
//! The model asks for a tool by writing a JSON payload between a fixed marker
//! pair somewhere in its free-text answer:
//!
//! ```text
//! I'll look at the sources first.
//! <tool_call>
//! {"tool": "list_directory", "arguments": {"path": "./src"}}
//! </tool_call>
//! ```
//!
//! The protocol is single-call-per-turn: only the first begin marker and the
//! end marker following it are honoured. Anything that cannot be read as a
//! call degrades to "no call" with a reason attached, never to an error.
//!
//! This module also renders the priming document that teaches the model the
//! format, so both halves of the protocol live side by side.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::tool::{ToolCall, ToolDescriptor};

/// Opening marker, case-sensitive.
pub const TOOL_CALL_OPEN: &str = "<tool_call>";

/// Closing marker, case-sensitive.
pub const TOOL_CALL_CLOSE: &str = "</tool_call>";

/// What the parser found in one response.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedToolCall {
    /// No begin marker: a plain answer.
    None,
    /// A well-formed call.
    Call(ToolCall),
    /// Markers were present but the payload could not be used.
    Malformed { reason: String },
}

impl ParsedToolCall {
    pub fn as_call(&self) -> Option<&ToolCall> {
        match self {
            ParsedToolCall::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn into_call(self) -> Option<ToolCall> {
        match self {
            ParsedToolCall::Call(call) => Some(call),
            _ => None,
        }
    }
}

/// Extracts at most one tool call from model text.
///
/// Kept behind a trait so a structured-output mechanism can replace the
/// marker format without touching the agent loop.
pub trait ToolCallParser: Send + Sync {
    fn parse(&self, text: &str) -> ParsedToolCall;
}

/// The `<tool_call>{json}</tool_call>` parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaggedJsonParser;

impl ToolCallParser for TaggedJsonParser {
    fn parse(&self, text: &str) -> ParsedToolCall {
        let Some(open) = text.find(TOOL_CALL_OPEN) else {
            return ParsedToolCall::None;
        };
        let body_start = open + TOOL_CALL_OPEN.len();
        let Some(close) = text[body_start..].find(TOOL_CALL_CLOSE) else {
            return malformed(format!("found {TOOL_CALL_OPEN} without a matching {TOOL_CALL_CLOSE}"));
        };
        let payload = text[body_start..body_start + close].trim();

        let document: Value = match serde_json::from_str(payload) {
            Ok(v) => v,
            Err(e) => return malformed(format!("payload is not valid JSON: {e}")),
        };
        let Some(object) = document.as_object() else {
            return malformed("payload is not a JSON object".to_string());
        };
        let Some(name) = object.get("tool").and_then(Value::as_str) else {
            return malformed("payload has no string \"tool\" field".to_string());
        };
        let arguments = match object.get("arguments") {
            None | Some(Value::Null) => serde_json::Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return malformed("\"arguments\" is not a JSON object".to_string()),
        };

        ParsedToolCall::Call(ToolCall {
            id: correlation_id(payload),
            name: name.to_string(),
            arguments,
        })
    }
}

fn malformed(reason: String) -> ParsedToolCall {
    ParsedToolCall::Malformed { reason }
}

/// Deterministic, advisory correlation id for a payload.
///
/// Truncated to 64 bits, so distinct payloads can collide; never use it as a
/// uniqueness key.
pub fn correlation_id(payload: &str) -> String {
    let digest = Sha256::digest(payload.as_bytes());
    let hex: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    format!("call_{hex}")
}

/// Render the system-level priming document for a set of tools.
pub fn render_tool_prompt(tools: &[ToolDescriptor]) -> String {
    let descriptions: Vec<String> = tools
        .iter()
        .map(|t| {
            let schema = serde_json::to_string_pretty(&t.parameters)
                .unwrap_or_else(|_| t.parameters.to_string());
            format!("- {}: {}\n  Parameters: {}", t.name, t.description, schema)
        })
        .collect();

    format!(
        "You are an autonomous coding agent with access to tools.\n\n\
         Available tools:\n{}\n\n\
         To use a tool, respond with:\n\
         {TOOL_CALL_OPEN}\n\
         {{\"tool\": \"tool_name\", \"arguments\": {{\"param\": \"value\"}}}}\n\
         {TOOL_CALL_CLOSE}\n\n\
         Use at most one tool per response.\n\
         When the whole task is done, say \"Task complete\" followed by a short summary.\n\
         If you don't need a tool, respond normally.",
        descriptions.join("\n")
    )
}
