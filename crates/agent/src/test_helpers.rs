//! Shared test helpers for orchestrator tests.

use async_trait::async_trait;
use codicode_core::error::ToolError;
use codicode_core::gateway::FragmentStream;
use codicode_core::{Gateway, GatewayRequest, GatewayResponse, Tool, ToolResult};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// A gateway that replays scripted replies in order and records requests.
///
/// Panics if more calls are made than replies provided.
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<GatewayRequest>>,
    fragment_size: usize,
    streaming: bool,
    stream_calls: Mutex<usize>,
}

impl ScriptedGateway {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
            fragment_size: usize::MAX,
            streaming: true,
            stream_calls: Mutex::new(0),
        }
    }

    /// Split streamed replies into fragments of at most `size` characters.
    pub fn with_fragment_size(mut self, size: usize) -> Self {
        self.fragment_size = size.max(1);
        self
    }

    /// Report no native streaming support.
    pub fn without_streaming(mut self) -> Self {
        self.streaming = false;
        self
    }

    pub fn stream_calls(&self) -> usize {
        *self.stream_calls.lock().unwrap()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GatewayRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self, request: GatewayRequest) -> String {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request);
        self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
            panic!("ScriptedGateway: no more replies (call #{})", requests.len())
        })
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn generate(&self, request: GatewayRequest) -> GatewayResponse {
        GatewayResponse::text(self.next_reply(request))
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn generate_stream(&self, request: GatewayRequest) -> FragmentStream {
        *self.stream_calls.lock().unwrap() += 1;
        let reply = self.next_reply(request);
        let chars: Vec<char> = reply.chars().collect();
        let fragments: Vec<String> = chars
            .chunks(self.fragment_size.min(chars.len().max(1)))
            .map(|c| c.iter().collect())
            .collect();

        let (tx, rx) = mpsc::channel(fragments.len().max(1));
        for fragment in fragments {
            tx.send(fragment).await.unwrap();
        }
        rx
    }
}

/// Render a tool call the way a model would write it.
pub fn call_text(tool: &str, arguments: Value) -> String {
    format!(
        "Let me use a tool.\n<tool_call>\n{}\n</tool_call>",
        serde_json::json!({"tool": tool, "arguments": arguments})
    )
}

/// Returns its `text` argument.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Echoes back the input"
    }
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"]
        })
    }
    async fn execute(&self, arguments: Map<String, Value>) -> Result<ToolResult, ToolError> {
        let text = arguments
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'text' argument".into()))?;
        Ok(ToolResult::success(text))
    }
}

/// Always fails.
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "fail"
    }
    fn description(&self) -> &str {
        "Always fails"
    }
    fn parameters_schema(&self) -> Value {
        serde_json::json!({"type": "object", "properties": {}})
    }
    async fn execute(&self, _arguments: Map<String, Value>) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::failure("simulated failure"))
    }
}
