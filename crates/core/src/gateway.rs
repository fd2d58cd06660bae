//! Gateway trait — the abstraction over the language-model backend.
//!
//! A Gateway takes the conversation history plus the registered tool
//! descriptors and produces assistant text, either as one complete reply or as
//! a lazy, finite sequence of text fragments.
//!
//! Backend failures are **not** errors at this boundary. An unreachable or
//! misbehaving backend yields an ordinary response whose content carries an
//! error marker (see [`error_content`]) and whose finish reason is
//! [`FinishReason::Error`]. The agent loop treats that text like any other
//! assistant reply and never retries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::GatewayError;
use crate::message::Message;
use crate::tool::ToolDescriptor;

/// Sampling options forwarded to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Temperature (0.0 = deterministic, 2.0 = very creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// One generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    /// The conversation so far
    pub messages: Vec<Message>,

    /// Tools the model may call; rendered into a priming document by the backend
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDescriptor>,

    #[serde(default)]
    pub sampling: SamplingParams,
}

/// Why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    #[default]
    Stop,
    /// The token limit was hit
    Length,
    /// The backend could not be reached or answered garbage
    Error,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A complete (non-streaming) reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayResponse {
    /// The generated text (or an error marker)
    pub content: String,

    #[serde(default)]
    pub finish_reason: FinishReason,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl GatewayResponse {
    /// A normal reply with no usage information.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            finish_reason: FinishReason::Stop,
            usage: None,
        }
    }

    /// A backend failure degraded into assistant text.
    pub fn error(detail: impl std::fmt::Display) -> Self {
        Self {
            content: error_content(detail),
            finish_reason: FinishReason::Error,
            usage: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.finish_reason == FinishReason::Error
    }
}

/// Render a backend failure as the error-marker text seen by the agent loop.
pub fn error_content(detail: impl std::fmt::Display) -> String {
    format!("[Error: {detail}]")
}

/// The receiving end of a fragment stream. The sequence is finite: it ends
/// when the sender side is dropped.
pub type FragmentStream = mpsc::Receiver<String>;

/// The core Gateway trait.
///
/// The agent loop calls `generate()` or `generate_stream()` without knowing
/// which backend answers. For a deterministic backend, concatenating every
/// fragment of `generate_stream()` equals the `content` of `generate()` for
/// the same request.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// A human-readable name for this backend (e.g. "ollama").
    fn name(&self) -> &str;

    /// The model this gateway talks to.
    fn model(&self) -> &str;

    /// Send a request and get a complete reply.
    async fn generate(&self, request: GatewayRequest) -> GatewayResponse;

    /// Whether `generate_stream` delivers true incremental fragments.
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Send a request and get a stream of text fragments.
    ///
    /// Default implementation calls `generate()` and yields its content as a
    /// single fragment.
    async fn generate_stream(&self, request: GatewayRequest) -> FragmentStream {
        let response = self.generate(request).await;
        let (tx, rx) = mpsc::channel(1);
        if !response.content.is_empty() {
            // Capacity 1 and a live receiver: this cannot fail.
            let _ = tx.send(response.content).await;
        }
        rx
    }

    /// Can we reach the backend?
    async fn health_check(&self) -> Result<bool, GatewayError> {
        Ok(true)
    }

    /// List models the backend can serve.
    async fn list_models(&self) -> Result<Vec<String>, GatewayError> {
        Ok(Vec::new())
    }
}
