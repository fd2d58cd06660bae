//! Ollama gateway implementation.
//!
//! Talks to the native Ollama chat endpoint (`POST /api/chat`):
//! - blocking replies (`stream: false`)
//! - streaming replies as newline-delimited JSON objects
//! - model listing and health checks via `GET /api/tags`
//!
//! Failures never escape as errors from `generate`/`generate_stream`: they
//! come back as `[Error: ...]` content so the agent loop can show them to the
//! model like any other reply.

use async_trait::async_trait;
use codicode_core::error::GatewayError;
use codicode_core::gateway::{
    FinishReason, FragmentStream, Gateway, GatewayRequest, GatewayResponse, Usage, error_content,
};
use codicode_core::protocol::render_tool_prompt;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Fragments buffered between the reader task and the agent loop.
const STREAM_CHANNEL_CAPACITY: usize = 64;

/// A Gateway backed by a local or remote Ollama server.
pub struct OllamaGateway {
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OllamaGateway {
    /// Create a gateway with the default 120 second connect and read timeout.
    pub fn new(model: impl Into<String>, base_url: impl Into<String>) -> Result<Self, GatewayError> {
        Self::with_timeout(model, base_url, Duration::from_secs(120))
    }

    /// `timeout` bounds connecting and each individual read, not the whole
    /// request, so a slow stream only fails when it stalls.
    pub fn with_timeout(
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Wire messages for a request. The tool priming document goes first and
    /// exists only on the wire, never in the conversation.
    fn to_wire_messages(request: &GatewayRequest) -> Vec<WireMessage> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.tools.is_empty() {
            messages.push(WireMessage {
                role: "system".into(),
                content: render_tool_prompt(&request.tools),
            });
        }
        messages.extend(request.messages.iter().map(|m| WireMessage {
            role: m.role.as_str().into(),
            content: m.content.clone(),
        }));
        messages
    }

    fn request_body(&self, request: &GatewayRequest, stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: Self::to_wire_messages(request),
            stream,
            options: ChatOptions {
                temperature: request.sampling.temperature,
                num_predict: request.sampling.max_tokens,
            },
        }
    }

    async fn post_chat(&self, body: &ChatRequest) -> Result<reqwest::Response, GatewayError> {
        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout(e.to_string())
                } else {
                    GatewayError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 404 {
            return Err(GatewayError::ModelNotFound(self.model.clone()));
        }
        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Ollama returned error");
            return Err(GatewayError::ApiError {
                status_code: status,
                message: error_body,
            });
        }
        Ok(response)
    }

    async fn try_generate(&self, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let body = self.request_body(request, false);
        debug!(model = %self.model, messages = body.messages.len(), "Sending chat request");

        let response = self.post_chat(&body).await?;
        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        Ok(reply.into_gateway_response())
    }

    async fn fetch_tags(&self) -> Result<reqwest::Response, GatewayError> {
        let url = format!("{}/api/tags", self.base_url);
        self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))
    }
}

#[async_trait]
impl Gateway for OllamaGateway {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GatewayRequest) -> GatewayResponse {
        match self.try_generate(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(model = %self.model, error = %e, "Chat request failed");
                GatewayResponse::error(e)
            }
        }
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn generate_stream(&self, request: GatewayRequest) -> FragmentStream {
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

        let body = self.request_body(&request, true);
        debug!(model = %self.model, messages = body.messages.len(), "Sending streaming chat request");

        let response = match self.post_chat(&body).await {
            Ok(r) => r,
            Err(e) => {
                warn!(model = %self.model, error = %e, "Streaming request failed");
                let _ = tx.send(error_content(e)).await;
                return rx;
            }
        };

        // Spawn task to read the NDJSON byte stream and forward content pieces
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut lines = LineBuffer::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let err = GatewayError::StreamInterrupted(e.to_string());
                        warn!(error = %err, "Stream read failed");
                        let _ = tx.send(error_content(err)).await;
                        return;
                    }
                };

                for line in lines.push(&bytes) {
                    match forward_line(&tx, &line).await {
                        LineOutcome::Continue => {}
                        LineOutcome::Stop => return,
                    }
                }
            }

            // Connection closed without `done`; flush any unterminated line
            if let Some(line) = lines.finish() {
                let _ = forward_line(&tx, &line).await;
            }
        });

        rx
    }

    async fn health_check(&self) -> Result<bool, GatewayError> {
        let response = self.fetch_tags().await?;
        Ok(response.status().is_success())
    }

    async fn list_models(&self) -> Result<Vec<String>, GatewayError> {
        let response = self.fetch_tags().await?;
        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

/// Whether a configured model name refers to a model Ollama reports.
/// A name without a tag means `:latest`.
pub fn model_matches(configured: &str, available: &str) -> bool {
    fn with_tag(name: &str) -> std::borrow::Cow<'_, str> {
        if name.contains(':') {
            name.into()
        } else {
            format!("{name}:latest").into()
        }
    }
    with_tag(configured.trim()) == with_tag(available.trim())
}

enum LineOutcome {
    Continue,
    Stop,
}

/// Decode one NDJSON line and forward its content piece.
async fn forward_line(tx: &mpsc::Sender<String>, line: &str) -> LineOutcome {
    let line = line.trim();
    if line.is_empty() {
        return LineOutcome::Continue;
    }

    let chunk: StreamChunk = match serde_json::from_str(line) {
        Ok(c) => c,
        Err(e) => {
            trace!(data = %line, error = %e, "Ignoring unparseable stream line");
            return LineOutcome::Continue;
        }
    };

    if let Some(error) = chunk.error {
        let _ = tx.send(error_content(error)).await;
        return LineOutcome::Stop;
    }

    if let Some(message) = chunk.message {
        if !message.content.is_empty() && tx.send(message.content).await.is_err() {
            return LineOutcome::Stop; // receiver dropped
        }
    }

    if chunk.done {
        LineOutcome::Stop
    } else {
        LineOutcome::Continue
    }
}

/// Splits a byte stream into complete lines.
///
/// Works on raw bytes so a multi-byte character split across two network
/// chunks is decoded only once its line is complete.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(
                String::from_utf8_lossy(&line)
                    .trim_end_matches(['\r', '\n'])
                    .to_string(),
            );
        }
        lines
    }

    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

// --- Ollama API types (internal) ---

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: WireMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

impl ChatResponse {
    fn into_gateway_response(self) -> GatewayResponse {
        let finish_reason = match self.done_reason.as_deref() {
            Some("length") => FinishReason::Length,
            _ => FinishReason::Stop,
        };

        let usage = match (self.prompt_eval_count, self.eval_count) {
            (None, None) => None,
            (prompt, completion) => {
                let prompt_tokens = prompt.unwrap_or(0);
                let completion_tokens = completion.unwrap_or(0);
                Some(Usage {
                    prompt_tokens,
                    completion_tokens,
                    total_tokens: prompt_tokens + completion_tokens,
                })
            }
        };

        GatewayResponse {
            content: self.message.content,
            finish_reason,
            usage,
        }
    }
}

/// One NDJSON line of a streaming reply.
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    message: Option<WireMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use codicode_core::{Message, SamplingParams, ToolDescriptor};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn request(tools: Vec<ToolDescriptor>) -> GatewayRequest {
        GatewayRequest {
            messages: vec![Message::user("List files in ./src")],
            tools,
            sampling: SamplingParams::default(),
        }
    }

    fn read_file_descriptor() -> ToolDescriptor {
        ToolDescriptor {
            name: "read_file".into(),
            description: "Read a file".into(),
            parameters: serde_json::json!({"type": "object"}),
        }
    }

    /// Serve exactly one HTTP request with a canned body, then close.
    async fn serve_once(content_type: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
                if request_complete(&received) {
                    break;
                }
            }
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{addr}")
    }

    /// Serve one request as a chunked body, one line per chunk with `gap`
    /// between chunks.
    async fn serve_trickle(lines: Vec<String>, gap: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&received) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            let head = "HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n";
            socket.write_all(head.as_bytes()).await.unwrap();
            for line in lines {
                let piece = format!("{line}\n");
                let chunk = format!("{:x}\r\n{piece}\r\n", piece.len());
                socket.write_all(chunk.as_bytes()).await.unwrap();
                socket.flush().await.unwrap();
                tokio::time::sleep(gap).await;
            }
            socket.write_all(b"0\r\n\r\n").await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{addr}")
    }

    fn request_complete(received: &[u8]) -> bool {
        let text = String::from_utf8_lossy(received);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        received.len() >= header_end + 4 + content_length
    }

    #[test]
    fn constructor_trims_base_url() {
        let gateway = OllamaGateway::new("codellama:7b", "http://localhost:11434/").unwrap();
        assert_eq!(gateway.name(), "ollama");
        assert_eq!(gateway.model(), "codellama:7b");
        assert_eq!(gateway.base_url(), "http://localhost:11434");
        assert!(gateway.supports_streaming());
    }

    #[test]
    fn tool_prompt_is_prepended_on_the_wire_only() {
        let req = request(vec![read_file_descriptor()]);
        let wire = OllamaGateway::to_wire_messages(&req);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, "system");
        assert!(wire[0].content.contains("read_file"));
        assert_eq!(wire[1].role, "user");
        assert_eq!(req.messages.len(), 1);
    }

    #[test]
    fn no_tools_means_no_system_prompt() {
        let wire = OllamaGateway::to_wire_messages(&request(vec![]));
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0].role, "user");
    }

    #[test]
    fn request_body_shape() {
        let gateway = OllamaGateway::new("codellama:7b", "http://localhost:11434").unwrap();
        let body = serde_json::to_value(gateway.request_body(&request(vec![]), true)).unwrap();
        assert_eq!(body["model"], "codellama:7b");
        assert_eq!(body["stream"], true);
        assert_eq!(body["options"]["num_predict"], 4096);
        assert_eq!(body["messages"][0]["content"], "List files in ./src");
    }

    #[test]
    fn parse_chat_response_with_usage() {
        let data = r#"{"model":"codellama:7b","message":{"role":"assistant","content":"Hi"},"done":true,"done_reason":"length","prompt_eval_count":12,"eval_count":3}"#;
        let parsed: ChatResponse = serde_json::from_str(data).unwrap();
        let resp = parsed.into_gateway_response();
        assert_eq!(resp.content, "Hi");
        assert_eq!(resp.finish_reason, FinishReason::Length);
        assert_eq!(resp.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn parse_stream_chunk() {
        let data = r#"{"message":{"role":"assistant","content":"Hel"},"done":false}"#;
        let parsed: StreamChunk = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.message.unwrap().content, "Hel");
        assert!(!parsed.done);

        let last: StreamChunk = serde_json::from_str(r#"{"done":true}"#).unwrap();
        assert!(last.done);
        assert!(last.message.is_none());
    }

    #[test]
    fn line_buffer_handles_split_lines_and_utf8() {
        let mut buffer = LineBuffer::default();
        let text = "{\"a\":\"é\"}\n{\"b\":1}\n{\"c\"";
        let bytes = text.as_bytes();
        // split inside the two-byte 'é'
        let split = text.find('é').unwrap() + 1;

        assert!(buffer.push(&bytes[..split]).is_empty());
        let lines = buffer.push(&bytes[split..]);
        assert_eq!(lines, vec!["{\"a\":\"é\"}".to_string(), "{\"b\":1}".to_string()]);
        assert_eq!(buffer.finish().as_deref(), Some("{\"c\""));
        assert!(buffer.finish().is_none());
    }

    #[tokio::test]
    async fn unreachable_backend_degrades_to_error_content() {
        let gateway = OllamaGateway::with_timeout(
            "codellama:7b",
            "http://127.0.0.1:1",
            Duration::from_secs(5),
        )
        .unwrap();

        let resp = gateway.generate(request(vec![])).await;
        assert!(resp.is_error());
        assert!(resp.content.starts_with("[Error: "));

        let mut rx = gateway.generate_stream(request(vec![])).await;
        let fragment = rx.recv().await.unwrap();
        assert!(fragment.starts_with("[Error: "));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn blocking_reply_from_server() {
        let body = r#"{"message":{"role":"assistant","content":"Hello world"},"done":true,"done_reason":"stop","prompt_eval_count":5,"eval_count":2}"#;
        let url = serve_once("application/json", body.to_string()).await;
        let gateway = OllamaGateway::new("codellama:7b", url).unwrap();

        let resp = gateway.generate(request(vec![])).await;
        assert_eq!(resp.content, "Hello world");
        assert_eq!(resp.finish_reason, FinishReason::Stop);
        assert_eq!(resp.usage.unwrap().prompt_tokens, 5);
    }

    #[tokio::test]
    async fn streamed_fragments_concatenate_to_full_reply() {
        let body = [
            r#"{"message":{"role":"assistant","content":"Hello"},"done":false}"#,
            r#"{"message":{"role":"assistant","content":""},"done":false}"#,
            r#"{"message":{"role":"assistant","content":" world"},"done":false}"#,
            r#"{"message":{"role":"assistant","content":""},"done":true}"#,
        ]
        .join("\n");
        let url = serve_once("application/x-ndjson", body).await;
        let gateway = OllamaGateway::new("codellama:7b", url).unwrap();

        let mut rx = gateway.generate_stream(request(vec![])).await;
        let mut fragments = Vec::new();
        while let Some(fragment) = rx.recv().await {
            fragments.push(fragment);
        }
        assert_eq!(fragments, vec!["Hello".to_string(), " world".to_string()]);
        assert_eq!(fragments.concat(), "Hello world");
    }

    #[tokio::test]
    async fn slow_stream_outlasting_the_timeout_is_not_cut_off() {
        let mut lines: Vec<String> = (0..5)
            .map(|i| {
                format!(r#"{{"message":{{"role":"assistant","content":"p{i} "}},"done":false}}"#)
            })
            .collect();
        lines.push(r#"{"message":{"role":"assistant","content":""},"done":true}"#.to_string());
        let url = serve_trickle(lines, Duration::from_millis(400)).await;
        let gateway =
            OllamaGateway::with_timeout("codellama:7b", url, Duration::from_secs(1)).unwrap();

        let mut rx = gateway.generate_stream(request(vec![])).await;
        let mut fragments = Vec::new();
        while let Some(fragment) = rx.recv().await {
            fragments.push(fragment);
        }
        assert_eq!(fragments.concat(), "p0 p1 p2 p3 p4 ");
    }

    #[test]
    fn untagged_model_names_mean_latest() {
        assert!(model_matches("codellama", "codellama:latest"));
        assert!(model_matches("codellama:latest", "codellama"));
        assert!(model_matches("codellama:7b", "codellama:7b"));
        assert!(!model_matches("codellama", "codellama:7b"));
        assert!(!model_matches("llama3:8b", "codellama:8b"));
    }

    #[tokio::test]
    async fn list_models_from_tags() {
        let body = r#"{"models":[{"name":"codellama:7b"},{"name":"llama3:8b"}]}"#;
        let url = serve_once("application/json", body.to_string()).await;
        let gateway = OllamaGateway::new("codellama:7b", url).unwrap();

        let models = gateway.list_models().await.unwrap();
        assert_eq!(models, vec!["codellama:7b", "llama3:8b"]);
    }
}
