//! Shell tool — execute system commands.
//!
//! Rejects commands containing a blocked pattern and bounds every command
//! with a timeout.

use async_trait::async_trait;
use codicode_core::error::ToolError;
use codicode_core::tool::{Tool, ToolResult};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::required_str;

/// Execute shell commands with a denylist and a timeout.
pub struct RunShellTool {
    timeout: Duration,
    /// Lowercased substrings that make a command refused.
    blocked_patterns: Vec<String>,
}

impl RunShellTool {
    pub fn new(timeout: Duration, blocked_patterns: Vec<String>) -> Self {
        Self {
            timeout,
            blocked_patterns: blocked_patterns
                .into_iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }

    fn blocked_pattern(&self, command: &str) -> Option<&str> {
        let lowered = command.to_lowercase();
        self.blocked_patterns
            .iter()
            .find(|p| lowered.contains(p.as_str()))
            .map(|p| p.as_str())
    }
}

#[async_trait]
impl Tool for RunShellTool {
    fn name(&self) -> &str {
        "run_shell"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its output. Use with caution."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Shell command to execute"
                },
                "working_dir": {
                    "type": "string",
                    "description": "Working directory for command execution (optional)"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<ToolResult, ToolError> {
        let command = required_str(&arguments, "command")?;
        let working_dir = arguments.get("working_dir").and_then(Value::as_str);

        if let Some(pattern) = self.blocked_pattern(command) {
            warn!(command = %command, pattern = %pattern, "Refusing dangerous command");
            return Err(ToolError::PermissionDenied {
                tool_name: self.name().into(),
                reason: "Command rejected: potentially dangerous operation detected".into(),
            });
        }

        debug!(command = %command, cwd = ?working_dir, "Executing shell command");

        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        cmd.kill_on_drop(true);
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Ok(ToolResult::failure(format!("Error executing command: {e}")));
            }
            Err(_) => {
                warn!(command = %command, "Command timed out");
                return Err(ToolError::Timeout {
                    tool_name: self.name().into(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut text = String::new();
        if !stdout.is_empty() {
            text.push_str(&format!("STDOUT:\n{stdout}\n"));
        }
        if !stderr.is_empty() {
            text.push_str(&format!("STDERR:\n{stderr}\n"));
        }
        if text.is_empty() {
            text.push_str("(no output)");
        }

        if output.status.success() {
            Ok(ToolResult::success(text))
        } else {
            let code = output.status.code().unwrap_or(-1);
            warn!(command = %command, exit_code = code, "Command failed");
            Ok(ToolResult::failure_with_data(
                format!("Command exited with code {code}"),
                text,
            ))
        }
    }
}
