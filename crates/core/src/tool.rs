//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act in the world:
//! read and write files, list directories, run shell commands.
//! Every tool is an independent type implementing [`Tool`]; the
//! [`ToolRegistry`] dispatches to them by name.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

use crate::error::ToolError;

/// A tool descriptor exported to the gateway so the model knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// The tool name (unique within a registry)
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: Value,
}

/// A request to execute a tool, extracted from model output.
///
/// Only the protocol parser produces these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation token derived from the payload. Advisory only: distinct
    /// payloads may collide.
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments keyed by parameter name
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// The result of one dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    /// Output data, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Failure description, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(data: impl Into<Value>) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// A failure that still carries output (e.g. a command's stderr).
    pub fn failure_with_data(error: impl Into<String>, data: impl Into<Value>) -> Self {
        Self {
            success: false,
            data: Some(data.into()),
            error: Some(error.into()),
        }
    }

    /// Human-readable rendering of `data`: strings verbatim, other JSON compact.
    pub fn data_text(&self) -> String {
        match &self.data {
            None | Some(Value::Null) => "(no output)".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or("unknown error")
    }
}

/// The core Tool trait.
///
/// Each tool (read_file, write_file, run_shell, etc.) implements this trait.
/// An `Err` from `execute` is a fault: the registry converts it into an
/// unsuccessful [`ToolResult`], so tools may use `?` freely.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: Map<String, Value>) -> Result<ToolResult, ToolError>;

    /// Convert this tool into a descriptor for the gateway.
    fn to_descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// One dispatch as recorded in the registry's audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolAuditEntry {
    pub timestamp: DateTime<Utc>,
    pub tool: String,
    pub arguments: Map<String, Value>,
    pub result: ToolResult,
}

/// A registry of available tools.
///
/// Registration needs `&mut self`, so once the registry is shared behind an
/// `Arc` with running agents its tool set is frozen. Dispatch needs only
/// `&self` and never fails: unknown names, tool errors and tool panics all
/// come back as unsuccessful results. The audit log is append-only and safe
/// to share between concurrent runs.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
    audit_log: Mutex<Vec<ToolAuditEntry>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
            audit_log: Mutex::new(Vec::new()),
        }
    }

    /// Register a tool. Fails if the name is already taken.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::AlreadyRegistered(name));
        }
        debug!(tool = %name, "Registered tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Register several tools, stopping at the first duplicate.
    pub fn register_all(
        &mut self,
        tools: impl IntoIterator<Item = Box<dyn Tool>>,
    ) -> Result<(), ToolError> {
        for tool in tools {
            self.register(tool)?;
        }
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// All registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// All tool descriptors (for the gateway), sorted by name.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(|t| t.to_descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name. Never fails and never panics.
    pub async fn execute(&self, name: &str, arguments: Map<String, Value>) -> ToolResult {
        let result = match self.tools.get(name) {
            None => {
                let err = ToolError::NotFound {
                    name: name.to_string(),
                    available: self.names().iter().map(|n| n.to_string()).collect(),
                };
                warn!(tool = %name, "Dispatch to unknown tool");
                ToolResult::failure(err.to_string())
            }
            Some(tool) => {
                debug!(tool = %name, "Executing tool");
                match AssertUnwindSafe(tool.execute(arguments.clone()))
                    .catch_unwind()
                    .await
                {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) => {
                        warn!(tool = %name, error = %e, "Tool returned an error");
                        ToolResult::failure(e.to_string())
                    }
                    Err(panic) => {
                        let reason = panic_reason(panic.as_ref());
                        warn!(tool = %name, reason = %reason, "Tool panicked");
                        ToolResult::failure(
                            ToolError::ExecutionFailed {
                                tool_name: name.to_string(),
                                reason,
                            }
                            .to_string(),
                        )
                    }
                }
            }
        };

        self.audit_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ToolAuditEntry {
                timestamp: Utc::now(),
                tool: name.to_string(),
                arguments,
                result: result.clone(),
            });

        result
    }

    /// Dispatch a parsed call.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        self.execute(&call.name, call.arguments.clone()).await
    }

    /// Snapshot of every dispatch so far.
    pub fn audit_log(&self) -> Vec<ToolAuditEntry> {
        self.audit_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_audit_log(&self) {
        self.audit_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
