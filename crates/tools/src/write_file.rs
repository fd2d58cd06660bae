//! Write file tool — create or overwrite a file, creating parent directories.

use async_trait::async_trait;
use codicode_core::error::ToolError;
use codicode_core::tool::{Tool, ToolResult};
use serde_json::{Map, Value};
use std::path::Path;

use crate::required_str;

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file at the specified path. Creates parent directories if needed."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write to the file"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<ToolResult, ToolError> {
        let path = required_str(&arguments, "path")?;
        let content = required_str(&arguments, "content")?;

        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    return Ok(ToolResult::failure(format!("Error writing file: {e}")));
                }
            }
        }

        match tokio::fs::write(path, content).await {
            Ok(()) => Ok(ToolResult::success(format!(
                "Successfully wrote {} characters to {path}",
                content.chars().count()
            ))),
            Err(e) => Ok(ToolResult::failure(format!("Error writing file: {e}"))),
        }
    }
}
