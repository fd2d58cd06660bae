//! File exists tool — report whether a path exists and what it is.

use async_trait::async_trait;
use codicode_core::error::ToolError;
use codicode_core::tool::{Tool, ToolResult};
use serde_json::{Map, Value};

use crate::required_str;

pub struct FileExistsTool;

#[async_trait]
impl Tool for FileExistsTool {
    fn name(&self) -> &str {
        "file_exists"
    }

    fn description(&self) -> &str {
        "Check if a file or directory exists at the specified path"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to check"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<ToolResult, ToolError> {
        let path = required_str(&arguments, "path")?;

        let text = match tokio::fs::metadata(path).await {
            Ok(m) => {
                let kind = if m.is_dir() { "directory" } else { "file" };
                format!("Path exists as {kind}: {path}")
            }
            Err(_) => format!("Path does not exist: {path}"),
        };
        Ok(ToolResult::success(text))
    }
}
