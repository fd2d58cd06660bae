//! Read file tool — return the UTF-8 contents of a file.

use async_trait::async_trait;
use codicode_core::error::ToolError;
use codicode_core::tool::{Tool, ToolResult};
use serde_json::{Map, Value};
use std::io::ErrorKind;

use crate::required_str;

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file at the specified path"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to read"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<ToolResult, ToolError> {
        let path = required_str(&arguments, "path")?;

        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(ToolResult::failure(format!("File not found: {path}")));
            }
            Err(e) => return Ok(ToolResult::failure(format!("Error reading file: {e}"))),
        };
        if !metadata.is_file() {
            return Ok(ToolResult::failure(format!("Path is not a file: {path}")));
        }

        match tokio::fs::read(path).await {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(content) => Ok(ToolResult::success(content)),
                Err(_) => Ok(ToolResult::failure(format!(
                    "File is not text or uses unsupported encoding: {path}"
                ))),
            },
            Err(e) => Ok(ToolResult::failure(format!("Error reading file: {e}"))),
        }
    }
}
