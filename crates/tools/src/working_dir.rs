//! Working directory tool.

use async_trait::async_trait;
use codicode_core::error::ToolError;
use codicode_core::tool::{Tool, ToolResult};
use serde_json::{Map, Value};

pub struct GetWorkingDirectoryTool;

#[async_trait]
impl Tool for GetWorkingDirectoryTool {
    fn name(&self) -> &str {
        "get_working_directory"
    }

    fn description(&self) -> &str {
        "Get the current working directory"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: Map<String, Value>) -> Result<ToolResult, ToolError> {
        let cwd = std::env::current_dir().map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: e.to_string(),
        })?;
        Ok(ToolResult::success(cwd.display().to_string()))
    }
}
