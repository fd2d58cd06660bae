//! Built-in tool implementations for CodiCode.
//!
//! Tools give the agent the ability to interact with the workspace:
//! read and write files, list directories, check paths, run shell
//! commands.

pub mod file_exists;
pub mod list_directory;
pub mod read_file;
pub mod shell;
pub mod working_dir;
pub mod write_file;

use codicode_config::ToolsConfig;
use codicode_core::error::ToolError;
use codicode_core::tool::{Tool, ToolRegistry};
use serde_json::{Map, Value};
use std::time::Duration;

pub use file_exists::FileExistsTool;
pub use list_directory::ListDirectoryTool;
pub use read_file::ReadFileTool;
pub use shell::RunShellTool;
pub use working_dir::GetWorkingDirectoryTool;
pub use write_file::WriteFileTool;

/// Create a registry holding every built-in tool.
pub fn default_registry(config: &ToolsConfig) -> Result<ToolRegistry, ToolError> {
    let tools: Vec<Box<dyn Tool>> = vec![
        Box::new(ReadFileTool),
        Box::new(WriteFileTool),
        Box::new(ListDirectoryTool),
        Box::new(FileExistsTool),
        Box::new(RunShellTool::new(
            Duration::from_secs(config.shell_timeout_secs),
            config.blocked_patterns.clone(),
        )),
        Box::new(GetWorkingDirectoryTool),
    ];

    let mut registry = ToolRegistry::new();
    registry.register_all(tools)?;
    Ok(registry)
}

/// Fetch a required string argument.
pub(crate) fn required_str<'a>(
    arguments: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a str, ToolError> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}
