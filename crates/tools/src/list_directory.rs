//! List directory tool — flat or recursive listing, sorted by path.

use async_trait::async_trait;
use codicode_core::error::ToolError;
use codicode_core::tool::{Tool, ToolResult};
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::required_str;

pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List all files and directories in the specified path"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the directory to list"
                },
                "recursive": {
                    "type": "boolean",
                    "description": "Whether to list recursively",
                    "default": false
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<ToolResult, ToolError> {
        let path = required_str(&arguments, "path")?;
        let recursive = arguments
            .get("recursive")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let root = Path::new(path);
        match tokio::fs::metadata(root).await {
            Ok(m) if m.is_dir() => {}
            Ok(_) => return Ok(ToolResult::failure(format!("Path is not a directory: {path}"))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(ToolResult::failure(format!("Directory not found: {path}")));
            }
            Err(e) => return Ok(ToolResult::failure(format!("Error listing directory: {e}"))),
        }

        match collect_entries(root, recursive).await {
            Ok(entries) if entries.is_empty() => Ok(ToolResult::success("(empty directory)")),
            Ok(entries) => {
                let lines: Vec<String> = entries
                    .iter()
                    .map(|(rel, is_dir)| {
                        let kind = if *is_dir { "dir" } else { "file" };
                        format!("{kind}: {}", rel.display())
                    })
                    .collect();
                Ok(ToolResult::success(lines.join("\n")))
            }
            Err(e) => Ok(ToolResult::failure(format!("Error listing directory: {e}"))),
        }
    }
}

/// Entries under `root` as (path relative to root, is_dir), sorted by path.
/// Symlinks are listed but never followed.
async fn collect_entries(root: &Path, recursive: bool) -> std::io::Result<Vec<(PathBuf, bool)>> {
    let mut entries = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut reader = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = reader.next_entry().await? {
            let file_type = entry.file_type().await?;
            let full = entry.path();
            let rel = full.strip_prefix(root).unwrap_or(&full).to_path_buf();
            if recursive && file_type.is_dir() {
                pending.push(full);
            }
            entries.push((rel, file_type.is_dir()));
        }
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/utils")).unwrap();
        std::fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();
        std::fs::write(dir.path().join("src/utils/mod.rs"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), "# demo").unwrap();
        dir
    }

    #[tokio::test]
    async fn flat_listing_is_sorted_and_typed() {
        let dir = project();
        let result = ListDirectoryTool
            .execute(args(json!({"path": dir.path().to_str().unwrap()})))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.data_text(), "file: README.md\ndir: src");
    }

    #[tokio::test]
    async fn recursive_listing_uses_relative_paths() {
        let dir = project();
        let result = ListDirectoryTool
            .execute(args(json!({"path": dir.path().to_str().unwrap(), "recursive": true})))
            .await
            .unwrap();

        let text = result.data_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines.contains(&"dir: src"));
        assert!(lines.iter().any(|l| l.starts_with("file: src") && l.ends_with("main.rs")));
        assert!(lines.iter().any(|l| l.starts_with("dir: src") && l.ends_with("utils")));
    }

    #[tokio::test]
    async fn empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = ListDirectoryTool
            .execute(args(json!({"path": dir.path().to_str().unwrap()})))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.data_text(), "(empty directory)");
    }

    #[tokio::test]
    async fn missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let result = ListDirectoryTool
            .execute(args(json!({"path": missing.to_str().unwrap()})))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error_text().starts_with("Directory not found"));
    }

    #[tokio::test]
    async fn file_is_not_a_directory() {
        let dir = project();
        let readme = dir.path().join("README.md");
        let result = ListDirectoryTool
            .execute(args(json!({"path": readme.to_str().unwrap()})))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error_text().contains("not a directory"));
    }
}
