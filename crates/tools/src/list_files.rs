//! ListFiles tool: list a directory as JSON.

use async_trait::async_trait;
use clawloop_core::error::ToolError;
use clawloop_core::tool::{Tool, parse_arguments};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const NAME: &str = "ListFiles";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListFilesArgs {
    directory_path: String,
}

/// One directory entry in the tool output.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub is_dir: bool,
}

pub struct ListFilesTool;

impl ListFilesTool {
    fn failed(path: &str, e: std::io::Error) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: NAME.into(),
            reason: format!("failed to list {path}: {e}"),
        }
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "List the files and directories in a directory. Returns a JSON array of {name, is_dir}."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "directoryPath": {
                    "type": "string",
                    "description": "The directory to list"
                }
            },
            "required": ["directoryPath"]
        })
    }

    async fn execute(&self, arguments: &str) -> Result<String, ToolError> {
        let args: ListFilesArgs = parse_arguments(NAME, arguments)?;
        let path = args.directory_path.as_str();

        let mut dir = tokio::fs::read_dir(path).await.map_err(|e| Self::failed(path, e))?;
        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| Self::failed(path, e))? {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            entries.push(Entry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(path, count = entries.len(), "Listed directory");
        serde_json::to_string(&entries).map_err(|e| ToolError::ExecutionFailed {
            tool_name: NAME.into(),
            reason: e.to_string(),
        })
    }
}
