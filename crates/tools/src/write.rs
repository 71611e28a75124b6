//! Write tool: create or overwrite a file.

use std::path::Path;

use async_trait::async_trait;
use clawloop_core::error::ToolError;
use clawloop_core::tool::{Tool, parse_arguments};
use serde::Deserialize;
use tracing::debug;

pub const NAME: &str = "Write";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteArgs {
    file_path: String,
    content: String,
}

pub struct WriteTool;

impl WriteTool {
    fn failed(path: &str, e: std::io::Error) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: NAME.into(),
            reason: format!("failed to write {path}: {e}"),
        }
    }
}

#[async_trait]
impl Tool for WriteTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Write content to a file. Creates the file and any missing parent directories, overwrites if it exists."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filePath": {
                    "type": "string",
                    "description": "The path to the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write"
                }
            },
            "required": ["filePath", "content"]
        })
    }

    async fn execute(&self, arguments: &str) -> Result<String, ToolError> {
        let args: WriteArgs = parse_arguments(NAME, arguments)?;
        let path = Path::new(&args.file_path);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::failed(&args.file_path, e))?;
        }

        tokio::fs::write(path, args.content.as_bytes())
            .await
            .map_err(|e| Self::failed(&args.file_path, e))?;

        debug!(path = %args.file_path, bytes = args.content.len(), "Wrote file");
        Ok(format!("Wrote {} bytes to {}", args.content.len(), args.file_path))
    }
}
