//! Read tool: return the contents of a file.

use async_trait::async_trait;
use clawloop_core::error::ToolError;
use clawloop_core::tool::{Tool, parse_arguments};
use serde::Deserialize;
use tracing::debug;

pub const NAME: &str = "Read";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadArgs {
    file_path: String,
}

pub struct ReadTool;

#[async_trait]
impl Tool for ReadTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Read and return the contents of a file at the given path."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filePath": {
                    "type": "string",
                    "description": "The path to the file to read"
                }
            },
            "required": ["filePath"]
        })
    }

    async fn execute(&self, arguments: &str) -> Result<String, ToolError> {
        let args: ReadArgs = parse_arguments(NAME, arguments)?;
        debug!(path = %args.file_path, "Reading file");

        tokio::fs::read_to_string(&args.file_path)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: NAME.into(),
                reason: format!("failed to read {}: {e}", args.file_path),
            })
    }
}
