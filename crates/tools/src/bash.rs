//! Bash tool: execute a shell command.
//!
//! Runs `<shell> -c <command>` and returns stdout followed by stderr. A
//! non-zero exit status is reported as an execution failure carrying the
//! output. With a timeout configured the child is killed when it expires.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use clawloop_core::error::ToolError;
use clawloop_core::tool::{Tool, parse_arguments};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

pub const NAME: &str = "Bash";

#[derive(Debug, Deserialize)]
struct BashArgs {
    command: String,
}

pub struct BashTool {
    shell: String,
    timeout: Option<Duration>,
}

impl BashTool {
    pub fn new(shell: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            shell: shell.into(),
            timeout,
        }
    }
}

impl Default for BashTool {
    fn default() -> Self {
        Self::new("bash", None)
    }
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its combined stdout and stderr. Use this for running programs, searching files, git operations, etc."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The command to execute"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, arguments: &str) -> Result<String, ToolError> {
        let args: BashArgs = parse_arguments(NAME, arguments)?;
        debug!(shell = %self.shell, command = %args.command, "Executing shell command");

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(&args.command)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        let output = cmd.output();

        // Dropping the pending future kills the child
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, output).await.map_err(|_| {
                warn!(command = %args.command, "Command timed out");
                ToolError::Timeout {
                    tool_name: NAME.into(),
                    timeout_secs: limit.as_secs(),
                }
            })?,
            None => output.await,
        }
        .map_err(|e| ToolError::ExecutionFailed {
            tool_name: NAME.into(),
            reason: format!("failed to spawn {}: {e}", self.shell),
        })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            return Ok(combined);
        }

        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        warn!(command = %args.command, exit_code = %code, "Command failed");
        Err(ToolError::ExecutionFailed {
            tool_name: NAME.into(),
            reason: format!("exit status {code}\n{}", combined.trim_end()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_echo() {
        let output = BashTool::default()
            .execute(r#"{"command":"echo hello"}"#)
            .await
            .unwrap();
        assert_eq!(output, "hello\n");
    }

    #[tokio::test]
    async fn stderr_is_included() {
        let output = BashTool::default()
            .execute(r#"{"command":"echo out; echo err 1>&2"}"#)
            .await
            .unwrap();
        assert!(output.contains("out"));
        assert!(output.contains("err"));
    }

    #[tokio::test]
    async fn non_zero_exit_is_error_with_output() {
        let err = BashTool::default()
            .execute(r#"{"command":"echo boom; exit 3"}"#)
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("exit status 3"));
        assert!(text.contains("boom"));
    }

    #[tokio::test]
    async fn timeout_kills_command() {
        let tool = BashTool::new("bash", Some(Duration::from_millis(200)));
        let err = tool.execute(r#"{"command":"sleep 5"}"#).await.unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
    }

    #[tokio::test]
    async fn missing_shell_fails() {
        let tool = BashTool::new("/nonexistent/shell", None);
        let err = tool.execute(r#"{"command":"true"}"#).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }
}
