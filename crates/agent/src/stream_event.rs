//! Agent-level streaming events.
//!
//! `AgentStreamEvent` lifts provider fragments and tool activity into
//! events a front end can render while a turn is in progress.

use clawloop_core::provider::Usage;
use serde::{Deserialize, Serialize};

/// Events emitted by the agent loop:
/// - `chunk`      : partial text from the model
/// - `tool_call`  : the loop is about to invoke a tool
/// - `tool_result`: tool execution completed
/// - `done`       : the turn finished with a tool-free response
/// - `error`      : the turn failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    /// Partial text token from the LLM.
    Chunk { content: String },

    /// The agent is calling a tool.
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// Tool execution completed.
    ToolResult {
        id: String,
        name: String,
        output: String,
        success: bool,
    },

    /// The turn is complete.
    Done {
        conversation_id: String,
        usage: Option<Usage>,
        iterations: usize,
        tool_calls_made: usize,
    },

    /// The turn failed.
    Error { message: String },
}

impl AgentStreamEvent {
    /// Event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    /// Build a `ToolCall` event; arguments that are not valid JSON are
    /// carried as a plain string.
    pub fn tool_call(id: &str, name: &str, arguments: &str) -> Self {
        let input = serde_json::from_str(arguments)
            .unwrap_or_else(|_| serde_json::Value::String(arguments.to_string()));
        Self::ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }
    }
}
