//! Tool dispatcher: turns tool calls into tool results.
//!
//! Every call yields exactly one result. Handler failures become error
//! text the model can read and react to; they never abort the loop.

use std::sync::Arc;
use std::time::Instant;

use clawloop_core::message::MessageToolCall;
use clawloop_core::tool::{ToolRegistry, ToolResult};
use tracing::{debug, warn};

/// Progress of a `dispatch_all` run, reported per call.
#[derive(Debug)]
pub enum DispatchEvent<'a> {
    Started(&'a MessageToolCall),
    Finished(&'a MessageToolCall, &'a ToolResult),
}

pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Execute one tool call.
    pub async fn dispatch(&self, call: &MessageToolCall) -> ToolResult {
        let start = Instant::now();
        let result = self.registry.execute(&call.name, &call.arguments).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(output) => {
                debug!(tool = %call.name, call_id = %call.id, duration_ms, "Tool succeeded");
                ToolResult::ok(&call.id, output)
            }
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.id, duration_ms, error = %e, "Tool execution failed");
                ToolResult::error(&call.id, &e)
            }
        }
    }

    /// Execute calls one at a time, in order, returning one result per call.
    pub async fn dispatch_all<F>(&self, calls: &[MessageToolCall], mut on_event: F) -> Vec<ToolResult>
    where
        F: FnMut(DispatchEvent<'_>),
    {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            on_event(DispatchEvent::Started(call));
            let result = self.dispatch(call).await;
            on_event(DispatchEvent::Finished(call, &result));
            results.push(result);
        }
        results
    }
}
