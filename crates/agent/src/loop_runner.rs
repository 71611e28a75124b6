//! The orchestration loop.
//!
//! One call to [`AgentLoop::process`] drives model round-trips until the
//! model answers without tool calls:
//!
//! ```text
//! AwaitingModel ─▶ Streaming ─▶ Dispatching ─┬─▶ AwaitingModel
//!                                            └─▶ Done
//! ```
//!
//! The conversation only grows: one assistant message per round-trip,
//! followed by one tool message per tool call.

use std::sync::Arc;

use clawloop_core::error::{Error, Result};
use clawloop_core::message::{Conversation, Message};
use clawloop_core::provider::{ChunkReceiver, Provider, ProviderRequest, StreamChunk, ToolDefinition, Usage};
use clawloop_core::tool::ToolRegistry;
use tracing::{debug, info, trace, warn};

use crate::accumulator::{AssembledTurn, StreamAccumulator};
use crate::dispatcher::{DispatchEvent, ToolDispatcher};
use crate::stream_event::AgentStreamEvent;

/// Default cap on model round-trips per `process` call.
pub const DEFAULT_MAX_ITERATIONS: u32 = 25;

/// Receives events while a turn is running.
pub type EventCallback = Arc<dyn Fn(&AgentStreamEvent) + Send + Sync>;

/// Where the loop is within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingModel,
    Streaming,
    Dispatching,
    Done,
}

/// Running totals for one `process` call.
#[derive(Debug, Default)]
struct TurnStats {
    iterations: u32,
    tool_calls_made: usize,
    usage: Option<Usage>,
}

/// The core agent loop that orchestrates LLM calls and tool execution.
pub struct AgentLoop {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Sampling temperature, endpoint default when unset
    temperature: Option<f32>,

    /// Max tokens per response
    max_tokens: Option<u32>,

    /// Tool lookup and execution
    dispatcher: ToolDispatcher,

    /// Maximum round-trips per `process` call; `None` is unbounded
    max_iterations: Option<u32>,

    /// Optional event sink
    on_event: Option<EventCallback>,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: None,
            max_tokens: None,
            dispatcher: ToolDispatcher::new(tools),
            max_iterations: Some(DEFAULT_MAX_ITERATIONS),
            on_event: None,
        }
    }

    /// Set the maximum number of model round-trips; `0` removes the cap.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = (max > 0).then_some(max);
        self
    }

    /// Set the default max tokens per LLM response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Receive [`AgentStreamEvent`]s while turns run.
    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        self.dispatcher.registry()
    }

    /// Append a user message and run the loop.
    pub async fn run_turn(&self, conversation: &mut Conversation, user_text: impl Into<String>) -> Result<String> {
        conversation.push(Message::user(user_text));
        self.process(conversation).await
    }

    /// Run the loop on the conversation as it stands.
    ///
    /// Returns the text of the final tool-free assistant message. A
    /// transport error aborts the turn without appending a partial
    /// assistant message.
    pub async fn process(&self, conversation: &mut Conversation) -> Result<String> {
        info!(
            conversation_id = %conversation.id,
            messages = conversation.len(),
            "Processing conversation"
        );

        let result = self.run(conversation).await;
        if let Err(e) = &result {
            warn!(conversation_id = %conversation.id, error = %e, "Turn failed");
            self.emit(AgentStreamEvent::Error { message: e.to_string() });
        }
        result
    }

    async fn run(&self, conversation: &mut Conversation) -> Result<String> {
        let tool_definitions = self.dispatcher.registry().definitions();
        let mut stats = TurnStats::default();
        let mut state = LoopState::AwaitingModel;

        loop {
            if let Some(max) = self.max_iterations
                && stats.iterations >= max
            {
                warn!(
                    conversation_id = %conversation.id,
                    iterations = stats.iterations,
                    "Max tool iterations reached"
                );
                return Err(Error::IterationLimit(max));
            }
            stats.iterations += 1;
            debug!(conversation_id = %conversation.id, iteration = stats.iterations, "Agent loop iteration");

            let receiver = self.request_turn(conversation, &tool_definitions).await?;

            self.transition(&mut state, LoopState::Streaming);
            let turn = self.collect(receiver).await?;
            if let Some(usage) = &turn.usage {
                stats.usage.get_or_insert_with(Usage::default).add(usage);
            }

            let AssembledTurn { content, tool_calls, .. } = turn;
            conversation.push(Message::assistant_with_tools(content.clone(), tool_calls.clone()));

            if tool_calls.is_empty() {
                self.transition(&mut state, LoopState::Done);
                self.emit(AgentStreamEvent::Done {
                    conversation_id: conversation.id.to_string(),
                    usage: stats.usage,
                    iterations: stats.iterations as usize,
                    tool_calls_made: stats.tool_calls_made,
                });
                return Ok(content);
            }

            self.transition(&mut state, LoopState::Dispatching);
            debug!(tool_count = tool_calls.len(), "Executing tool calls");

            let results = self
                .dispatcher
                .dispatch_all(&tool_calls, |event| match event {
                    DispatchEvent::Started(call) => {
                        self.emit(AgentStreamEvent::tool_call(&call.id, &call.name, &call.arguments))
                    }
                    DispatchEvent::Finished(call, result) => self.emit(AgentStreamEvent::ToolResult {
                        id: result.call_id.clone(),
                        name: call.name.clone(),
                        output: result.output.clone(),
                        success: result.success,
                    }),
                })
                .await;

            stats.tool_calls_made += results.len();
            for result in results {
                conversation.push(Message::tool_result(result.call_id, result.output));
            }

            self.transition(&mut state, LoopState::AwaitingModel);
        }
    }

    /// Send the conversation and open the fragment stream.
    async fn request_turn(&self, conversation: &Conversation, tools: &[ToolDefinition]) -> Result<ChunkReceiver> {
        debug!(
            messages = conversation.len(),
            estimated_tokens = conversation.estimated_tokens(),
            "Requesting model turn"
        );
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: conversation.messages().to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: tools.to_vec(),
        };
        Ok(self.provider.stream(request).await?)
    }

    /// Drain the stream into an assembled turn, forwarding text deltas.
    async fn collect(&self, mut receiver: ChunkReceiver) -> Result<AssembledTurn> {
        let mut accumulator = StreamAccumulator::new();

        while let Some(item) = receiver.recv().await {
            let chunk = item?;
            if let StreamChunk::Text { delta } = &chunk {
                self.emit(AgentStreamEvent::Chunk { content: delta.clone() });
            }
            accumulator.push(chunk);
            if accumulator.is_done() {
                break;
            }
        }

        Ok(accumulator.finish())
    }

    fn transition(&self, state: &mut LoopState, to: LoopState) {
        trace!(from = ?*state, ?to, "Loop state transition");
        *state = to;
    }

    fn emit(&self, event: AgentStreamEvent) {
        if let Some(callback) = &self.on_event {
            callback(&event);
        }
    }
}
