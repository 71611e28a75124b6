//! Provider trait: the abstraction over the remote model endpoint.
//!
//! A Provider knows how to send a conversation plus tool definitions to an
//! LLM and hand back an ordered stream of response fragments. Transport,
//! authentication and wire format stay inside the implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ProviderError;
use crate::message::Message;

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "anthropic/claude-haiku-4.5")
    pub model: String,

    /// The conversation messages
    pub messages: Vec<Message>,

    /// Sampling temperature; omitted from the request when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Available tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated message
    pub message: Message,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Add another usage report to this one.
    pub fn add(&mut self, other: &Usage) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(other.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

/// A partial tool call. Fragments for the same `index` must be
/// concatenated in arrival order; fragments for different indices may be
/// interleaved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Position of the tool call within the assistant turn
    pub index: u32,

    /// Correlation id, usually only on the first fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Tool name, usually only on the first fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// A piece of the argument payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// One incremental fragment of a streamed model turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    /// Text delta to append to the running assistant text.
    Text { delta: String },

    /// Partial tool call.
    ToolCallDelta(ToolCallDelta),

    /// The tool call at `index` will receive no more fragments.
    ToolCallFinished { index: u32 },

    /// The complete assistant text, as seen by the endpoint adapter.
    ContentFinished { content: String },

    /// Token usage for the turn.
    Usage(Usage),

    /// The turn is complete.
    Done,
}

impl StreamChunk {
    pub fn text(delta: impl Into<String>) -> Self {
        Self::Text { delta: delta.into() }
    }
}

/// Receiving side of a fragment stream.
pub type ChunkReceiver = mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>;

/// The core Provider trait.
///
/// Every model backend implements this trait. The agent loop calls
/// `stream()` without knowing which provider is being used.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openrouter").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Send a request and get an ordered stream of response fragments.
    ///
    /// Default implementation calls `complete()` and replays the result as
    /// fragments, one finished tool call per index.
    async fn stream(&self, request: ProviderRequest) -> std::result::Result<ChunkReceiver, ProviderError> {
        let response = self.complete(request).await?;
        let chunks = response_to_chunks(response);
        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            let _ = tx.send(Ok(chunk)).await;
        }
        Ok(rx)
    }

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

/// Break a complete response into the fragments a streaming endpoint would
/// have produced.
pub fn response_to_chunks(response: ProviderResponse) -> Vec<StreamChunk> {
    let mut chunks = Vec::new();
    let message = response.message;

    if !message.content.is_empty() {
        chunks.push(StreamChunk::text(message.content));
    }

    for (index, tc) in (0u32..).zip(message.tool_calls) {
        chunks.push(StreamChunk::ToolCallDelta(ToolCallDelta {
            index,
            id: Some(tc.id),
            name: Some(tc.name),
            arguments: Some(tc.arguments),
        }));
        chunks.push(StreamChunk::ToolCallFinished { index });
    }

    if let Some(usage) = response.usage {
        chunks.push(StreamChunk::Usage(usage));
    }
    chunks.push(StreamChunk::Done);
    chunks
}
