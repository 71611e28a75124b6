//! # clawloop Core
//!
//! Domain types, traits, and error definitions for the clawloop agent.
//! This crate has **no transport or tool implementations**: it defines the
//! conversation model, the provider boundary, and the tool registry that the
//! other crates implement against.
//!
//! ## Layout
//!
//! - [`message`]: append-only conversation state
//! - [`provider`]: the model endpoint boundary and its fragment type
//! - [`tool`]: the tool handler trait and the name-keyed registry
//! - [`instructions`]: optional instruction file used as a system preamble

pub mod error;
pub mod instructions;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use instructions::Instructions;
pub use message::{Conversation, ConversationId, Message, MessageToolCall, Role};
pub use provider::{
    ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk, ToolCallDelta,
    ToolDefinition, Usage,
};
pub use tool::{FnTool, Tool, ToolRegistry, ToolResult, parse_arguments};
