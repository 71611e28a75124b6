//! The tool-calling orchestration loop.
//!
//! Each turn follows a **Stream → Dispatch → Repeat** cycle:
//!
//! 1. **Send** the conversation and tool definitions to the provider
//! 2. **Accumulate** the streamed fragments into one assistant message
//! 3. **If tool calls**: dispatch each in order, append the results, go to 1
//! 4. **If text only**: return it to the caller
//!
//! The loop stops on a tool-free response, a transport error, or when the
//! iteration cap is reached.

pub mod accumulator;
pub mod dispatcher;
pub mod loop_runner;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use accumulator::{AssembledTurn, StreamAccumulator};
pub use dispatcher::{DispatchEvent, ToolDispatcher};
pub use loop_runner::{AgentLoop, DEFAULT_MAX_ITERATIONS, EventCallback, LoopState};
pub use stream_event::AgentStreamEvent;
