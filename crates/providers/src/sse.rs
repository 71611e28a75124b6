//! Server-sent events decoder for OpenAI-compatible chat completion streams.
//!
//! Turns raw response bytes into [`StreamChunk`] fragments. Tool-call
//! deltas are forwarded as-is (the agent's accumulator owns reassembly);
//! the decoder only adds the completion signals: `ToolCallFinished` for
//! every index seen and `ContentFinished` with the full text once the
//! endpoint reports a `finish_reason`.

use std::collections::BTreeSet;

use clawloop_core::error::ProviderError;
use clawloop_core::provider::{StreamChunk, ToolCallDelta, Usage};
use serde::Deserialize;
use tracing::trace;

type Decoded = Result<StreamChunk, ProviderError>;

/// Incremental SSE decoder. Feed it bytes as they arrive.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes of an incomplete line
    buffer: Vec<u8>,
    /// Text seen so far, for the `ContentFinished` signal
    content: String,
    /// Tool call indices not yet reported finished
    open_tool_calls: BTreeSet<u32>,
    /// `[DONE]` seen or a fatal error emitted
    finished: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the stream has terminated (normally or with an error).
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decode every complete line in `bytes` (plus any buffered remainder).
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Decoded> {
        let mut out = Vec::new();
        self.buffer.extend_from_slice(bytes);

        while !self.finished
            && let Some(pos) = self.buffer.iter().position(|b| *b == b'\n')
        {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            self.decode_line(line.trim_end_matches(['\r', '\n']), &mut out);
        }

        out
    }

    /// Flush at the end of the byte stream.
    ///
    /// A stream that ends without `[DONE]` is still closed with `Done`.
    pub fn finish(&mut self) -> Vec<Decoded> {
        let mut out = Vec::new();
        if self.finished {
            return out;
        }

        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest);
            self.decode_line(line.trim_end_matches(['\r', '\n']), &mut out);
        }

        if !self.finished {
            self.close(&mut out);
        }
        out
    }

    fn decode_line(&mut self, line: &str, out: &mut Vec<Decoded>) {
        // Skip empty lines, SSE comments, and non-data fields (event:, id:, retry:)
        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        let data = data.trim();
        if data.is_empty() {
            return;
        }

        trace!(data = %data, "SSE data");

        if data == "[DONE]" {
            self.close(out);
            return;
        }

        let parsed: StreamResponse = match serde_json::from_str(data) {
            Ok(p) => p,
            Err(e) => {
                self.fail(ProviderError::MalformedStream(format!("{e}: {data}")), out);
                return;
            }
        };

        if let Some(error) = parsed.error {
            self.fail(
                ProviderError::ApiError {
                    status_code: error
                        .code
                        .as_ref()
                        .and_then(serde_json::Value::as_u64)
                        .and_then(|c| u16::try_from(c).ok())
                        .unwrap_or(200),
                    message: error.message.unwrap_or_else(|| "An error occurred during streaming".into()),
                },
                out,
            );
            return;
        }

        if let Some(choice) = parsed.choices.into_iter().next() {
            if let Some(text) = choice.delta.content.filter(|c| !c.is_empty()) {
                self.content.push_str(&text);
                out.push(Ok(StreamChunk::Text { delta: text }));
            }

            for tc in choice.delta.tool_calls.unwrap_or_default() {
                self.open_tool_calls.insert(tc.index);
                let (name, arguments) = match tc.function {
                    Some(f) => (f.name, f.arguments),
                    None => (None, None),
                };
                out.push(Ok(StreamChunk::ToolCallDelta(ToolCallDelta {
                    index: tc.index,
                    id: tc.id,
                    name,
                    arguments,
                })));
            }

            if choice.finish_reason.is_some() {
                self.finish_turn(out);
            }
        }

        if let Some(usage) = parsed.usage {
            out.push(Ok(StreamChunk::Usage(Usage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            })));
        }
    }

    /// Report every open tool call and the accumulated text as finished.
    fn finish_turn(&mut self, out: &mut Vec<Decoded>) {
        for index in std::mem::take(&mut self.open_tool_calls) {
            out.push(Ok(StreamChunk::ToolCallFinished { index }));
        }
        if !self.content.is_empty() {
            out.push(Ok(StreamChunk::ContentFinished {
                content: std::mem::take(&mut self.content),
            }));
        }
    }

    fn close(&mut self, out: &mut Vec<Decoded>) {
        self.finish_turn(out);
        out.push(Ok(StreamChunk::Done));
        self.finished = true;
    }

    fn fail(&mut self, error: ProviderError, out: &mut Vec<Decoded>) {
        out.push(Err(error));
        self.finished = true;
    }
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<StreamUsage>,
    #[serde(default)]
    error: Option<StreamErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    /// Absent on the final chunk from some endpoints
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

/// A tool call delta: arrives incrementally across chunks.
#[derive(Debug, Deserialize)]
struct StreamToolCallDelta {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamErrorBody {
    #[serde(default)]
    message: Option<String>,
    /// Numeric on most endpoints, a string on some
    #[serde(default)]
    code: Option<serde_json::Value>,
}
