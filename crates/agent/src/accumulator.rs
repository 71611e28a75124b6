//! Stream accumulator: reassembles one streamed model turn.
//!
//! Fragments arrive in order but tool-call pieces for different indices may
//! interleave. Each index gets its own slot; a slot closes on an explicit
//! `ToolCallFinished` or at end of stream.

use std::collections::BTreeMap;

use clawloop_core::message::MessageToolCall;
use clawloop_core::provider::{StreamChunk, ToolCallDelta, Usage};
use tracing::{debug, warn};

/// A fully assembled assistant turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledTurn {
    /// Final assistant text
    pub content: String,

    /// Tool calls in ascending stream index order
    pub tool_calls: Vec<MessageToolCall>,

    /// Usage reported by the endpoint, if any
    pub usage: Option<Usage>,
}

#[derive(Debug, Default)]
struct Slot {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
    finished: bool,
}

/// Folds [`StreamChunk`]s into an [`AssembledTurn`].
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    finished_content: Option<String>,
    slots: BTreeMap<u32, Slot>,
    usage: Option<Usage>,
    done: bool,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `Done` has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Text received so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Apply one fragment.
    pub fn push(&mut self, chunk: StreamChunk) {
        if self.done {
            warn!(?chunk, "Ignoring fragment after end of stream");
            return;
        }

        match chunk {
            StreamChunk::Text { delta } => self.text.push_str(&delta),
            StreamChunk::ToolCallDelta(delta) => self.apply_delta(delta),
            StreamChunk::ToolCallFinished { index } => match self.slots.get_mut(&index) {
                Some(slot) => slot.finished = true,
                None => warn!(index, "Finish signal for unknown tool call"),
            },
            StreamChunk::ContentFinished { content } => self.finished_content = Some(content),
            StreamChunk::Usage(usage) => self.usage = Some(usage),
            StreamChunk::Done => self.done = true,
        }
    }

    fn apply_delta(&mut self, delta: ToolCallDelta) {
        let slot = self.slots.entry(delta.index).or_default();
        if slot.finished {
            warn!(index = delta.index, "Ignoring fragment for finished tool call");
            return;
        }

        if slot.id.is_none() {
            slot.id = delta.id.filter(|id| !id.is_empty());
        }
        if slot.name.is_none() {
            slot.name = delta.name.filter(|name| !name.is_empty());
        }
        if let Some(piece) = delta.arguments {
            slot.arguments.push_str(&piece);
        }
    }

    /// Close every open slot and produce the assembled turn.
    pub fn finish(self) -> AssembledTurn {
        let content = match self.finished_content {
            Some(finished) => {
                if !self.text.is_empty() && finished != self.text {
                    warn!(
                        streamed = self.text.len(),
                        finished = finished.len(),
                        "Finished content differs from streamed text, using finished content"
                    );
                }
                finished
            }
            None => self.text,
        };

        let tool_calls: Vec<MessageToolCall> = self
            .slots
            .into_iter()
            .map(|(index, slot)| {
                let id = slot.id.unwrap_or_else(|| {
                    debug!(index, "Tool call without id, assigning synthetic id");
                    format!("call_{index}")
                });
                let name = slot.name.unwrap_or_else(|| {
                    warn!(index, id = %id, "Tool call without name");
                    String::new()
                });
                MessageToolCall {
                    id,
                    name,
                    arguments: slot.arguments,
                }
            })
            .collect();

        AssembledTurn {
            content,
            tool_calls,
            usage: self.usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(index: u32, id: Option<&str>, name: Option<&str>, arguments: Option<&str>) -> StreamChunk {
        StreamChunk::ToolCallDelta(ToolCallDelta {
            index,
            id: id.map(String::from),
            name: name.map(String::from),
            arguments: arguments.map(String::from),
        })
    }

    fn assemble(chunks: Vec<StreamChunk>) -> AssembledTurn {
        let mut acc = StreamAccumulator::new();
        for chunk in chunks {
            acc.push(chunk);
        }
        acc.finish()
    }

    #[test]
    fn text_deltas_concatenate() {
        let turn = assemble(vec![
            StreamChunk::text("Hel"),
            StreamChunk::text("lo"),
            StreamChunk::Done,
        ]);
        assert_eq!(turn.content, "Hello");
        assert!(turn.tool_calls.is_empty());
    }

    #[test]
    fn interleaved_slots_assemble_independently() {
        let turn = assemble(vec![
            delta(1, Some("call_b"), Some("Bash"), Some("{\"comm")),
            delta(0, Some("call_a"), Some("Read"), Some("{\"filePath\":")),
            delta(1, None, None, Some("and\":\"ls\"}")),
            delta(0, None, None, Some("\"a.txt\"}")),
            StreamChunk::Done,
        ]);

        assert_eq!(
            turn.tool_calls,
            vec![
                MessageToolCall {
                    id: "call_a".into(),
                    name: "Read".into(),
                    arguments: r#"{"filePath":"a.txt"}"#.into(),
                },
                MessageToolCall {
                    id: "call_b".into(),
                    name: "Bash".into(),
                    arguments: r#"{"command":"ls"}"#.into(),
                },
            ]
        );
    }

    #[test]
    fn fragments_after_finish_are_ignored() {
        let turn = assemble(vec![
            delta(0, Some("call_a"), Some("Read"), Some("{}")),
            StreamChunk::ToolCallFinished { index: 0 },
            delta(0, None, None, Some("garbage")),
            StreamChunk::Done,
        ]);
        assert_eq!(turn.tool_calls[0].arguments, "{}");
    }

    #[test]
    fn id_and_name_come_from_first_fragment() {
        let turn = assemble(vec![
            delta(0, Some("call_first"), Some("Read"), None),
            delta(0, Some("call_second"), Some("Write"), Some("{}")),
        ]);
        assert_eq!(turn.tool_calls[0].id, "call_first");
        assert_eq!(turn.tool_calls[0].name, "Read");
    }

    #[test]
    fn missing_id_gets_synthetic_id() {
        let turn = assemble(vec![delta(3, None, Some("ListFiles"), Some("{}")), StreamChunk::Done]);
        assert_eq!(turn.tool_calls[0].id, "call_3");
    }

    #[test]
    fn finished_content_wins() {
        let turn = assemble(vec![
            StreamChunk::text("partial"),
            StreamChunk::ContentFinished { content: "complete answer".into() },
            StreamChunk::Done,
        ]);
        assert_eq!(turn.content, "complete answer");
    }

    #[test]
    fn usage_is_recorded() {
        let usage = Usage { prompt_tokens: 4, completion_tokens: 2, total_tokens: 6 };
        let turn = assemble(vec![StreamChunk::Usage(usage), StreamChunk::Done]);
        assert_eq!(turn.usage, Some(usage));
    }

    #[test]
    fn nothing_after_done() {
        let mut acc = StreamAccumulator::new();
        acc.push(StreamChunk::text("a"));
        acc.push(StreamChunk::Done);
        acc.push(StreamChunk::text("b"));
        assert!(acc.is_done());
        assert_eq!(acc.text(), "a");
    }

    #[test]
    fn empty_stream_is_empty_turn() {
        assert_eq!(assemble(vec![StreamChunk::Done]), AssembledTurn::default());
    }
}
