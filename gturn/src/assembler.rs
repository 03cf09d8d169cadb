//! Reassembly of one fragmented backend turn from stream chunks.

use std::collections::BTreeMap;
use std::sync::Arc;

use gclient::{ClientError, StreamChunk, ToolCallFragment, ToolCallRequest};
use gcommon::EventBus;

use crate::{AssemblerEvent, TurnError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerPhase {
    Idle,
    Receiving,
    Done,
    Failed,
}

/// Everything one streamed turn produced once the finish chunk arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledTurn {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// State machine over one backend turn: `Idle → Receiving → Done | Failed`.
///
/// Fragments for one index append strictly in receipt order; an index is a
/// byte-append channel with no reordering tolerance. Only the explicit
/// finish chunk finalizes the turn: an argument buffer that happens to
/// parse as JSON mid-stream is never treated as complete.
pub struct TurnAssembler {
    phase: AssemblerPhase,
    content: String,
    pending: BTreeMap<u32, PendingToolCall>,
    events: Arc<EventBus<AssemblerEvent>>,
}

impl Default for TurnAssembler {
    fn default() -> Self {
        Self::new(Arc::new(EventBus::new()))
    }
}

impl TurnAssembler {
    pub fn new(events: Arc<EventBus<AssemblerEvent>>) -> Self {
        Self {
            phase: AssemblerPhase::Idle,
            content: String::new(),
            pending: BTreeMap::new(),
            events,
        }
    }

    pub fn phase(&self) -> AssemblerPhase {
        self.phase
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Feeds one chunk. Returns the assembled turn when the chunk was the
    /// finish signal, `None` while the turn is still accumulating.
    pub fn push(&mut self, chunk: StreamChunk) -> Result<Option<AssembledTurn>, TurnError> {
        match self.phase {
            AssemblerPhase::Done | AssemblerPhase::Failed => {
                return Err(TurnError::protocol(
                    "chunk received after the stream reached a terminal state",
                ));
            }
            AssemblerPhase::Idle => self.phase = AssemblerPhase::Receiving,
            AssemblerPhase::Receiving => {}
        }

        match chunk {
            StreamChunk::ContentDelta(delta) => {
                self.content.push_str(&delta);
                self.events.emit(&AssemblerEvent::ContentDelta(delta));
                Ok(None)
            }
            StreamChunk::ToolCallFragments(fragments) => {
                for fragment in fragments {
                    self.absorb_fragment(fragment);
                }
                Ok(None)
            }
            StreamChunk::Finish(_reason) => self.finalize().map(Some),
        }
    }

    /// Records a backend stream failure; no further events follow.
    pub fn fail(&mut self, error: ClientError) {
        self.phase = AssemblerPhase::Failed;
        self.pending.clear();
        self.events.emit(&AssemblerEvent::StreamError(error));
    }

    /// Clears accumulated state so the instance can serve another turn.
    pub fn reset(&mut self) {
        self.phase = AssemblerPhase::Idle;
        self.content.clear();
        self.pending.clear();
    }

    fn absorb_fragment(&mut self, fragment: ToolCallFragment) {
        let index = fragment.index;
        if !self.pending.contains_key(&index) {
            let id = fragment
                .id
                .clone()
                .unwrap_or_else(|| format!("tool_call_{index}"));
            self.pending.insert(
                index,
                PendingToolCall {
                    id,
                    name: String::new(),
                    arguments: String::new(),
                },
            );
            self.events.emit(&AssemblerEvent::ToolCallStart { index });
        }

        if let Some(entry) = self.pending.get_mut(&index) {
            if let Some(id) = &fragment.id {
                entry.id = id.clone();
            }
            if let Some(name) = &fragment.name {
                entry.name.push_str(name);
            }
            if let Some(arguments) = &fragment.arguments {
                entry.arguments.push_str(arguments);
            }
        }

        self.events
            .emit(&AssemblerEvent::ToolCallDelta { index, fragment });
    }

    fn finalize(&mut self) -> Result<AssembledTurn, TurnError> {
        let mut requests = Vec::with_capacity(self.pending.len());
        for (index, entry) in &self.pending {
            match ToolCallRequest::decode_arguments(&entry.arguments) {
                Ok(arguments) => requests.push(ToolCallRequest::new(
                    entry.id.clone(),
                    entry.name.clone(),
                    arguments,
                )),
                Err(error) => {
                    self.phase = AssemblerPhase::Failed;
                    return Err(TurnError::malformed_arguments(format!(
                        "tool call '{}' at index {index}: {}",
                        entry.name, error.message
                    )));
                }
            }
        }

        self.pending.clear();
        self.phase = AssemblerPhase::Done;

        for request in &requests {
            self.events.emit(&AssemblerEvent::ToolCallEnd(request.clone()));
        }
        self.events.emit(&AssemblerEvent::StreamEnd(requests.clone()));

        Ok(AssembledTurn {
            content: self.content.clone(),
            tool_calls: requests,
        })
    }
}
