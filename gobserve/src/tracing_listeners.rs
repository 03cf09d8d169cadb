//! Tracing-based listeners for turn, tool, and assembler events.
//!
//! ```rust
//! use gcommon::EventBus;
//! use gobserve::TracingEventLog;
//! use gturn::TurnEvent;
//!
//! let bus: std::sync::Arc<EventBus<TurnEvent>> = std::sync::Arc::new(EventBus::new());
//! TracingEventLog::attach_turn(&bus);
//! assert_eq!(bus.listener_count(), 1);
//! ```

use gcommon::EventBus;
use gtool::ToolEvent;
use gturn::{AssemblerEvent, TurnEvent};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventLog;

impl TracingEventLog {
    /// Attaches all three listeners to one engine's buses.
    pub fn attach(engine: &gturn::TurnEngine) {
        Self::attach_turn(&engine.events());
        Self::attach_assembler(&engine.assembler_events());
        Self::attach_tool(&engine.executor().events());
    }

    pub fn attach_turn(events: &EventBus<TurnEvent>) {
        events.subscribe(|event: &TurnEvent| match event {
            TurnEvent::Response(response) => {
                tracing::info!(
                    phase = "turn",
                    event = "response",
                    model = response.model,
                    finish = ?response.finish,
                    tool_calls = response.reply.tool_calls.len(),
                    output_tokens = response.usage.output_tokens
                );
            }
            TurnEvent::Failed(error) => {
                tracing::error!(
                    phase = "turn",
                    event = "failed",
                    error_kind = ?error.kind,
                    error = %error
                );
            }
        });
    }

    pub fn attach_tool(events: &EventBus<ToolEvent>) {
        events.subscribe(|event: &ToolEvent| match event {
            ToolEvent::Executing { call } => {
                tracing::info!(
                    phase = "tool",
                    event = "executing",
                    tool_name = call.name,
                    tool_call_id = call.id
                );
            }
            ToolEvent::Executed { call, elapsed, .. } => {
                tracing::info!(
                    phase = "tool",
                    event = "executed",
                    tool_name = call.name,
                    tool_call_id = call.id,
                    elapsed_ms = elapsed.as_millis() as u64
                );
            }
            ToolEvent::Failed {
                call,
                error,
                elapsed,
            } => {
                tracing::error!(
                    phase = "tool",
                    event = "failed",
                    tool_name = call.name,
                    tool_call_id = call.id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    error_kind = ?error.kind,
                    error = %error
                );
            }
        });
    }

    pub fn attach_assembler(events: &EventBus<AssemblerEvent>) {
        events.subscribe(|event: &AssemblerEvent| match event {
            AssemblerEvent::ContentDelta(delta) => {
                tracing::trace!(phase = "assembler", event = "content_delta", bytes = delta.len());
            }
            AssemblerEvent::ToolCallStart { index } => {
                tracing::debug!(phase = "assembler", event = "tool_call_start", index);
            }
            AssemblerEvent::ToolCallDelta { index, .. } => {
                tracing::trace!(phase = "assembler", event = "tool_call_delta", index);
            }
            AssemblerEvent::ToolCallEnd(request) => {
                tracing::debug!(
                    phase = "assembler",
                    event = "tool_call_end",
                    tool_name = request.name,
                    tool_call_id = request.id
                );
            }
            AssemblerEvent::StreamEnd(requests) => {
                tracing::info!(
                    phase = "assembler",
                    event = "stream_end",
                    tool_calls = requests.len()
                );
            }
            AssemblerEvent::StreamError(error) => {
                tracing::error!(
                    phase = "assembler",
                    event = "stream_error",
                    error_kind = ?error.kind,
                    error = %error
                );
            }
        });
    }
}
