//! Metrics-based listeners for turn, tool, and assembler events.
//!
//! ```rust
//! use gcommon::EventBus;
//! use gobserve::MetricsEventLog;
//! use gtool::ToolEvent;
//!
//! let bus: std::sync::Arc<EventBus<ToolEvent>> = std::sync::Arc::new(EventBus::new());
//! MetricsEventLog::attach_tool(&bus);
//! assert_eq!(bus.listener_count(), 1);
//! ```

use gcommon::EventBus;
use gtool::ToolEvent;
use gturn::{AssemblerEvent, TurnEvent};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsEventLog;

impl MetricsEventLog {
    /// Attaches all three listeners to one engine's buses.
    pub fn attach(engine: &gturn::TurnEngine) {
        Self::attach_turn(&engine.events());
        Self::attach_assembler(&engine.assembler_events());
        Self::attach_tool(&engine.executor().events());
    }

    pub fn attach_turn(events: &EventBus<TurnEvent>) {
        events.subscribe(|event: &TurnEvent| match event {
            TurnEvent::Response(response) => {
                metrics::counter!(
                    "gyre_turn_response_total",
                    "finish" => format!("{:?}", response.finish)
                )
                .increment(1);
            }
            TurnEvent::Failed(error) => {
                metrics::counter!(
                    "gyre_turn_failure_total",
                    "error_kind" => format!("{:?}", error.kind)
                )
                .increment(1);
            }
        });
    }

    pub fn attach_tool(events: &EventBus<ToolEvent>) {
        events.subscribe(|event: &ToolEvent| match event {
            ToolEvent::Executing { call } => {
                metrics::counter!(
                    "gyre_tool_execution_start_total",
                    "tool_name" => call.name.clone()
                )
                .increment(1);
            }
            ToolEvent::Executed { call, elapsed, .. } => {
                metrics::counter!(
                    "gyre_tool_execution_success_total",
                    "tool_name" => call.name.clone()
                )
                .increment(1);
                metrics::histogram!(
                    "gyre_tool_execution_duration_seconds",
                    "tool_name" => call.name.clone(),
                    "status" => "success"
                )
                .record(elapsed.as_secs_f64());
            }
            ToolEvent::Failed {
                call,
                error,
                elapsed,
            } => {
                metrics::counter!(
                    "gyre_tool_execution_failure_total",
                    "tool_name" => call.name.clone(),
                    "error_kind" => format!("{:?}", error.kind)
                )
                .increment(1);
                metrics::histogram!(
                    "gyre_tool_execution_duration_seconds",
                    "tool_name" => call.name.clone(),
                    "status" => "failure"
                )
                .record(elapsed.as_secs_f64());
            }
        });
    }

    pub fn attach_assembler(events: &EventBus<AssemblerEvent>) {
        events.subscribe(|event: &AssemblerEvent| match event {
            AssemblerEvent::ContentDelta(delta) => {
                metrics::counter!("gyre_stream_content_bytes_total").increment(delta.len() as u64);
            }
            AssemblerEvent::ToolCallStart { .. } => {
                metrics::counter!("gyre_stream_tool_call_total").increment(1);
            }
            AssemblerEvent::ToolCallDelta { .. } | AssemblerEvent::ToolCallEnd(_) => {}
            AssemblerEvent::StreamEnd(requests) => {
                metrics::counter!("gyre_stream_end_total").increment(1);
                metrics::histogram!("gyre_stream_tool_calls_per_turn")
                    .record(requests.len() as f64);
            }
            AssemblerEvent::StreamError(error) => {
                metrics::counter!(
                    "gyre_stream_failure_total",
                    "error_kind" => format!("{:?}", error.kind)
                )
                .increment(1);
            }
        });
    }
}
