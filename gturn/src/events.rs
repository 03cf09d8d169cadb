//! Closed event kinds emitted during turn handling.
//!
//! Listeners subscribe through [`gcommon::EventBus`]; each variant carries
//! its full payload so observers never re-parse loosely-typed event names.

use gclient::{ClientError, CompletionResponse, ToolCallFragment, ToolCallRequest};

use crate::TurnError;

/// Lifecycle of one streamed backend turn inside the assembler.
#[derive(Debug, Clone, PartialEq)]
pub enum AssemblerEvent {
    ContentDelta(String),
    ToolCallStart { index: u32 },
    ToolCallDelta { index: u32, fragment: ToolCallFragment },
    ToolCallEnd(ToolCallRequest),
    StreamEnd(Vec<ToolCallRequest>),
    StreamError(ClientError),
}

/// Turn-level milestones: one per completed backend exchange, one per fatal
/// failure (emitted before the failure propagates to the caller).
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    Response(CompletionResponse),
    Failed(TurnError),
}
