//! Unified facade over the gyre workspace crates.
//!
//! This crate is designed to be the single dependency for most applications.
//! It re-exports the core crates and provides convenience wiring for common
//! engine setups.

pub mod prelude;
pub mod runtime;

pub use gclient;
pub use gcommon;
pub use gobserve;
pub use gtool;
pub use gturn;

pub use gclient::{
    AssistantReply, BoxedChunkStream, ChunkStream, ClientError, ClientErrorKind, ClientFuture,
    CompletionClient, CompletionRequest, CompletionResponse, FinishReason, Message, Role,
    SamplingOptions, StreamChunk, TokenUsage, ToolCallFragment, ToolCallRequest, ToolDefinition,
    VecChunkStream,
};
pub use gcommon::{BoxFuture, EventBus, Registry};
pub use gobserve::{MetricsEventLog, TracingEventLog};
pub use gtool::{
    CallExecutor, FunctionTool, Tool, ToolCallOutput, ToolError, ToolErrorKind, ToolEvent,
    ToolFuture, ToolRegistry, arguments_object, optional_str, required_str,
};
pub use gturn::{
    AssembledTurn, AssemblerEvent, AssemblerPhase, ConversationState, DEFAULT_TURN_TIMEOUT,
    TurnAssembler, TurnEngine, TurnEngineBuilder, TurnError, TurnErrorKind, TurnEvent, TurnOutcome,
};

#[cfg(feature = "http")]
pub use gclient::openai::{ApiKey, OpenAiChatClient};

pub use runtime::{build_engine, build_engine_with_tools, observed_engine};
