//! Canonical conversation model and completion backend boundary.

mod chunk;
mod client;
mod error;
mod model;

#[cfg(feature = "http")]
pub mod openai;

pub mod prelude {
    pub use crate::{
        AssistantReply, BoxedChunkStream, ChunkStream, ClientError, ClientErrorKind, ClientFuture,
        CompletionClient, CompletionRequest, CompletionResponse, FinishReason, Message, Role,
        SamplingOptions, StreamChunk, TokenUsage, ToolCallFragment, ToolCallRequest,
        ToolDefinition, VecChunkStream,
    };

    #[cfg(feature = "http")]
    pub use crate::openai::{ApiKey, OpenAiChatClient};
}

pub use chunk::{BoxedChunkStream, ChunkStream, StreamChunk, ToolCallFragment, VecChunkStream};
pub use client::{ClientFuture, CompletionClient};
pub use error::{ClientError, ClientErrorKind};
pub use model::{
    AssistantReply, CompletionRequest, CompletionResponse, FinishReason, Message,
    RESERVED_OPTION_KEYS, Role, SamplingOptions, TokenUsage, ToolCallRequest, ToolDefinition,
};
