//! OpenAI-compatible chat-completions adapter.
//!
//! Converts the canonical data model to and from the wire schema and decodes
//! server-sent-event lines into raw [`crate::StreamChunk`]s; fragment
//! reassembly happens downstream in the turn engine.

mod transport;
mod wire;

pub use transport::{ApiKey, OpenAiChatClient};
