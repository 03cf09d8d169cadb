//! Canonical message, tool-call, request, and response types.
//!
//! The whole workspace shares this one data family; wire adapters convert
//! backend payloads into it at the boundary instead of keeping per-backend
//! clones of the transcript types.
//!
//! ```rust
//! use gclient::{CompletionRequest, Message};
//!
//! let request = CompletionRequest::new(
//!     "gpt-4o-mini",
//!     vec![Message::user("Summarize this diff")],
//! );
//! assert!(request.validate().is_ok());
//! ```

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One backend-issued request to invoke a registered tool.
///
/// `arguments` is always decoded JSON by the time a request escapes the
/// assembler or a wire adapter; raw argument text exists only inside
/// [`crate::ToolCallFragment`] buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: JsonValue,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: JsonValue) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Decodes accumulated argument text. Empty text decodes to an empty
    /// object; anything else must parse as a JSON object or array.
    pub fn decode_arguments(raw: &str) -> Result<JsonValue, ClientError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(JsonValue::Object(serde_json::Map::new()));
        }

        let value: JsonValue = serde_json::from_str(trimmed).map_err(|err| {
            ClientError::invalid_request(format!("tool arguments are not valid JSON: {err}"))
        })?;

        if !(value.is_object() || value.is_array()) {
            return Err(ClientError::invalid_request(
                "tool arguments must decode to a JSON object or array",
            ));
        }

        Ok(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub tool_call_id: Option<String>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Assistant message carrying tool calls and possibly accumulated text.
    pub fn assistant_reply(content: Option<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Tool-result message; the only constructor that sets `tool_call_id`,
    /// which keeps the id-reference invariant at the type boundary.
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: JsonValue,
}

/// Keys that never belong in [`SamplingOptions::extra`]; streaming and
/// timeouts are turn-handler concerns, not persisted state.
pub const RESERVED_OPTION_KEYS: [&str; 3] = ["stream", "timeout", "turn_timeout"];

/// Per-turn sampling configuration.
///
/// Reserved keys are silently dropped from the `extra` map.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SamplingOptions {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    extra: BTreeMap<String, JsonValue>,
}

impl SamplingOptions {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.set_extra(key, value);
        self
    }

    pub fn set_extra(&mut self, key: impl Into<String>, value: JsonValue) {
        let key = key.into();
        if RESERVED_OPTION_KEYS.contains(&key.as_str()) {
            return;
        }

        self.extra.insert(key, value);
    }

    pub fn extra(&self) -> &BTreeMap<String, JsonValue> {
        &self.extra
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub options: SamplingOptions,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            options: SamplingOptions::default(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_options(mut self, options: SamplingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.model.trim().is_empty() {
            return Err(ClientError::invalid_request("model must not be empty"));
        }

        if self.messages.is_empty() {
            return Err(ClientError::invalid_request(
                "at least one message is required",
            ));
        }

        if let Some(max_tokens) = self.options.max_tokens
            && max_tokens == 0
        {
            return Err(ClientError::invalid_request(
                "max_tokens must be greater than zero",
            ));
        }

        if let Some(temperature) = self.options.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(ClientError::invalid_request(
                "temperature must be in the inclusive range 0.0..=2.0",
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// First-choice assistant output of one completion exchange.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssistantReply {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl AssistantReply {
    pub fn is_empty(&self) -> bool {
        self.content.as_deref().map(str::trim).unwrap_or_default().is_empty()
            && self.tool_calls.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub model: String,
    pub reply: AssistantReply,
    pub finish: FinishReason,
    pub usage: TokenUsage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_validation_enforces_contract() {
        let empty_model = CompletionRequest::new("   ", vec![Message::user("hi")]);
        assert!(empty_model.validate().is_err());

        let empty_messages = CompletionRequest::new("gpt-4o-mini", Vec::new());
        assert!(empty_messages.validate().is_err());

        let bad_temperature = CompletionRequest::new("gpt-4o-mini", vec![Message::user("hi")])
            .with_options(SamplingOptions::default().with_temperature(2.5));
        assert!(bad_temperature.validate().is_err());

        let valid = CompletionRequest::new("gpt-4o-mini", vec![Message::user("hi")])
            .with_options(SamplingOptions::default().with_temperature(0.4).with_max_tokens(128));
        assert!(valid.validate().is_ok());
    }

    #[test]
    fn sampling_options_drop_reserved_extra_keys() {
        let options = SamplingOptions::default()
            .with_extra("stream", JsonValue::Bool(true))
            .with_extra("timeout", JsonValue::from(30))
            .with_extra("turn_timeout", JsonValue::from(30))
            .with_extra("seed", JsonValue::from(7));

        assert_eq!(options.extra().len(), 1);
        assert_eq!(options.extra().get("seed"), Some(&JsonValue::from(7)));
    }

    #[test]
    fn decode_arguments_maps_empty_text_to_empty_object() {
        let decoded = ToolCallRequest::decode_arguments("").expect("empty should decode");
        assert_eq!(decoded, JsonValue::Object(serde_json::Map::new()));

        let decoded = ToolCallRequest::decode_arguments("  ").expect("blank should decode");
        assert!(decoded.as_object().is_some_and(|map| map.is_empty()));
    }

    #[test]
    fn decode_arguments_rejects_scalars_and_garbage() {
        assert!(ToolCallRequest::decode_arguments("{\"a\":1}").is_ok());
        assert!(ToolCallRequest::decode_arguments("[1,2]").is_ok());
        assert!(ToolCallRequest::decode_arguments("42").is_err());
        assert!(ToolCallRequest::decode_arguments("{\"a\":").is_err());
    }

    #[test]
    fn tool_message_constructor_carries_call_id() {
        let message = Message::tool("call_1", "{\"temp\":20}");
        assert_eq!(message.role, Role::Tool);
        assert_eq!(message.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(message.text(), "{\"temp\":20}");
    }

    #[test]
    fn assistant_reply_emptiness_ignores_whitespace() {
        assert!(AssistantReply::default().is_empty());
        assert!(
            AssistantReply {
                content: Some("  ".to_string()),
                tool_calls: Vec::new(),
            }
            .is_empty()
        );
        assert!(
            !AssistantReply {
                content: None,
                tool_calls: vec![ToolCallRequest::new("c1", "lookup", JsonValue::Null)],
            }
            .is_empty()
        );
    }
}
