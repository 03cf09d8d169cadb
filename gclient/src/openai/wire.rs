//! Chat-completions HTTP payload serde models and conversion helpers.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{
    AssistantReply, ClientError, CompletionRequest, CompletionResponse, FinishReason, Message,
    Role, StreamChunk, TokenUsage, ToolCallFragment, ToolCallRequest,
};

pub(crate) fn build_api_request(
    request: CompletionRequest,
    stream: bool,
) -> Result<ApiRequest, ClientError> {
    let messages = request
        .messages
        .into_iter()
        .map(ApiMessage::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    if messages.is_empty() {
        return Err(ClientError::invalid_request(
            "completion request requires at least one message",
        ));
    }

    let tools = if request.tools.is_empty() {
        None
    } else {
        Some(
            request
                .tools
                .into_iter()
                .map(|tool| ApiTool {
                    r#type: "function".to_string(),
                    function: ApiFunction {
                        name: tool.name,
                        description: tool.description,
                        parameters: tool.parameters,
                    },
                })
                .collect(),
        )
    };

    Ok(ApiRequest {
        model: request.model,
        messages,
        tools,
        temperature: request.options.temperature,
        top_p: request.options.top_p,
        max_tokens: request.options.max_tokens,
        stream,
        extra: request.options.extra().clone(),
    })
}

pub(crate) fn parse_finish_reason(value: Option<&str>) -> FinishReason {
    match value {
        Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some("tool_calls") => FinishReason::ToolCalls,
        _ => FinishReason::Other,
    }
}

pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ApiErrorEnvelope>(body).ok()?;
    Some(parsed.error.message)
}

fn role_as_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorEnvelope {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ApiRequest {
    pub model: String,
    pub messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ApiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
    #[serde(flatten)]
    pub extra: std::collections::BTreeMap<String, JsonValue>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ApiMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl TryFrom<Message> for ApiMessage {
    type Error = ClientError;

    fn try_from(value: Message) -> Result<Self, Self::Error> {
        if value.role != Role::Assistant && value.text().trim().is_empty() {
            return Err(ClientError::invalid_request(
                "message content must not be empty",
            ));
        }

        let tool_calls = if value.tool_calls.is_empty() {
            None
        } else {
            Some(
                value
                    .tool_calls
                    .into_iter()
                    .map(ApiToolCall::try_from)
                    .collect::<Result<Vec<_>, _>>()?,
            )
        };

        Ok(Self {
            role: role_as_str(value.role).to_string(),
            content: value.content,
            tool_calls,
            tool_call_id: value.tool_call_id,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ApiToolCall {
    pub id: String,
    pub r#type: String,
    pub function: ApiFunctionCall,
}

impl TryFrom<ToolCallRequest> for ApiToolCall {
    type Error = ClientError;

    fn try_from(value: ToolCallRequest) -> Result<Self, Self::Error> {
        let arguments = serde_json::to_string(&value.arguments).map_err(|err| {
            ClientError::invalid_request(format!("tool call arguments failed to serialize: {err}"))
        })?;

        Ok(Self {
            id: value.id,
            r#type: "function".to_string(),
            function: ApiFunctionCall {
                name: value.name,
                arguments,
            },
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ApiFunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ApiTool {
    pub r#type: String,
    pub function: ApiFunction,
}

#[derive(Debug, Serialize)]
pub(crate) struct ApiFunction {
    pub name: String,
    pub description: String,
    pub parameters: JsonValue,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse {
    pub model: String,
    pub choices: Vec<ApiChoice>,
    pub usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiChoice {
    pub message: ApiAssistantMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiAssistantMessage {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ApiResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponseToolCall {
    pub id: String,
    pub function: ApiResponseFunction,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponseFunction {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

pub(crate) fn response_from_api(value: ApiResponse) -> Result<CompletionResponse, ClientError> {
    let choice = value
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ClientError::transport("completion response did not include choices"))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| {
            let arguments = ToolCallRequest::decode_arguments(&call.function.arguments)?;
            Ok(ToolCallRequest::new(call.id, call.function.name, arguments))
        })
        .collect::<Result<Vec<_>, ClientError>>()?;

    let usage = value.usage.map_or(TokenUsage::default(), |usage| TokenUsage {
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    });

    Ok(CompletionResponse {
        model: value.model,
        reply: AssistantReply {
            content: choice.message.content,
            tool_calls,
        },
        finish: parse_finish_reason(choice.finish_reason.as_deref()),
        usage,
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiStreamResponse {
    pub choices: Vec<ApiStreamChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiStreamChoice {
    pub delta: ApiStreamDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct ApiStreamDelta {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ApiDeltaToolCall>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiDeltaToolCall {
    pub index: Option<u32>,
    pub id: Option<String>,
    pub function: Option<ApiDeltaFunction>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiDeltaFunction {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// Decodes one SSE `data:` payload into zero or more chunks.
///
/// Fragments are passed through raw; reassembly belongs to the turn
/// assembler, not the transport.
pub(crate) fn decode_stream_data(payload: &str) -> Result<Vec<StreamChunk>, ClientError> {
    let parsed: ApiStreamResponse = serde_json::from_str(payload)
        .map_err(|err| ClientError::transport(format!("malformed stream payload: {err}")))?;

    let mut chunks = Vec::new();
    let Some(choice) = parsed.choices.into_iter().next() else {
        return Ok(chunks);
    };

    if let Some(content) = choice.delta.content
        && !content.is_empty()
    {
        chunks.push(StreamChunk::ContentDelta(content));
    }

    if let Some(delta_calls) = choice.delta.tool_calls
        && !delta_calls.is_empty()
    {
        let fragments = delta_calls
            .into_iter()
            .map(|call| {
                let (name, arguments) = call
                    .function
                    .map(|function| (function.name, function.arguments))
                    .unwrap_or_default();

                ToolCallFragment {
                    index: call.index.unwrap_or(0),
                    id: call.id,
                    name,
                    arguments,
                }
            })
            .collect();

        chunks.push(StreamChunk::ToolCallFragments(fragments));
    }

    if let Some(reason) = choice.finish_reason.as_deref() {
        chunks.push(StreamChunk::Finish(parse_finish_reason(Some(reason))));
    }

    Ok(chunks)
}
