//! Reqwest-based chat-completions client.

use std::fmt::Formatter;

use async_stream::try_stream;
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};

use crate::{
    BoxedChunkStream, ClientError, ClientFuture, CompletionClient, CompletionRequest,
    CompletionResponse, StreamChunk,
};

use super::wire::{build_api_request, decode_stream_data, extract_error_message};

/// Bearer credential with a redacted `Debug` representation.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl From<String> for ApiKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ApiKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    http: Client,
    base_url: String,
    api_key: ApiKey,
}

impl OpenAiChatClient {
    pub fn new(http: Client, api_key: impl Into<ApiKey>) -> Self {
        Self {
            http,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: api_key.into(),
        }
    }

    /// Points the client at any chat-completions-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn send_error(err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::timeout(err.to_string())
        } else {
            ClientError::transport(err.to_string())
        }
    }

    async fn parse_error(response: Response) -> ClientError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("completion request failed with status {status}"));

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ClientError::authentication(message)
            }
            StatusCode::TOO_MANY_REQUESTS => ClientError::rate_limited(message),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                ClientError::timeout(message)
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ClientError::invalid_request(message)
            }
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
                ClientError::unavailable(message)
            }
            _ => ClientError::transport(message),
        }
    }
}

impl CompletionClient for OpenAiChatClient {
    fn submit<'a>(
        &'a self,
        request: CompletionRequest,
    ) -> ClientFuture<'a, Result<CompletionResponse, ClientError>> {
        Box::pin(async move {
            request.validate()?;
            let api_request = build_api_request(request, false)?;
            let url = self.endpoint("chat/completions");
            let response = self
                .http
                .post(url)
                .bearer_auth(self.api_key.expose())
                .json(&api_request)
                .send()
                .await
                .map_err(Self::send_error)?;

            if !response.status().is_success() {
                return Err(Self::parse_error(response).await);
            }

            let parsed: super::wire::ApiResponse = response
                .json()
                .await
                .map_err(|err| ClientError::transport(err.to_string()))?;

            super::wire::response_from_api(parsed)
        })
    }

    fn submit_streaming<'a>(
        &'a self,
        request: CompletionRequest,
    ) -> ClientFuture<'a, Result<BoxedChunkStream<'a>, ClientError>> {
        Box::pin(async move {
            request.validate()?;
            let api_request = build_api_request(request, true)?;
            let url = self.endpoint("chat/completions");
            let response = self
                .http
                .post(url)
                .bearer_auth(self.api_key.expose())
                .json(&api_request)
                .send()
                .await
                .map_err(Self::send_error)?;

            if !response.status().is_success() {
                return Err(Self::parse_error(response).await);
            }

            let stream = try_stream! {
                let mut bytes = response.bytes_stream();
                let mut sse_buffer = String::new();
                let mut finish_seen = false;

                'receive: while let Some(item) = bytes.next().await {
                    let data = item.map_err(|err| ClientError::transport(err.to_string()))?;
                    let text = std::str::from_utf8(&data)
                        .map_err(|err| ClientError::transport(err.to_string()))?;
                    sse_buffer.push_str(text);

                    while let Some(newline_index) = sse_buffer.find('\n') {
                        let line = sse_buffer.drain(..=newline_index).collect::<String>();
                        let line = line.trim();

                        if !line.starts_with("data:") {
                            continue;
                        }

                        let payload = line.trim_start_matches("data:").trim();
                        if payload == "[DONE]" {
                            // Well-behaved backends send finish_reason first;
                            // synthesize one otherwise so the turn can finalize.
                            if !finish_seen {
                                yield StreamChunk::Finish(crate::FinishReason::Other);
                            }
                            break 'receive;
                        }

                        for chunk in decode_stream_data(payload)? {
                            if matches!(chunk, StreamChunk::Finish(_)) {
                                finish_seen = true;
                            }
                            yield chunk;
                        }
                    }
                }
            };

            Ok(Box::pin(stream) as BoxedChunkStream<'a>)
        })
    }
}
