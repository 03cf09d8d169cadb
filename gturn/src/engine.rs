//! Non-streaming and streaming turn handlers over a completion client.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use gclient::{
    CompletionClient, CompletionRequest, CompletionResponse, Message, ToolCallRequest,
};
use gcommon::EventBus;
use gtool::{CallExecutor, ToolRegistry};
use tokio::time::{Instant, timeout_at};

use crate::{
    AssembledTurn, AssemblerEvent, ConversationState, TurnAssembler, TurnError, TurnEvent,
};

/// Wall-clock budget applied to a streaming turn when neither the caller nor
/// the engine builder supplies one.
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(60);

/// Return contract of one handled turn; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub final_content: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

pub struct TurnEngineBuilder {
    client: Arc<dyn CompletionClient>,
    executor: Option<CallExecutor>,
    events: Arc<EventBus<TurnEvent>>,
    assembler_events: Arc<EventBus<AssemblerEvent>>,
    default_timeout: Duration,
}

impl TurnEngineBuilder {
    fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            executor: None,
            events: Arc::new(EventBus::new()),
            assembler_events: Arc::new(EventBus::new()),
            default_timeout: DEFAULT_TURN_TIMEOUT,
        }
    }

    pub fn executor(mut self, executor: CallExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn events(mut self, events: Arc<EventBus<TurnEvent>>) -> Self {
        self.events = events;
        self
    }

    pub fn assembler_events(mut self, assembler_events: Arc<EventBus<AssemblerEvent>>) -> Self {
        self.assembler_events = assembler_events;
        self
    }

    pub fn default_timeout(mut self, default_timeout: Duration) -> Self {
        self.default_timeout = default_timeout;
        self
    }

    pub fn build(self) -> TurnEngine {
        TurnEngine {
            client: self.client,
            executor: self
                .executor
                .unwrap_or_else(|| CallExecutor::new(Arc::new(ToolRegistry::new()))),
            events: self.events,
            assembler_events: self.assembler_events,
            default_timeout: self.default_timeout,
        }
    }
}

/// Drives request/response/tool-loop cycles against one completion client.
///
/// Dependencies are injected explicitly; engines hold no global state and
/// may be shared across concurrent turns as long as each turn owns its
/// [`ConversationState`].
pub struct TurnEngine {
    client: Arc<dyn CompletionClient>,
    executor: CallExecutor,
    events: Arc<EventBus<TurnEvent>>,
    assembler_events: Arc<EventBus<AssemblerEvent>>,
    default_timeout: Duration,
}

impl TurnEngine {
    pub fn builder(client: Arc<dyn CompletionClient>) -> TurnEngineBuilder {
        TurnEngineBuilder::new(client)
    }

    pub fn events(&self) -> Arc<EventBus<TurnEvent>> {
        Arc::clone(&self.events)
    }

    pub fn assembler_events(&self) -> Arc<EventBus<AssemblerEvent>> {
        Arc::clone(&self.assembler_events)
    }

    pub fn executor(&self) -> &CallExecutor {
        &self.executor
    }

    /// Handles one turn without incremental delivery.
    ///
    /// Wall-clock bounds for the blocking HTTP exchanges are the transport
    /// client's concern; this handler imposes none of its own.
    pub async fn run_turn(
        &self,
        state: &mut ConversationState,
    ) -> Result<TurnOutcome, TurnError> {
        let request = self.build_request(state, true);
        let response = self.submit(request).await?;
        let reply = response.reply;

        if reply.is_empty() {
            return Ok(TurnOutcome {
                final_content: String::new(),
                tool_calls: Vec::new(),
            });
        }

        state.push_message(Message::assistant_reply(
            reply.content.clone(),
            reply.tool_calls.clone(),
        ));

        if reply.tool_calls.is_empty() {
            return Ok(TurnOutcome {
                final_content: reply.content.unwrap_or_default(),
                tool_calls: Vec::new(),
            });
        }

        let final_content = self.finish_with_tools(state, &reply.tool_calls).await?;
        Ok(TurnOutcome {
            final_content,
            tool_calls: reply.tool_calls,
        })
    }

    /// Handles one turn whose first leg is streamed, bounded by `timeout`
    /// (engine default when `None`).
    ///
    /// The deadline covers opening the stream, every chunk await, and the
    /// hand-off into tool execution; a timed-out turn discards the partial
    /// assembly and leaves the transcript untouched. The follow-up request
    /// after tool execution runs on a fresh budget.
    pub async fn stream_turn(
        &self,
        state: &mut ConversationState,
        timeout: Option<Duration>,
    ) -> Result<TurnOutcome, TurnError> {
        let timeout = timeout.unwrap_or(self.default_timeout);
        let deadline = Instant::now() + timeout;

        let request = self.build_request(state, true);
        let mut assembler = TurnAssembler::new(Arc::clone(&self.assembler_events));

        let mut stream = match timeout_at(deadline, self.client.submit_streaming(request)).await {
            Err(_elapsed) => {
                return Err(self.fail(TurnError::timeout(
                    "turn budget exceeded while opening the stream",
                )));
            }
            Ok(Err(error)) => return Err(self.fail(TurnError::from(error))),
            Ok(Ok(stream)) => stream,
        };

        let assembled = loop {
            match timeout_at(deadline, stream.next()).await {
                Err(_elapsed) => {
                    return Err(self.fail(TurnError::timeout(
                        "turn budget exceeded while awaiting stream chunks",
                    )));
                }
                Ok(None) => {
                    return Err(self.fail(TurnError::protocol(
                        "stream closed before a finish chunk arrived",
                    )));
                }
                Ok(Some(Err(error))) => {
                    assembler.fail(error.clone());
                    return Err(self.fail(TurnError::from(error)));
                }
                Ok(Some(Ok(chunk))) => match assembler.push(chunk) {
                    Err(error) => return Err(self.fail(error)),
                    Ok(Some(assembled)) => break assembled,
                    Ok(None) => {}
                },
            }
        };
        drop(stream);

        // The budget also covers the hand-off into tool execution; checked
        // before any transcript mutation so a timed-out turn appends nothing.
        if Instant::now() >= deadline {
            return Err(self.fail(TurnError::timeout(
                "turn budget exceeded before tool execution",
            )));
        }

        let AssembledTurn {
            content,
            tool_calls,
        } = assembled;

        if tool_calls.is_empty() {
            state.push_message(Message::assistant(content.clone()));
            return Ok(TurnOutcome {
                final_content: content,
                tool_calls,
            });
        }

        let accumulated = if content.is_empty() {
            None
        } else {
            Some(content)
        };
        state.push_message(Message::assistant_reply(accumulated, tool_calls.clone()));

        let final_content = self.finish_with_tools(state, &tool_calls).await?;
        Ok(TurnOutcome {
            final_content,
            tool_calls,
        })
    }

    /// Shared tail of the tool loop: execute every call sequentially, append
    /// the id-matched tool messages, then ask the backend for the final
    /// answer with tools omitted.
    async fn finish_with_tools(
        &self,
        state: &mut ConversationState,
        calls: &[ToolCallRequest],
    ) -> Result<String, TurnError> {
        let outputs = self.executor.execute_many(calls).await;
        for output in outputs {
            state.push_message(output.into_message());
        }

        let request = self.build_request(state, false);
        let response = self.submit(request).await?;
        let content = response.reply.content.unwrap_or_default();
        state.push_message(Message::assistant(content.clone()));
        Ok(content)
    }

    async fn submit(&self, request: CompletionRequest) -> Result<CompletionResponse, TurnError> {
        match self.client.submit(request).await {
            Ok(response) => {
                self.events.emit(&TurnEvent::Response(response.clone()));
                Ok(response)
            }
            Err(error) => Err(self.fail(TurnError::from(error))),
        }
    }

    fn build_request(&self, state: &ConversationState, include_tools: bool) -> CompletionRequest {
        let mut request = CompletionRequest::new(state.model(), state.messages().to_vec())
            .with_options(state.options().clone());

        if include_tools {
            let definitions = self.executor.definitions();
            if !definitions.is_empty() {
                request = request.with_tools(definitions);
            }
        }

        request
    }

    fn fail(&self, error: TurnError) -> TurnError {
        self.events.emit(&TurnEvent::Failed(error.clone()));
        error
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::task::{Context, Poll};

    use futures_core::Stream;
    use gclient::{
        AssistantReply, BoxedChunkStream, ClientError, ClientFuture, FinishReason, Role,
        StreamChunk, TokenUsage, ToolCallFragment, VecChunkStream,
    };
    use serde_json::json;

    use super::*;

    /// Scripted client: first leg returns a tool call, second leg the final
    /// answer. Records every request it sees.
    struct ScriptedClient {
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedClient {
        fn new() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<CompletionRequest> {
            self.requests.lock().expect("requests lock").clone()
        }

        fn record(&self, request: &CompletionRequest) -> bool {
            let mut requests = self.requests.lock().expect("requests lock");
            let first_leg = !request
                .messages
                .iter()
                .any(|message| message.role == Role::Tool);
            requests.push(request.clone());
            first_leg
        }
    }

    impl CompletionClient for ScriptedClient {
        fn submit<'a>(
            &'a self,
            request: CompletionRequest,
        ) -> ClientFuture<'a, Result<CompletionResponse, ClientError>> {
            Box::pin(async move {
                let first_leg = self.record(&request);
                let reply = if first_leg {
                    AssistantReply {
                        content: None,
                        tool_calls: vec![ToolCallRequest::new(
                            "call_1",
                            "get_weather",
                            json!({"city": "Paris"}),
                        )],
                    }
                } else {
                    AssistantReply {
                        content: Some("It is 20C in Paris.".to_string()),
                        tool_calls: Vec::new(),
                    }
                };

                Ok(CompletionResponse {
                    model: request.model,
                    reply,
                    finish: if first_leg {
                        FinishReason::ToolCalls
                    } else {
                        FinishReason::Stop
                    },
                    usage: TokenUsage::default(),
                })
            })
        }

        fn submit_streaming<'a>(
            &'a self,
            request: CompletionRequest,
        ) -> ClientFuture<'a, Result<BoxedChunkStream<'a>, ClientError>> {
            Box::pin(async move {
                self.record(&request);
                let stream = VecChunkStream::new(vec![
                    Ok(StreamChunk::ContentDelta("checking".to_string())),
                    Ok(StreamChunk::ToolCallFragments(vec![
                        ToolCallFragment::at(0)
                            .with_id("call_1")
                            .with_name("get_weather")
                            .with_arguments("{\"city\":"),
                    ])),
                    Ok(StreamChunk::ToolCallFragments(vec![
                        ToolCallFragment::at(0).with_arguments("\"Paris\"}"),
                    ])),
                    Ok(StreamChunk::Finish(FinishReason::ToolCalls)),
                ]);
                Ok(Box::pin(stream) as BoxedChunkStream<'a>)
            })
        }
    }

    /// Client whose plain responses carry text only.
    struct PlainClient;

    impl CompletionClient for PlainClient {
        fn submit<'a>(
            &'a self,
            request: CompletionRequest,
        ) -> ClientFuture<'a, Result<CompletionResponse, ClientError>> {
            Box::pin(async move {
                Ok(CompletionResponse {
                    model: request.model,
                    reply: AssistantReply {
                        content: Some("Hello!".to_string()),
                        tool_calls: Vec::new(),
                    },
                    finish: FinishReason::Stop,
                    usage: TokenUsage::default(),
                })
            })
        }

        fn submit_streaming<'a>(
            &'a self,
            _request: CompletionRequest,
        ) -> ClientFuture<'a, Result<BoxedChunkStream<'a>, ClientError>> {
            Box::pin(async move {
                let stream = VecChunkStream::new(vec![
                    Ok(StreamChunk::ContentDelta("Hel".to_string())),
                    Ok(StreamChunk::ContentDelta("lo!".to_string())),
                    Ok(StreamChunk::Finish(FinishReason::Stop)),
                ]);
                Ok(Box::pin(stream) as BoxedChunkStream<'a>)
            })
        }
    }

    /// Stream that never yields; used to drive the turn into its deadline.
    struct StalledStream;

    impl Stream for StalledStream {
        type Item = Result<StreamChunk, ClientError>;

        fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            Poll::Pending
        }
    }

    struct StalledClient;

    impl CompletionClient for StalledClient {
        fn submit<'a>(
            &'a self,
            _request: CompletionRequest,
        ) -> ClientFuture<'a, Result<CompletionResponse, ClientError>> {
            Box::pin(async move { Err(ClientError::unavailable("not used")) })
        }

        fn submit_streaming<'a>(
            &'a self,
            _request: CompletionRequest,
        ) -> ClientFuture<'a, Result<BoxedChunkStream<'a>, ClientError>> {
            Box::pin(async move { Ok(Box::pin(StalledStream) as BoxedChunkStream<'a>) })
        }
    }

    fn weather_executor() -> CallExecutor {
        let mut registry = ToolRegistry::new();
        registry
            .register_sync_fn(
                gclient::ToolDefinition {
                    name: "get_weather".to_string(),
                    description: "Looks up weather".to_string(),
                    parameters: json!({
                        "type": "object",
                        "properties": {"city": {"type": "string"}},
                        "required": ["city"]
                    }),
                },
                |_arguments| Ok(json!({"temp": 20})),
            )
            .expect("registration should succeed");
        CallExecutor::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn plain_turn_returns_content_and_appends_one_message() {
        let engine = TurnEngine::builder(Arc::new(PlainClient)).build();
        let mut state = ConversationState::new("gpt-4o-mini");
        state.push_user("Hi");

        let outcome = engine.run_turn(&mut state).await.expect("turn should work");

        assert_eq!(outcome.final_content, "Hello!");
        assert!(outcome.tool_calls.is_empty());
        assert_eq!(state.len(), 2);
        assert_eq!(state.messages()[1], Message::assistant("Hello!"));
    }

    #[tokio::test]
    async fn tool_turn_reconstructs_the_full_transcript() {
        let client = Arc::new(ScriptedClient::new());
        let engine = TurnEngine::builder(client.clone())
            .executor(weather_executor())
            .build();
        let mut state = ConversationState::new("gpt-4o-mini");
        state.push_user("weather in Paris?");

        let outcome = engine.run_turn(&mut state).await.expect("turn should work");

        assert_eq!(outcome.final_content, "It is 20C in Paris.");
        assert_eq!(outcome.tool_calls.len(), 1);

        let messages = state.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].tool_calls.len(), 1);
        assert_eq!(messages[2].role, Role::Tool);
        assert_eq!(messages[2].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(messages[2].text(), "{\"temp\":20}");
        assert_eq!(messages[3], Message::assistant("It is 20C in Paris."));

        // First leg advertises tools, second leg omits them.
        let requests = client.seen();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.len(), 1);
        assert!(requests[1].tools.is_empty());
    }

    #[tokio::test]
    async fn empty_registry_omits_tools_from_the_request() {
        let client = Arc::new(ScriptedClient::new());
        let engine = TurnEngine::builder(client.clone()).build();
        let mut state = ConversationState::new("gpt-4o-mini");
        state.push_user("go");

        let _ = engine.run_turn(&mut state).await;
        assert!(client.seen()[0].tools.is_empty());
    }

    #[tokio::test]
    async fn streaming_turn_assembles_fragments_and_runs_the_tool_loop() {
        let client = Arc::new(ScriptedClient::new());
        let engine = TurnEngine::builder(client.clone())
            .executor(weather_executor())
            .build();
        let mut state = ConversationState::new("gpt-4o-mini");
        state.push_user("weather in Paris?");

        let outcome = engine
            .stream_turn(&mut state, None)
            .await
            .expect("turn should work");

        assert_eq!(outcome.final_content, "It is 20C in Paris.");
        assert_eq!(outcome.tool_calls[0].arguments, json!({"city": "Paris"}));

        let messages = state.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].text(), "checking");
        assert_eq!(messages[1].tool_calls.len(), 1);
        assert_eq!(messages[2].role, Role::Tool);
    }

    #[tokio::test]
    async fn streaming_turn_without_tool_calls_appends_accumulated_text() {
        let engine = TurnEngine::builder(Arc::new(PlainClient)).build();
        let mut state = ConversationState::new("gpt-4o-mini");
        state.push_user("Hi");

        let outcome = engine
            .stream_turn(&mut state, None)
            .await
            .expect("turn should work");

        assert_eq!(outcome.final_content, "Hello!");
        assert_eq!(state.len(), 2);
        assert_eq!(state.messages()[1], Message::assistant("Hello!"));
    }

    #[tokio::test]
    async fn stalled_stream_times_out_without_touching_the_transcript() {
        let engine = TurnEngine::builder(Arc::new(StalledClient)).build();
        let mut state = ConversationState::new("gpt-4o-mini");
        state.push_user("Hi");

        let error = engine
            .stream_turn(&mut state, Some(Duration::from_millis(25)))
            .await
            .expect_err("turn should time out");

        assert_eq!(error.kind, crate::TurnErrorKind::Timeout);
        assert_eq!(state.len(), 1);
    }

    #[tokio::test]
    async fn stream_exhaustion_without_finish_is_a_protocol_error() {
        struct TruncatedClient;

        impl CompletionClient for TruncatedClient {
            fn submit<'a>(
                &'a self,
                _request: CompletionRequest,
            ) -> ClientFuture<'a, Result<CompletionResponse, ClientError>> {
                Box::pin(async move { Err(ClientError::unavailable("not used")) })
            }

            fn submit_streaming<'a>(
                &'a self,
                _request: CompletionRequest,
            ) -> ClientFuture<'a, Result<BoxedChunkStream<'a>, ClientError>> {
                Box::pin(async move {
                    let stream = VecChunkStream::new(vec![Ok(StreamChunk::ContentDelta(
                        "partial".to_string(),
                    ))]);
                    Ok(Box::pin(stream) as BoxedChunkStream<'a>)
                })
            }
        }

        let engine = TurnEngine::builder(Arc::new(TruncatedClient)).build();
        let mut state = ConversationState::new("gpt-4o-mini");
        state.push_user("Hi");

        let error = engine
            .stream_turn(&mut state, None)
            .await
            .expect_err("truncated stream should fail");
        assert_eq!(error.kind, crate::TurnErrorKind::Protocol);
        assert_eq!(state.len(), 1);
    }

    #[tokio::test]
    async fn stream_error_items_propagate_and_emit_failed() {
        struct ErroringClient;

        impl CompletionClient for ErroringClient {
            fn submit<'a>(
                &'a self,
                _request: CompletionRequest,
            ) -> ClientFuture<'a, Result<CompletionResponse, ClientError>> {
                Box::pin(async move { Err(ClientError::unavailable("not used")) })
            }

            fn submit_streaming<'a>(
                &'a self,
                _request: CompletionRequest,
            ) -> ClientFuture<'a, Result<BoxedChunkStream<'a>, ClientError>> {
                Box::pin(async move {
                    let stream = VecChunkStream::new(vec![
                        Ok(StreamChunk::ContentDelta("par".to_string())),
                        Err(ClientError::unavailable("backend fell over")),
                    ]);
                    Ok(Box::pin(stream) as BoxedChunkStream<'a>)
                })
            }
        }

        let engine = TurnEngine::builder(Arc::new(ErroringClient)).build();
        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&failures);
        engine.events().subscribe(move |event: &TurnEvent| {
            if let TurnEvent::Failed(error) = event {
                sink.lock().expect("failures lock").push(error.kind);
            }
        });

        let mut state = ConversationState::new("gpt-4o-mini");
        state.push_user("Hi");

        let error = engine
            .stream_turn(&mut state, None)
            .await
            .expect_err("stream error should fail the turn");

        assert_eq!(error.kind, crate::TurnErrorKind::Backend);
        assert_eq!(
            *failures.lock().expect("failures lock"),
            vec![crate::TurnErrorKind::Backend]
        );
        assert_eq!(state.len(), 1);
    }

    #[tokio::test]
    async fn empty_reply_returns_empty_content_without_appending() {
        struct SilentClient;

        impl CompletionClient for SilentClient {
            fn submit<'a>(
                &'a self,
                request: CompletionRequest,
            ) -> ClientFuture<'a, Result<CompletionResponse, ClientError>> {
                Box::pin(async move {
                    Ok(CompletionResponse {
                        model: request.model,
                        reply: AssistantReply::default(),
                        finish: FinishReason::Stop,
                        usage: TokenUsage::default(),
                    })
                })
            }

            fn submit_streaming<'a>(
                &'a self,
                _request: CompletionRequest,
            ) -> ClientFuture<'a, Result<BoxedChunkStream<'a>, ClientError>> {
                Box::pin(async move {
                    Ok(Box::pin(VecChunkStream::new(Vec::new())) as BoxedChunkStream<'a>)
                })
            }
        }

        let engine = TurnEngine::builder(Arc::new(SilentClient)).build();
        let mut state = ConversationState::new("gpt-4o-mini");
        state.push_user("Hi");

        let outcome = engine.run_turn(&mut state).await.expect("turn should work");
        assert_eq!(outcome.final_content, "");
        assert_eq!(state.len(), 1);
    }

    #[tokio::test]
    async fn response_events_fire_once_per_backend_exchange() {
        let client = Arc::new(ScriptedClient::new());
        let engine = TurnEngine::builder(client)
            .executor(weather_executor())
            .build();

        let responses = Arc::new(Mutex::new(0_usize));
        let sink = Arc::clone(&responses);
        engine.events().subscribe(move |event: &TurnEvent| {
            if matches!(event, TurnEvent::Response(_)) {
                *sink.lock().expect("responses lock") += 1;
            }
        });

        let mut state = ConversationState::new("gpt-4o-mini");
        state.push_user("weather?");
        engine.run_turn(&mut state).await.expect("turn should work");

        assert_eq!(*responses.lock().expect("responses lock"), 2);
    }
}
