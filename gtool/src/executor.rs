//! Registry-backed executor that turns tool calls into wire-safe results.
//!
//! A tool failure must never abort the surrounding turn: the conversation
//! continues with the failure visible to the model as a JSON error payload.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use gclient::{Message, ToolCallRequest, ToolDefinition};
use gcommon::EventBus;
use serde_json::Value as JsonValue;

use crate::{ToolError, ToolErrorKind, ToolRegistry};

#[derive(Debug, Clone, PartialEq)]
pub enum ToolEvent {
    Executing {
        call: ToolCallRequest,
    },
    Executed {
        call: ToolCallRequest,
        output: String,
        elapsed: Duration,
    },
    Failed {
        call: ToolCallRequest,
        error: ToolError,
        elapsed: Duration,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallOutput {
    pub tool_call_id: String,
    pub output: String,
}

impl ToolCallOutput {
    pub fn new(tool_call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            output: output.into(),
        }
    }

    pub fn into_message(self) -> Message {
        Message::tool(self.tool_call_id, self.output)
    }
}

#[derive(Clone)]
pub struct CallExecutor {
    registry: Arc<ToolRegistry>,
    events: Arc<EventBus<ToolEvent>>,
}

impl CallExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            events: Arc::new(EventBus::new()),
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus<ToolEvent>>) -> Self {
        self.events = events;
        self
    }

    pub fn registry(&self) -> Arc<ToolRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn events(&self) -> Arc<EventBus<ToolEvent>> {
        Arc::clone(&self.events)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    /// Executes one call. Infallible to the caller: every failure mode is
    /// rendered as a JSON error payload.
    pub async fn execute(&self, call: &ToolCallRequest) -> String {
        self.events.emit(&ToolEvent::Executing { call: call.clone() });
        let started = Instant::now();
        let outcome = self.run_tool(call).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(output) => {
                self.events.emit(&ToolEvent::Executed {
                    call: call.clone(),
                    output: output.clone(),
                    elapsed,
                });
                output
            }
            Err(error) => {
                if error.kind == ToolErrorKind::Unexpected {
                    tracing::error!(
                        tool_name = call.name,
                        tool_call_id = call.id,
                        error = %error,
                        "tool execution raised an unexpected failure"
                    );
                }

                let payload = error_payload(&error);
                self.events.emit(&ToolEvent::Failed {
                    call: call.clone(),
                    error,
                    elapsed,
                });
                payload
            }
        }
    }

    /// Executes calls sequentially in request order; each failure is absorbed
    /// independently, so one broken call never starves the rest.
    pub async fn execute_many(&self, calls: &[ToolCallRequest]) -> Vec<ToolCallOutput> {
        let mut outputs = Vec::with_capacity(calls.len());
        for call in calls {
            let output = self.execute(call).await;
            outputs.push(ToolCallOutput::new(call.id.clone(), output));
        }

        outputs
    }

    async fn run_tool(&self, call: &ToolCallRequest) -> Result<String, ToolError> {
        if !self.registry.has(&call.name) {
            return Err(
                ToolError::not_found(format!("tool '{}' is not registered", call.name))
                    .with_tool_name(call.name.clone()),
            );
        }

        let invocation = AssertUnwindSafe(self.registry.invoke(&call.name, &call.arguments));
        match invocation.catch_unwind().await {
            Ok(Ok(value)) => render_output(value),
            Ok(Err(error)) => {
                if error.tool_name.is_some() {
                    Err(error)
                } else {
                    Err(error.with_tool_name(call.name.clone()))
                }
            }
            Err(panic) => Err(
                ToolError::unexpected(panic_message(panic)).with_tool_name(call.name.clone()),
            ),
        }
    }
}

fn render_output(value: JsonValue) -> Result<String, ToolError> {
    match value {
        JsonValue::String(text) => Ok(text),
        other => serde_json::to_string(&other)
            .map_err(|err| ToolError::unexpected(format!("tool result failed to serialize: {err}"))),
    }
}

fn error_payload(error: &ToolError) -> String {
    let mut payload = serde_json::Map::new();
    payload.insert(
        "error".to_string(),
        JsonValue::String(error.kind.wire_code().to_string()),
    );
    if let Some(tool_name) = &error.tool_name {
        payload.insert("tool".to_string(), JsonValue::String(tool_name.clone()));
    }
    payload.insert(
        "message".to_string(),
        JsonValue::String(error.message.clone()),
    );
    if let Some(details) = &error.details {
        payload.insert("details".to_string(), details.clone());
    }

    JsonValue::Object(payload).to_string()
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "tool implementation panicked".to_string()
    }
}
