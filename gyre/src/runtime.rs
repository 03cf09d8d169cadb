//! Runtime wiring helpers for common engine setups.

use std::sync::Arc;

use gclient::CompletionClient;
use gobserve::{MetricsEventLog, TracingEventLog};
use gtool::{CallExecutor, ToolRegistry};
use gturn::TurnEngine;

pub fn build_engine(client: Arc<dyn CompletionClient>) -> TurnEngine {
    TurnEngine::builder(client).build()
}

pub fn build_engine_with_tools(
    client: Arc<dyn CompletionClient>,
    registry: Arc<ToolRegistry>,
) -> TurnEngine {
    TurnEngine::builder(client)
        .executor(CallExecutor::new(registry))
        .build()
}

/// Engine with tracing and metrics listeners already attached to its turn,
/// assembler, and tool buses.
pub fn observed_engine(
    client: Arc<dyn CompletionClient>,
    registry: Arc<ToolRegistry>,
) -> TurnEngine {
    let engine = build_engine_with_tools(client, registry);
    TracingEventLog::attach(&engine);
    MetricsEventLog::attach(&engine);
    engine
}
