//! Observability listeners for turn, tool, and assembler event buses.

mod metrics_listeners;
mod tracing_listeners;


pub use metrics_listeners::MetricsEventLog;
pub use tracing_listeners::TracingEventLog;
