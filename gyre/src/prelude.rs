//! Single-import surface for applications building on gyre.

pub use gclient::prelude::*;
pub use gcommon::{BoxFuture, EventBus, Registry};
pub use gobserve::{MetricsEventLog, TracingEventLog};
pub use gtool::prelude::*;
pub use gturn::prelude::*;

pub use crate::runtime::{build_engine, build_engine_with_tools, observed_engine};
