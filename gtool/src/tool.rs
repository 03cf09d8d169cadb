//! Tool trait contract for registry-managed capabilities.
//!
//! ```rust
//! use gclient::ToolDefinition;
//! use gtool::{FunctionTool, Tool};
//! use serde_json::json;
//!
//! let tool = FunctionTool::new(
//!     ToolDefinition {
//!         name: "echo".to_string(),
//!         description: "Echoes input".to_string(),
//!         parameters: json!({"type": "object"}),
//!     },
//!     |arguments| async move { Ok(arguments) },
//! );
//!
//! assert_eq!(tool.definition().name, "echo");
//! ```

use std::future::Future;
use std::sync::Arc;

use gclient::ToolDefinition;
use gcommon::BoxFuture;
use serde_json::Value as JsonValue;

use crate::ToolError;

pub type ToolFuture<'a, T> = BoxFuture<'a, T>;

pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    fn invoke<'a>(
        &'a self,
        arguments: &'a JsonValue,
    ) -> ToolFuture<'a, Result<JsonValue, ToolError>>;
}

type ToolHandler =
    dyn Fn(JsonValue) -> ToolFuture<'static, Result<JsonValue, ToolError>> + Send + Sync;

pub struct FunctionTool {
    definition: ToolDefinition,
    handler: Arc<ToolHandler>,
}

impl FunctionTool {
    pub fn new<F, Fut>(definition: ToolDefinition, handler: F) -> Self
    where
        F: Fn(JsonValue) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JsonValue, ToolError>> + Send + 'static,
    {
        let handler: Arc<ToolHandler> = Arc::new(move |arguments| Box::pin(handler(arguments)));

        Self {
            definition,
            handler,
        }
    }
}

impl Tool for FunctionTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    fn invoke<'a>(
        &'a self,
        arguments: &'a JsonValue,
    ) -> ToolFuture<'a, Result<JsonValue, ToolError>> {
        (self.handler)(arguments.clone())
    }
}
