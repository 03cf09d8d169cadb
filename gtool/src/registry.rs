//! Tool registry with schema-validated registration and ordered listing.

use std::future::Future;
use std::sync::Arc;

use gclient::ToolDefinition;
use gcommon::Registry;
use serde_json::Value as JsonValue;

use crate::{FunctionTool, Tool, ToolError, ToolFuture};

#[derive(Default)]
pub struct ToolRegistry {
    tools: Registry<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool after validating its parameter schema. Re-registering
    /// a name replaces the prior entry; the advertised order keeps the
    /// first-registration position.
    pub fn register<T>(&mut self, tool: T) -> Result<(), ToolError>
    where
        T: Tool + 'static,
    {
        let definition = tool.definition();
        validate_parameter_schema(&definition)?;
        self.tools.insert(definition.name, Arc::new(tool));
        Ok(())
    }

    pub fn register_fn<F, Fut>(
        &mut self,
        definition: ToolDefinition,
        handler: F,
    ) -> Result<(), ToolError>
    where
        F: Fn(JsonValue) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JsonValue, ToolError>> + Send + 'static,
    {
        self.register(FunctionTool::new(definition, handler))
    }

    pub fn register_sync_fn<F>(
        &mut self,
        definition: ToolDefinition,
        handler: F,
    ) -> Result<(), ToolError>
    where
        F: Fn(JsonValue) -> Result<JsonValue, ToolError> + Send + Sync + 'static,
    {
        self.register_fn(definition, move |arguments| {
            let output = handler(arguments);
            async move { output }
        })
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn invoke<'a>(
        &'a self,
        name: &'a str,
        arguments: &'a JsonValue,
    ) -> ToolFuture<'a, Result<JsonValue, ToolError>> {
        Box::pin(async move {
            let tool = self.get(name).ok_or_else(|| {
                ToolError::not_found(format!("tool '{name}' is not registered"))
                    .with_tool_name(name)
            })?;

            tool.invoke(arguments).await
        })
    }

    /// Definitions in registration order, for advertising to the backend.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn validate_parameter_schema(definition: &ToolDefinition) -> Result<(), ToolError> {
    let invalid = |message: String| {
        ToolError::invalid_schema(message).with_tool_name(definition.name.clone())
    };

    let Some(schema) = definition.parameters.as_object() else {
        return Err(invalid("parameter schema must be a JSON object".to_string()));
    };

    let empty = serde_json::Map::new();
    let properties = match schema.get("properties") {
        None => &empty,
        Some(value) => value
            .as_object()
            .ok_or_else(|| invalid("schema 'properties' must be an object".to_string()))?,
    };

    for (name, property) in properties {
        let property = property
            .as_object()
            .ok_or_else(|| invalid(format!("property '{name}' must be a schema object")))?;

        if !property.get("type").is_some_and(JsonValue::is_string) {
            return Err(invalid(format!("property '{name}' is missing a type")));
        }
    }

    if let Some(required) = schema.get("required") {
        let entries = required
            .as_array()
            .ok_or_else(|| invalid("schema 'required' must be an array".to_string()))?;

        for entry in entries {
            let name = entry
                .as_str()
                .ok_or_else(|| invalid("schema 'required' entries must be strings".to_string()))?;

            if !properties.contains_key(name) {
                return Err(invalid(format!(
                    "required property '{name}' has no matching definition"
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ToolErrorKind;

    fn echo_definition(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.to_string(),
            description: "Echoes arguments".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            }),
        }
    }

    #[test]
    fn register_validates_and_lists_in_registration_order() {
        let mut registry = ToolRegistry::new();
        registry
            .register_sync_fn(echo_definition("alpha"), Ok)
            .expect("alpha should register");
        registry
            .register_sync_fn(echo_definition("beta"), Ok)
            .expect("beta should register");

        assert!(registry.has("alpha"));
        assert_eq!(registry.len(), 2);

        let names: Vec<String> = registry
            .definitions()
            .into_iter()
            .map(|definition| definition.name)
            .collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn reregistering_replaces_without_failing() {
        let mut registry = ToolRegistry::new();
        registry
            .register_sync_fn(echo_definition("alpha"), |_| Ok(json!("first")))
            .expect("first registration");
        registry
            .register_sync_fn(echo_definition("alpha"), |_| Ok(json!("second")))
            .expect("replacement registration");

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn register_rejects_required_property_without_definition() {
        let mut registry = ToolRegistry::new();
        let definition = ToolDefinition {
            name: "broken".to_string(),
            description: "Bad schema".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city", "country"]
            }),
        };

        let error = registry
            .register_sync_fn(definition, Ok)
            .expect_err("schema should be rejected");
        assert_eq!(error.kind, ToolErrorKind::InvalidSchema);
        assert!(error.message.contains("country"));
    }

    #[test]
    fn register_rejects_property_without_type() {
        let mut registry = ToolRegistry::new();
        let definition = ToolDefinition {
            name: "broken".to_string(),
            description: "Bad schema".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {"city": {"description": "no type here"}}
            }),
        };

        let error = registry
            .register_sync_fn(definition, Ok)
            .expect_err("schema should be rejected");
        assert_eq!(error.kind, ToolErrorKind::InvalidSchema);
    }

    #[tokio::test]
    async fn invoke_reports_not_found_for_unknown_names() {
        let registry = ToolRegistry::new();
        let error = registry
            .invoke("missing", &json!({}))
            .await
            .expect_err("unknown tool should fail");
        assert_eq!(error.kind, ToolErrorKind::NotFound);
    }

    #[tokio::test]
    async fn invoke_runs_the_registered_handler() {
        let mut registry = ToolRegistry::new();
        registry
            .register_sync_fn(echo_definition("echo"), |arguments| {
                Ok(json!({"echoed": arguments}))
            })
            .expect("registration");

        let output = registry
            .invoke("echo", &json!({"text": "hi"}))
            .await
            .expect("invocation should work");
        assert_eq!(output, json!({"echoed": {"text": "hi"}}));
    }
}
