//! JSON argument helpers for function and trait-based tools.
//!
//! ```rust
//! use gtool::{arguments_object, required_str};
//! use serde_json::json;
//!
//! let arguments = json!({"query": "rust"});
//! let args = arguments_object(&arguments).expect("object should parse");
//! let query = required_str(args, "query").expect("query should be present");
//! assert_eq!(query, "rust");
//! ```

use serde_json::{Map, Value as JsonValue};

use crate::ToolError;

pub fn arguments_object(arguments: &JsonValue) -> Result<&Map<String, JsonValue>, ToolError> {
    arguments
        .as_object()
        .ok_or_else(|| ToolError::invalid_arguments("expected JSON object arguments"))
}

pub fn required_str<'a>(args: &'a Map<String, JsonValue>, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| ToolError::invalid_arguments(format!("missing required string: '{key}'")))
}

pub fn optional_str<'a>(args: &'a Map<String, JsonValue>, key: &str) -> Option<&'a str> {
    args.get(key).and_then(JsonValue::as_str)
}
