//! Tool execution errors and classifications.

use std::error::Error;
use std::fmt::{Display, Formatter};

use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    NotFound,
    InvalidSchema,
    InvalidArguments,
    Execution,
    Unexpected,
}

impl ToolErrorKind {
    /// Stable code embedded in the JSON error payload fed back to the model.
    pub fn wire_code(self) -> &'static str {
        match self {
            Self::NotFound => "ToolNotFound",
            Self::InvalidSchema => "InvalidSchema",
            Self::InvalidArguments => "InvalidToolArguments",
            Self::Execution => "ToolExecutionFailed",
            Self::Unexpected => "UnexpectedToolError",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
    pub details: Option<JsonValue>,
    pub tool_name: Option<String>,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            tool_name: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound, message)
    }

    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidSchema, message)
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidArguments, message)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Execution, message)
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Unexpected, message)
    }

    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self.kind,
            ToolErrorKind::NotFound | ToolErrorKind::InvalidSchema | ToolErrorKind::InvalidArguments
        )
    }
}

impl Display for ToolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.tool_name {
            Some(tool_name) => {
                write!(f, "{:?} [tool={}]: {}", self.kind, tool_name, self.message)
            }
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for ToolError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_are_stable() {
        assert_eq!(ToolErrorKind::NotFound.wire_code(), "ToolNotFound");
        assert_eq!(ToolErrorKind::Execution.wire_code(), "ToolExecutionFailed");
        assert_eq!(ToolErrorKind::Unexpected.wire_code(), "UnexpectedToolError");
    }

    #[test]
    fn display_includes_tool_context() {
        let error = ToolError::not_found("missing").with_tool_name("lookup");
        let rendered = error.to_string();
        assert!(rendered.contains("lookup"));
        assert!(rendered.contains("missing"));
    }

    #[test]
    fn helper_methods_classify_user_errors() {
        assert!(ToolError::invalid_arguments("bad args").is_user_error());
        assert!(!ToolError::execution("boom").is_user_error());
    }
}
