//! Turn-layer errors and classification.

use std::error::Error;
use std::fmt::{Display, Formatter};

use gclient::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnErrorKind {
    /// Backend or transport failure surfaced by the completion client.
    Backend,
    /// The stream violated the chunk contract (e.g. closed without a finish
    /// chunk, or produced chunks after a terminal state).
    Protocol,
    /// Accumulated tool-call arguments failed to parse at finalization.
    MalformedToolArguments,
    /// The turn exceeded its wall-clock budget.
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnError {
    pub kind: TurnErrorKind,
    pub message: String,
}

impl TurnError {
    pub fn new(kind: TurnErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(TurnErrorKind::Backend, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(TurnErrorKind::Protocol, message)
    }

    pub fn malformed_arguments(message: impl Into<String>) -> Self {
        Self::new(TurnErrorKind::MalformedToolArguments, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TurnErrorKind::Timeout, message)
    }
}

impl Display for TurnError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for TurnError {}

impl From<ClientError> for TurnError {
    fn from(value: ClientError) -> Self {
        TurnError::backend(value.to_string())
    }
}
