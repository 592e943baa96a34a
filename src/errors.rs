use thiserror::Error;

use crate::mcp::rpc::{INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND};

/// Failures reported to the client as JSON-RPC error objects.
///
/// `Display` is the exact wire message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Method not found")]
    MethodNotFound,
    #[error("Invalid params")]
    InvalidParams,
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },
    #[error("Unknown prompt: {name}")]
    UnknownPrompt { name: String },
    #[error("Missing required argument: {name}")]
    MissingArgument { name: String },
    #[error("Internal error")]
    Internal,
}

impl ProtocolError {
    pub fn code(&self) -> i32 {
        match self {
            Self::MethodNotFound => METHOD_NOT_FOUND,
            Self::InvalidParams
            | Self::UnknownTool { .. }
            | Self::UnknownPrompt { .. }
            | Self::MissingArgument { .. } => INVALID_PARAMS,
            Self::Internal => INTERNAL_ERROR,
        }
    }
}

/// Failure reported by a tool or prompt body. Delivered to the client
/// inside a successful result, never as a JSON-RPC error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExecutionError {
    message: String,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("i/o failure on the connection: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode outbound message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("connection closed")]
    Closed,
}
