//! Built-in tools
//!
//! `sha256sum` computes the hex SHA-256 digest of its `text` argument,
//! announcing the work with a `test/notification` first.

use std::sync::Arc;

use async_trait::async_trait;
use hex::ToHex;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::domain::notifier::Notifier;
use crate::domain::rate_gate::RateGate;
use crate::domain::registry::{ToolDefinition, ToolHandler};
use crate::errors::ExecutionError;
use crate::mcp::protocol::{CallToolParams, CallToolResult, Tool, ToolInputSchema};

pub const PROGRESS_NOTIFICATION: &str = "test/notification";

pub fn build_tools(rate_gate: RateGate) -> Vec<ToolDefinition> {
    vec![ToolDefinition::new(
        sha256sum_tool(),
        Arc::new(Sha256Sum),
        rate_gate,
    )]
}

pub fn sha256sum_tool() -> Tool {
    Tool {
        name: "sha256sum".to_string(),
        description: Some("Compute a SHA-256 checksum".to_string()),
        input_schema: ToolInputSchema::object(
            Map::from_iter([(
                "text".to_string(),
                json!({
                    "type": "string",
                    "description": "Text to compute a checksum for"
                }),
            )]),
            vec!["text".to_string()],
        ),
    }
}

#[derive(Debug, Default)]
pub struct Sha256Sum;

#[async_trait]
impl ToolHandler for Sha256Sum {
    async fn execute(
        &self,
        notifier: &dyn Notifier,
        params: CallToolParams,
    ) -> Result<CallToolResult, ExecutionError> {
        let text = match params.arguments.get("text") {
            Some(Value::String(text)) => text,
            _ => {
                return Err(ExecutionError::new(
                    "failed to compute checksum: text must be a string",
                ))
            }
        };

        if text.is_empty() {
            return Err(ExecutionError::new(
                "failed to compute checksum: text cannot be empty",
            ));
        }

        if let Err(err) = notifier.notify(
            PROGRESS_NOTIFICATION,
            json!({ "message": "Processing text" }),
        ) {
            warn!(error = %err, "failed to send notification");
        }

        Ok(CallToolResult::text(sha256_hex(text.as_bytes())))
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().encode_hex::<String>()
}
