//! Built-in prompt templates.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use crate::domain::notifier::Notifier;
use crate::domain::rate_gate::RateGate;
use crate::domain::registry::{PromptDefinition, PromptHandler};
use crate::domain::tools::PROGRESS_NOTIFICATION;
use crate::errors::ExecutionError;
use crate::mcp::protocol::{GetPromptParams, GetPromptResult, Prompt, PromptArgument};

pub fn build_prompts(rate_gate: RateGate) -> Vec<PromptDefinition> {
    vec![PromptDefinition::new(
        example_prompt(),
        Arc::new(ExamplePrompt),
        rate_gate,
    )]
}

pub fn example_prompt() -> Prompt {
    Prompt {
        name: "example".to_string(),
        description: Some("An example prompt template".to_string()),
        arguments: vec![PromptArgument {
            name: "text".to_string(),
            description: Some("Text to process".to_string()),
            required: Some(true),
        }],
    }
}

#[derive(Debug, Default)]
pub struct ExamplePrompt;

#[async_trait]
impl PromptHandler for ExamplePrompt {
    async fn process(
        &self,
        notifier: &dyn Notifier,
        params: GetPromptParams,
    ) -> Result<GetPromptResult, ExecutionError> {
        let text = params
            .arguments
            .get("text")
            .map(String::as_str)
            .unwrap_or_default();
        if text.is_empty() {
            return Err(ExecutionError::new("input text cannot be empty"));
        }

        if let Err(err) = notifier.notify(
            PROGRESS_NOTIFICATION,
            json!({ "message": "Processing text" }),
        ) {
            warn!(error = %err, "failed to send notification");
        }

        Ok(GetPromptResult::assistant_text(format!("Processed: {text}")))
    }
}
