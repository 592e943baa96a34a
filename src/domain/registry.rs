//! Tool and prompt definitions, bound to their handlers and rate gates.
//!
//! The registry is built once and only read afterwards; the rate gates are
//! the only state that changes while serving.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::notifier::Notifier;
use crate::domain::rate_gate::RateGate;
use crate::errors::ExecutionError;
use crate::mcp::protocol::{
    CallToolParams, CallToolResult, GetPromptParams, GetPromptResult, Prompt, Tool,
};

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn execute(
        &self,
        notifier: &dyn Notifier,
        params: CallToolParams,
    ) -> Result<CallToolResult, ExecutionError>;
}

#[async_trait]
pub trait PromptHandler: Send + Sync {
    async fn process(
        &self,
        notifier: &dyn Notifier,
        params: GetPromptParams,
    ) -> Result<GetPromptResult, ExecutionError>;
}

pub struct ToolDefinition {
    pub metadata: Tool,
    pub handler: Arc<dyn ToolHandler>,
    pub rate_gate: RateGate,
}

impl ToolDefinition {
    pub fn new(metadata: Tool, handler: Arc<dyn ToolHandler>, rate_gate: RateGate) -> Self {
        Self {
            metadata,
            handler,
            rate_gate,
        }
    }

    /// First name from the schema's `required` list absent from `params`.
    pub fn missing_required<'a>(&'a self, params: &CallToolParams) -> Option<&'a str> {
        self.metadata
            .input_schema
            .required
            .iter()
            .find(|name| !params.arguments.contains_key(name.as_str()))
            .map(String::as_str)
    }
}

pub struct PromptDefinition {
    pub metadata: Prompt,
    pub handler: Arc<dyn PromptHandler>,
    pub rate_gate: RateGate,
}

impl PromptDefinition {
    pub fn new(metadata: Prompt, handler: Arc<dyn PromptHandler>, rate_gate: RateGate) -> Self {
        Self {
            metadata,
            handler,
            rate_gate,
        }
    }

    pub fn missing_required<'a>(&'a self, params: &GetPromptParams) -> Option<&'a str> {
        self.metadata
            .arguments
            .iter()
            .filter(|argument| argument.is_required())
            .find(|argument| !params.arguments.contains_key(&argument.name))
            .map(|argument| argument.name.as_str())
    }
}

#[derive(Default)]
pub struct Registry {
    tool_metadata: Vec<Tool>,
    tools: HashMap<String, ToolDefinition>,
    prompt_metadata: Vec<Prompt>,
    prompts: HashMap<String, PromptDefinition>,
}

impl Registry {
    pub fn new(tools: Vec<ToolDefinition>, prompts: Vec<PromptDefinition>) -> Self {
        let tool_metadata = tools.iter().map(|tool| tool.metadata.clone()).collect();
        let tools = tools
            .into_iter()
            .map(|tool| (tool.metadata.name.clone(), tool))
            .collect();

        let prompt_metadata = prompts.iter().map(|prompt| prompt.metadata.clone()).collect();
        let prompts = prompts
            .into_iter()
            .map(|prompt| (prompt.metadata.name.clone(), prompt))
            .collect();

        Self {
            tool_metadata,
            tools,
            prompt_metadata,
            prompts,
        }
    }

    /// Tool metadata in registration order.
    pub fn tool_metadata(&self) -> &[Tool] {
        &self.tool_metadata
    }

    pub fn prompt_metadata(&self) -> &[Prompt] {
        &self.prompt_metadata
    }

    pub fn tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn prompt(&self, name: &str) -> Option<&PromptDefinition> {
        self.prompts.get(name)
    }

    pub fn has_prompts(&self) -> bool {
        !self.prompts.is_empty()
    }
}
