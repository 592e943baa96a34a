use std::sync::Arc;

pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod mcp;

use config::Config;
use domain::registry::{PromptDefinition, Registry, ToolDefinition};
use errors::TransportError;
use mcp::protocol::Implementation;

/// Everything a request handler reads. Cheap to clone; nothing in it is
/// mutated after construction except the rate gates inside the registry.
#[derive(Clone)]
pub struct AppState {
    pub server_info: Implementation,
    pub registry: Arc<Registry>,
}

impl AppState {
    pub fn new(
        server_info: Implementation,
        tools: Vec<ToolDefinition>,
        prompts: Vec<PromptDefinition>,
    ) -> Self {
        Self {
            server_info,
            registry: Arc::new(Registry::new(tools, prompts)),
        }
    }
}

/// State with the built-in `sha256sum` tool and `example` prompt, rate
/// limited as configured.
pub fn build_default_state(config: &Config) -> AppState {
    AppState::new(
        config.server_info(),
        domain::tools::build_tools(config.tool_rate.gate()),
        domain::prompts::build_prompts(config.prompt_rate.gate()),
    )
}

pub async fn serve_stdio(state: AppState, config: &Config) -> Result<(), TransportError> {
    mcp::transport::serve(
        state,
        tokio::io::stdin(),
        tokio::io::stdout(),
        config.max_message_bytes,
    )
    .await
}
