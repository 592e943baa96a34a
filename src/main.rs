use mcp_stdio_server::{build_default_state, config::Config, logging, serve_stdio};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let state = build_default_state(&config);

    info!(
        server_name = %config.server_name,
        server_version = %config.server_version,
        tools = state.registry.tool_metadata().len(),
        prompts = state.registry.prompt_metadata().len(),
        "server starting"
    );

    serve_stdio(state, &config).await?;
    info!("server stopped");
    Ok(())
}
