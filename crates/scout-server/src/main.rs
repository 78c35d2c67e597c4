mod configuration;
mod error;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use scout::agent::Agent;
use scout::providers::openai::OpenAiProvider;
use scout::search::tavily::TavilyClient;
use scout::session::{default_sessions_file, FileSessionStore, SessionManager};
use scout::tools::search::SearchTool;
use scout::tools::ToolRegistry;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = configuration::Settings::new()?;
    let addr = settings.server.socket_addr()?;
    let stream_delay = settings.agent.stream_delay();

    let provider_config = settings.provider.into_config();
    info!(model = %provider_config.model, base_url = %provider_config.base_url, "Using model");
    let provider = OpenAiProvider::new(provider_config)?;

    let search = TavilyClient::new(settings.search.into_config())?;
    if !search.has_api_key() {
        tracing::warn!("No search API key configured, searches will fail");
    }
    let tools = ToolRegistry::new().with_handler(SearchTool::new(Arc::new(search)));

    let mut agent = Agent::new(Box::new(provider), tools)
        .with_max_tool_rounds(settings.agent.max_tool_rounds);
    if let Some(prompt) = settings.agent.system_prompt {
        agent = agent.with_system_prompt(prompt);
    }

    let sessions_file = match settings.storage.sessions_file {
        Some(path) => path,
        None => default_sessions_file()?,
    };
    info!("Storing sessions in {}", sessions_file.display());
    let sessions = SessionManager::load(Box::new(FileSessionStore::new(sessions_file)))?;

    let state = state::AppState::new(agent, sessions, stream_delay);

    // Create router with CORS support
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
