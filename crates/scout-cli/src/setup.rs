use anyhow::{Context, Result};
use scout::agent::Agent;
use scout::providers::configs::OpenAiProviderConfig;
use scout::providers::openai::OpenAiProvider;
use scout::search::tavily::{TavilyClient, TavilyConfig};
use scout::session::{default_sessions_file, FileSessionStore, SessionManager};
use scout::tools::search::SearchTool;
use scout::tools::ToolRegistry;
use std::path::PathBuf;
use std::sync::Arc;

/// Options shared by every command, resolved from flags and the environment
pub struct Settings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub search_api_key: Option<String>,
    pub sessions_file: Option<PathBuf>,
}

pub fn build_provider(settings: &Settings) -> Result<OpenAiProvider> {
    let api_key = settings
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .context("API key must be provided via --api-key or SCOUT_API_KEY environment variable")?;

    let config =
        OpenAiProviderConfig::new(api_key, settings.model.clone()).with_base_url(&settings.base_url);
    OpenAiProvider::new(config)
}

/// Searches fail with a message to the model when no key is set, they never stop the chat
pub fn build_search_client(settings: &Settings) -> Result<TavilyClient> {
    let api_key = settings.search_api_key.clone().unwrap_or_default();
    TavilyClient::new(TavilyConfig::new(api_key))
}

pub fn build_agent(settings: &Settings) -> Result<Agent> {
    let provider = build_provider(settings)?;
    let search = build_search_client(settings)?;
    let tools = ToolRegistry::new().with_handler(SearchTool::new(Arc::new(search)));
    Ok(Agent::new(Box::new(provider), tools))
}

pub fn open_sessions(settings: &Settings) -> Result<SessionManager> {
    let path = match &settings.sessions_file {
        Some(path) => path.clone(),
        None => default_sessions_file()?,
    };
    Ok(SessionManager::load(Box::new(FileSessionStore::new(path)))?)
}
