use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::ToolHandler;
use crate::errors::AgentResult;
use crate::models::tool::Tool;
use crate::search::SearchClient;

pub const SEARCH_TOOL_NAME: &str = "search";

/// Prefix of every result that reports a failed search to the model
pub const SEARCH_FAILED: &str = "Search failed";

/// Exposes a [`SearchClient`] to the model as the `search` tool.
///
/// Every outcome, including invalid arguments and search failures, is returned as a
/// result string so that the model can read it and correct itself.
pub struct SearchTool {
    tool: Tool,
    client: Arc<dyn SearchClient>,
}

impl SearchTool {
    pub fn new(client: Arc<dyn SearchClient>) -> Self {
        let tool = Tool::new(
            SEARCH_TOOL_NAME,
            "Search the web for up-to-date information. Use this tool whenever you need \
             real-time information such as recent news, current events, weather or stock prices.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The keywords or question to search for"
                    }
                },
                "required": ["query"]
            }),
        );
        Self { tool, client }
    }
}

#[async_trait]
impl ToolHandler for SearchTool {
    fn definition(&self) -> &Tool {
        &self.tool
    }

    async fn call(&self, arguments: Value) -> AgentResult<String> {
        let query = match arguments.get("query").and_then(|q| q.as_str()) {
            Some(query) if !query.trim().is_empty() => query,
            _ => {
                return Ok(format!(
                    "{}: please provide a valid search query",
                    SEARCH_FAILED
                ))
            }
        };

        tracing::info!("Searching for: {}", query);
        match self.client.search(query).await {
            Ok(answer) => Ok(format!("Search results:\n{}", answer)),
            Err(e) => {
                tracing::warn!("Search for {:?} failed: {}", query, e);
                Ok(format!("{}: {}", SEARCH_FAILED, e))
            }
        }
    }
}
