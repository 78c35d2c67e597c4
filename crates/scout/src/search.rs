//! Web search used by the agent's search tool
use async_trait::async_trait;
use thiserror::Error;

pub mod tavily;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("search API key is not configured")]
    MissingApiKey,

    #[error("search request could not be sent, please try again later: {0}")]
    Network(String),

    #[error("search request failed with status {status}, please try again later: {body}")]
    Status { status: u16, body: String },

    #[error("search response could not be read: {0}")]
    Decode(String),
}

/// A search backend that turns a query into a synthesized textual answer
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &str) -> Result<String, SearchError>;
}
