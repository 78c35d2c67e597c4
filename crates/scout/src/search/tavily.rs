use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::{SearchClient, SearchError};

pub const TAVILY_HOST: &str = "https://api.tavily.com";

/// Returned when the search succeeded but no answer was synthesized
pub const NO_RESULTS: &str = "Sorry, no search results were found.";

#[derive(Debug, Clone)]
pub struct TavilyConfig {
    pub host: String,
    pub api_key: String,
}

impl TavilyConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            host: TAVILY_HOST.to_string(),
            api_key: api_key.into(),
        }
    }
}

/// Client for the Tavily search API, asking for an advanced synthesized answer
pub struct TavilyClient {
    client: Client,
    config: TavilyConfig,
}

impl TavilyClient {
    pub fn new(config: TavilyConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn has_api_key(&self) -> bool {
        !self.config.api_key.trim().is_empty()
    }

    pub async fn test_connection(&self) -> bool {
        if !self.has_api_key() {
            return false;
        }
        match self.search("test").await {
            Ok(answer) => !answer.is_empty(),
            Err(e) => {
                tracing::warn!("Search connection test failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl SearchClient for TavilyClient {
    async fn search(&self, query: &str) -> Result<String, SearchError> {
        if !self.has_api_key() {
            return Err(SearchError::MissingApiKey);
        }

        let url = format!("{}/search", self.config.host.trim_end_matches('/'));
        let payload = json!({
            "api_key": self.config.api_key,
            "query": query,
            "include_answer": "advanced",
            "search_depth": "advanced",
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        match data.get("answer").and_then(|a| a.as_str()) {
            Some(answer) if !answer.trim().is_empty() => Ok(answer.to_string()),
            _ => Ok(NO_RESULTS.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> TavilyClient {
        TavilyClient::new(TavilyConfig {
            host: server.uri(),
            api_key: "tvly-test".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_search_returns_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_json(json!({
                "api_key": "tvly-test",
                "query": "weather in Paris",
                "include_answer": "advanced",
                "search_depth": "advanced",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": "weather in Paris",
                "answer": "15°C, cloudy",
                "results": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = client_for(&server).search("weather in Paris").await.unwrap();
        assert_eq!(answer, "15°C, cloudy");
    }

    #[tokio::test]
    async fn test_search_without_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .mount(&server)
            .await;

        let answer = client_for(&server).search("nothing").await.unwrap();
        assert_eq!(answer, NO_RESULTS);
    }

    #[tokio::test]
    async fn test_search_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(432).set_body_string("plan limit reached"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.search("rust").await.unwrap_err();
        assert_eq!(
            err,
            SearchError::Status {
                status: 432,
                body: "plan limit reached".to_string()
            }
        );
        assert!(!client.test_connection().await);
    }

    #[tokio::test]
    async fn test_search_missing_api_key() {
        let client = TavilyClient::new(TavilyConfig::new("")).unwrap();
        assert_eq!(
            client.search("rust").await.unwrap_err(),
            SearchError::MissingApiKey
        );
        assert!(!client.test_connection().await);
    }

    #[tokio::test]
    async fn test_search_network_failure() {
        // Nothing listens on this port once the listener is dropped
        let uri = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            format!("http://{}", listener.local_addr().unwrap())
        };
        let client = TavilyClient::new(TavilyConfig {
            host: uri,
            api_key: "tvly-test".to_string(),
        })
        .unwrap();

        assert!(matches!(
            client.search("rust").await,
            Err(SearchError::Network(_))
        ));
    }
}
