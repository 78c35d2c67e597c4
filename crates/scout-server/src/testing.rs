use crate::state::AppState;
use anyhow::Result;
use async_trait::async_trait;
use axum::response::Response;
use http_body_util::BodyExt;
use scout::agent::Agent;
use scout::models::message::Message;
use scout::models::tool::Tool;
use scout::providers::base::{Provider, Usage};
use scout::session::{MemorySessionStore, SessionManager, SessionStore};
use scout::tools::ToolRegistry;
use std::sync::Mutex;
use std::time::Duration;

/// Answers with pre-configured messages, then with an empty one
pub struct ScriptedProvider {
    responses: Mutex<Vec<Message>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Message>) -> Self {
        Self {
            responses: Mutex::new(responses),
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn complete(&self, _messages: &[Message], _tools: &[Tool]) -> Result<(Message, Usage)> {
        let mut responses = self.responses.lock().unwrap();
        let message = if responses.is_empty() {
            Message::assistant().with_text("")
        } else {
            responses.remove(0)
        };
        Ok((message, Usage::default()))
    }
}

pub fn test_state(responses: Vec<Message>) -> AppState {
    test_state_with_store(responses, Box::new(MemorySessionStore::new()))
}

pub fn test_state_with_store(responses: Vec<Message>, store: Box<dyn SessionStore>) -> AppState {
    let agent = Agent::new(
        Box::new(ScriptedProvider::new(responses)),
        ToolRegistry::new(),
    );
    let sessions = SessionManager::load(store).unwrap();
    AppState::new(agent, sessions, Duration::ZERO)
}

pub async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
