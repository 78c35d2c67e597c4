//! Chat sessions and their persistence.
//!
//! A [`SessionManager`] owns the list of sessions shown to the user and writes
//! the whole list through a [`SessionStore`] after every change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::message::Message;

mod manager;
mod store;

pub use manager::{SessionManager, TurnGuard, EXPORT_VERSION};
pub use store::{default_sessions_file, FileSessionStore, MemorySessionStore, SessionStore};

pub const DEFAULT_TITLE: &str = "New chat";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session {0} is already answering a message")]
    Busy(String),

    #[error("Failed to persist sessions: {0}")]
    Storage(String),

    #[error("Failed to import sessions: {0}")]
    Import(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new<S: Into<String>>(title: S) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }
}
