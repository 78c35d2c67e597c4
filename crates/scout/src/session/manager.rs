use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use super::store::SessionStore;
use super::{ChatSession, SessionError, DEFAULT_TITLE};
use crate::models::message::Message;

pub const EXPORT_VERSION: &str = "1.0.0";

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportData {
    sessions: Vec<ChatSession>,
    #[serde(default)]
    export_date: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

/// The session list shown to the user, kept in sync with its store.
///
/// Sessions are ordered newest first. Every change is written through to the
/// store before the call returns, and only becomes visible once it is saved.
pub struct SessionManager {
    store: Box<dyn SessionStore>,
    sessions: Mutex<Vec<ChatSession>>,
    // Serializes writers so readers never wait on the store
    writer: Mutex<()>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl SessionManager {
    pub fn load(store: Box<dyn SessionStore>) -> Result<Self, SessionError> {
        let sessions = store.load()?;
        debug!(count = sessions.len(), "Loaded sessions");
        Ok(Self {
            store,
            sessions: Mutex::new(sessions),
            writer: Mutex::new(()),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    fn sessions(&self) -> MutexGuard<'_, Vec<ChatSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a change to a copy of the list, save it, then make it current
    fn commit<T>(
        &self,
        change: impl FnOnce(&mut Vec<ChatSession>) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = self.sessions().clone();
        let result = change(&mut next)?;
        self.store.save(&next)?;
        *self.sessions() = next;
        Ok(result)
    }

    /// Apply a change to one session and persist the whole list
    fn update<T>(
        &self,
        id: &str,
        change: impl FnOnce(&mut ChatSession) -> T,
    ) -> Result<T, SessionError> {
        self.commit(|sessions| {
            let session = sessions
                .iter_mut()
                .find(|session| session.id == id)
                .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
            Ok(change(session))
        })
    }

    pub fn list(&self) -> Vec<ChatSession> {
        self.sessions().clone()
    }

    pub fn get(&self, id: &str) -> Result<ChatSession, SessionError> {
        self.sessions()
            .iter()
            .find(|session| session.id == id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Start a new, empty session at the top of the list
    pub fn create(&self, title: Option<String>) -> Result<ChatSession, SessionError> {
        let title = title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let session = ChatSession::new(title);

        self.commit(|sessions| {
            sessions.insert(0, session.clone());
            Ok(())
        })?;

        info!(id = %session.id, "Created session");
        Ok(session)
    }

    pub fn delete(&self, id: &str) -> Result<(), SessionError> {
        self.commit(|sessions| {
            let before = sessions.len();
            sessions.retain(|session| session.id != id);
            if sessions.len() == before {
                return Err(SessionError::NotFound(id.to_string()));
            }
            Ok(())
        })?;

        info!(id = %id, "Deleted session");
        Ok(())
    }

    pub fn append_message(&self, id: &str, message: Message) -> Result<(), SessionError> {
        self.update(id, |session| session.push(message))
    }

    /// The messages of a session, ready to hand to the agent
    pub fn history(&self, id: &str) -> Result<Vec<Message>, SessionError> {
        self.get(id).map(|session| session.messages)
    }

    /// Mark a session as answering a message until the guard is dropped
    pub fn begin_turn(&self, id: &str) -> Result<TurnGuard, SessionError> {
        if !self.sessions().iter().any(|session| session.id == id) {
            return Err(SessionError::NotFound(id.to_string()));
        }

        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(id.to_string()) {
            return Err(SessionError::Busy(id.to_string()));
        }

        Ok(TurnGuard {
            id: id.to_string(),
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Every session as pretty printed JSON, with the export date and format version
    pub fn export(&self) -> Result<String, SessionError> {
        let data = ExportData {
            sessions: self.list(),
            export_date: Some(Utc::now().to_rfc3339()),
            version: Some(EXPORT_VERSION.to_string()),
        };
        serde_json::to_string_pretty(&data).map_err(|e| SessionError::Storage(e.to_string()))
    }

    /// Replace all sessions with the ones in an export document
    pub fn import(&self, json: &str) -> Result<usize, SessionError> {
        let data: ExportData =
            serde_json::from_str(json).map_err(|e| SessionError::Import(e.to_string()))?;
        let count = data.sessions.len();

        self.commit(|sessions| {
            *sessions = data.sessions;
            Ok(())
        })?;

        info!(count, "Imported sessions");
        Ok(count)
    }
}

/// Held while a session is answering a message
#[derive(Debug)]
pub struct TurnGuard {
    id: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl TurnGuard {
    pub fn session_id(&self) -> &str {
        &self.id
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}
