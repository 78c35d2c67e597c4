use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::warn;

use super::{ChatSession, SessionError};

/// Where sessions live between runs. Both operations act on the whole list.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Vec<ChatSession>, SessionError>;

    fn save(&self, sessions: &[ChatSession]) -> Result<(), SessionError>;
}

/// `~/.config/scout/sessions.json`
pub fn default_sessions_file() -> Result<PathBuf, SessionError> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| SessionError::Storage("Could not determine home directory".to_string()))?;
    Ok(home_dir
        .join(".config")
        .join("scout")
        .join("sessions.json"))
}

/// Stores every session as one JSON array in a single file
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Vec<ChatSession>, SessionError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SessionError::Storage(e.to_string())),
        };

        match serde_json::from_reader(BufReader::new(file)) {
            Ok(sessions) => Ok(sessions),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    "Ignoring unreadable sessions file: {}", e
                );
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, sessions: &[ChatSession]) -> Result<(), SessionError> {
        let write = || -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut writer = BufWriter::new(File::create(&self.path)?);
            serde_json::to_writer(&mut writer, sessions)?;
            writer.flush()
        };

        write().map_err(|e| SessionError::Storage(e.to_string()))
    }
}

/// Keeps sessions for the lifetime of the process only
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<Vec<ChatSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(sessions: Vec<ChatSession>) -> Self {
        Self {
            sessions: Mutex::new(sessions),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Vec<ChatSession>, SessionError> {
        Ok(self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, sessions: &[ChatSession]) -> Result<(), SessionError> {
        *self.sessions.lock().unwrap_or_else(PoisonError::into_inner) = sessions.to_vec();
        Ok(())
    }
}
