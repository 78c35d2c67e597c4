use scout::agent::Agent;
use scout::session::SessionManager;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
    pub sessions: Arc<SessionManager>,
    /// Pause between streamed characters
    pub stream_delay: Duration,
}

impl AppState {
    pub fn new(agent: Agent, sessions: SessionManager, stream_delay: Duration) -> Self {
        Self {
            agent: Arc::new(agent),
            sessions: Arc::new(sessions),
            stream_delay,
        }
    }
}
