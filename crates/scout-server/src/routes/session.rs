use super::reply::{send_paced, stream_channel, ProtocolFormatter, SseResponse};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use scout::models::message::Message;
use scout::session::{ChatSession, SessionError, SessionManager};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionReplyRequest {
    #[serde(default)]
    content: String,
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ImportResponse {
    imported: usize,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
enum ApiError {
    Session(SessionError),
    BadRequest(String),
    Internal(String),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        ApiError::Session(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::Session(err) => {
                let status = match &err {
                    SessionError::NotFound(_) => StatusCode::NOT_FOUND,
                    SessionError::Busy(_) => StatusCode::CONFLICT,
                    SessionError::Import(_) => StatusCode::BAD_REQUEST,
                    SessionError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// Run a session change on the blocking pool, since it writes the store
async fn write_sessions<T, F>(state: &AppState, change: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&SessionManager) -> Result<T, SessionError> + Send + 'static,
{
    let sessions = Arc::clone(&state.sessions);
    tokio::task::spawn_blocking(move || change(sessions.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

// Handlers
async fn list_sessions(State(state): State<AppState>) -> Json<Vec<ChatSession>> {
    Json(state.sessions.list())
}

async fn create_session(
    State(state): State<AppState>,
    request: Option<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<ChatSession>), ApiError> {
    let title = request.and_then(|Json(request)| request.title);
    let session = write_sessions(&state, move |sessions| sessions.create(title)).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChatSession>, ApiError> {
    Ok(Json(state.sessions.get(&id)?))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    write_sessions(&state, move |sessions| sessions.delete(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn export_sessions(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = state.sessions.export()?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

async fn import_sessions(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ImportResponse>, ApiError> {
    let imported = write_sessions(&state, move |sessions| sessions.import(&body)).await?;
    Ok(Json(ImportResponse { imported }))
}

/// Answer a new user message in a session, streaming the answer like `/reply`
async fn session_reply(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SessionReplyRequest>,
) -> Result<SseResponse, ApiError> {
    let text = request.content.trim().to_string();
    let image_url = request.image_url.filter(|url| !url.trim().is_empty());
    if text.is_empty() && image_url.is_none() {
        return Err(ApiError::BadRequest("Message is empty".to_string()));
    }

    let guard = state.sessions.begin_turn(&id)?;

    let mut message = Message::user();
    if let Some(url) = image_url {
        message = message.with_image(url);
    }
    if !text.is_empty() {
        message = message.with_text(text);
    }
    let session_id = id.clone();
    write_sessions(&state, move |sessions| {
        sessions.append_message(&session_id, message)
    })
    .await?;
    let history = state.sessions.history(&id)?;
    info!(session = %id, messages = history.len(), "Received session reply request");

    let (tx, response) = stream_channel();

    tokio::spawn(async move {
        let _guard = guard;

        let outcome = tokio::select! {
            outcome = state.agent.run(&history) => outcome,
            _ = tx.closed() => {
                info!(session = %id, "Client disconnected, stopping reply");
                return;
            }
        };

        let (text, reason) = match outcome {
            Ok(answer) => {
                let message = Message::assistant().with_text(answer.clone());
                let session_id = id.clone();
                let saved = write_sessions(&state, move |sessions| {
                    sessions.append_message(&session_id, message)
                })
                .await;
                if let Err(e) = saved {
                    error!(session = %id, "Failed to save answer: {:?}", e);
                }
                (answer, "stop")
            }
            Err(e) => {
                error!(session = %id, "Agent run failed: {}", e);
                (format!("Execution failed: {}", e), "error")
            }
        };

        if let Err(e) = send_paced(&tx, text, state.stream_delay).await {
            error!("Error sending message through channel: {}", e);
            return;
        }
        let _ = tx.send(ProtocolFormatter::format_finish(reason)).await;
    });

    Ok(response)
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/export", get(export_sessions))
        .route("/sessions/import", post(import_sessions))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/sessions/:id/reply", post(session_reply))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{body_string, test_state, test_state_with_store};
    use axum::{body::Body, http::Request};
    use scout::models::role::Role;
    use scout::session::SessionStore;
    use serde_json::json;
    use std::sync::{mpsc, Mutex};
    use tower::ServiceExt;

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .method(method)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .method(method)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_session_endpoints() {
        let state = test_state(vec![]);
        let app = routes(state.clone());

        // Create a session with a title, and one without
        let response = app
            .clone()
            .oneshot(json_request("POST", "/sessions", json!({"title": "Weather"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: ChatSession = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(created.title, "Weather");

        let response = app
            .clone()
            .oneshot(empty_request("POST", "/sessions"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        // Newest first
        let response = app
            .clone()
            .oneshot(empty_request("GET", "/sessions"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let sessions: Vec<ChatSession> =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].title, "New chat");
        assert_eq!(sessions[1].id, created.id);

        let response = app
            .clone()
            .oneshot(empty_request("GET", &format!("/sessions/{}", created.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Delete, then it is gone
        let response = app
            .clone()
            .oneshot(empty_request("DELETE", &format!("/sessions/{}", created.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .clone()
            .oneshot(empty_request("DELETE", &format!("/sessions/{}", created.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(state.sessions.list().len(), 1);
    }

    #[tokio::test]
    async fn test_session_reply_persists_turn() {
        let state = test_state(vec![Message::assistant().with_text("Bonjour!")]);
        let session = state.sessions.create(None).unwrap();
        let app = routes(state.clone());

        let response = app
            .oneshot(json_request(
                "POST",
                &format!("/sessions/{}/reply", session.id),
                json!({"content": "  Say hello in French  "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_string(response).await;
        let text: String = body
            .lines()
            .filter_map(|line| line.strip_prefix("0:"))
            .map(|encoded| serde_json::from_str::<String>(encoded).unwrap())
            .collect();
        assert_eq!(text, "Bonjour!");
        assert!(body.lines().last().unwrap().contains("\"finishReason\":\"stop\""));

        let history = state.sessions.history(&session.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].text(), "Say hello in French");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].text(), "Bonjour!");

        // The turn is over, so the session accepts another message
        assert!(state.sessions.begin_turn(&session.id).is_ok());
    }

    #[tokio::test]
    async fn test_session_reply_with_image_only() {
        let state = test_state(vec![Message::assistant().with_text("A cat.")]);
        let session = state.sessions.create(None).unwrap();

        let response = routes(state.clone())
            .oneshot(json_request(
                "POST",
                &format!("/sessions/{}/reply", session.id),
                json!({"content": "", "image_url": "data:image/png;base64,AAAA"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_string(response).await;

        let history = state.sessions.history(&session.id).unwrap();
        assert!(!history[0].has_text());
        assert_eq!(history[1].text(), "A cat.");
    }

    #[tokio::test]
    async fn test_session_reply_errors() {
        let state = test_state(vec![]);
        let session = state.sessions.create(None).unwrap();
        let app = routes(state.clone());

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/sessions/missing/reply",
                json!({"content": "Hi"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/sessions/{}/reply", session.id),
                json!({"content": "   "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let _turn = state.sessions.begin_turn(&session.id).unwrap();
        let response = app
            .oneshot(json_request(
                "POST",
                &format!("/sessions/{}/reply", session.id),
                json!({"content": "Hi"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // Rejected requests leave the history untouched
        assert!(state.sessions.history(&session.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_export_import() {
        let source = test_state(vec![]);
        source.sessions.create(Some("Exported".to_string())).unwrap();

        let response = routes(source.clone())
            .oneshot(empty_request("GET", "/sessions/export"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let exported = body_string(response).await;

        let target = test_state(vec![]);
        let app = routes(target.clone());
        let request = Request::builder()
            .uri("/sessions/import")
            .method("POST")
            .body(Body::from(exported))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let imported: ImportResponse = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(imported.imported, 1);
        assert_eq!(target.sessions.list()[0].title, "Exported");

        let request = Request::builder()
            .uri("/sessions/import")
            .method("POST")
            .body(Body::from("not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    /// Holds every save until the test lets it through
    struct GatedStore {
        entered: Mutex<mpsc::Sender<()>>,
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl SessionStore for GatedStore {
        fn load(&self) -> Result<Vec<ChatSession>, SessionError> {
            Ok(Vec::new())
        }

        fn save(&self, _sessions: &[ChatSession]) -> Result<(), SessionError> {
            let _ = self.entered.lock().unwrap().send(());
            let _ = self.gate.lock().unwrap().recv();
            Ok(())
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_slow_save_does_not_block_other_requests() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = mpsc::channel();
        let state = test_state_with_store(
            vec![],
            Box::new(GatedStore {
                entered: Mutex::new(entered_tx),
                gate: Mutex::new(gate_rx),
            }),
        );
        let app = routes(state.clone());

        let create = tokio::spawn(app.clone().oneshot(empty_request("POST", "/sessions")));
        tokio::task::spawn_blocking(move || entered_rx.recv())
            .await
            .unwrap()
            .unwrap();

        // The save is still pending, so the list is unchanged
        let response = app
            .clone()
            .oneshot(empty_request("GET", "/sessions"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let sessions: Vec<ChatSession> =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert!(sessions.is_empty());

        gate_tx.send(()).unwrap();
        let response = create.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(state.sessions.list().len(), 1);
    }
}
