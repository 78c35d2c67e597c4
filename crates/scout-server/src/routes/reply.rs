use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::{stream::StreamExt, Stream};
use scout::models::message::Message;
use scout::streaming::paced_chars;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};

// Types matching the incoming JSON structure
#[derive(Debug, Deserialize)]
struct ChatRequest {
    messages: Vec<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    role: String,
    content: IncomingContent,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IncomingContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Deserialize)]
struct ImageUrl {
    url: String,
}

// Custom SSE response type that implements the Vercel AI SDK protocol
pub struct SseResponse {
    rx: ReceiverStream<String>,
}

impl SseResponse {
    fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> axum::response::Response {
        let body = axum::body::Body::from_stream(self);

        (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
                (header::CONNECTION, "keep-alive"),
            ],
            [("x-vercel-ai-data-stream", "v1")],
            body,
        )
            .into_response()
    }
}

/// A channel whose receiving side is the body of the returned response
pub(crate) fn stream_channel() -> (mpsc::Sender<String>, SseResponse) {
    let (tx, rx) = mpsc::channel(100);
    (tx, SseResponse::new(ReceiverStream::new(rx)))
}

// Protocol-specific message formatting
pub(crate) struct ProtocolFormatter;

impl ProtocolFormatter {
    pub(crate) fn format_text(text: &str) -> String {
        let encoded_text = serde_json::to_string(text).unwrap_or_else(|_| String::new());
        format!("0:{}\n", encoded_text)
    }

    pub(crate) fn format_finish(reason: &str) -> String {
        // Finish messages start with "d:"
        let finish = json!({
            "finishReason": reason,
            "usage": {
                "promptTokens": 0,
                "completionTokens": 0
            }
        });
        format!("d:{}\n", finish)
    }
}

/// Send a complete answer one character at a time
pub(crate) async fn send_paced(
    tx: &mpsc::Sender<String>,
    text: String,
    delay: Duration,
) -> Result<(), mpsc::error::SendError<String>> {
    let mut fragments = paced_chars(text, delay);
    while let Some(fragment) = fragments.next().await {
        tx.send(ProtocolFormatter::format_text(&fragment)).await?;
    }
    Ok(())
}

// Convert incoming messages to our internal Message type
fn convert_messages(incoming: Vec<IncomingMessage>) -> Vec<Message> {
    let mut messages = Vec::new();

    for msg in incoming {
        let mut message = match msg.role.as_str() {
            "user" => Message::user(),
            "assistant" => Message::assistant(),
            "system" => Message::system(),
            _ => {
                warn!("Unknown role: {}", msg.role);
                continue;
            }
        };

        match msg.content {
            IncomingContent::Text(text) => {
                if !text.is_empty() {
                    message = message.with_text(text);
                }
            }
            IncomingContent::Parts(parts) => {
                for part in parts {
                    message = match part {
                        ContentPart::Text { text } => message.with_text(text),
                        ContentPart::ImageUrl { image_url } => message.with_image(image_url.url),
                    };
                }
            }
        }

        if !message.content.is_empty() {
            messages.push(message);
        }
    }

    messages
}

async fn handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<SseResponse, StatusCode> {
    // Check protocol header (optional in our case)
    if let Some(protocol) = headers.get("x-protocol") {
        if protocol.to_str().map(|p| p != "data").unwrap_or(true) {
            return Err(StatusCode::BAD_REQUEST);
        }
    }

    let messages = convert_messages(request.messages);
    if messages.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    info!(messages = messages.len(), "Received reply request");

    let (tx, response) = stream_channel();
    let agent = state.agent.clone();
    let delay = state.stream_delay;

    // Spawn task to handle streaming
    tokio::spawn(async move {
        let mut fragments = agent.run_streaming(&messages, delay);

        loop {
            tokio::select! {
                fragment = fragments.next() => {
                    match fragment {
                        Some(text) => {
                            if let Err(e) = tx.send(ProtocolFormatter::format_text(&text)).await {
                                error!("Error sending message through channel: {}", e);
                                return;
                            }
                        }
                        None => break,
                    }
                }
                // Dropping the stream cancels any model or search request still running
                _ = tx.closed() => {
                    info!("Client disconnected, stopping reply");
                    return;
                }
            }
        }

        let _ = tx.send(ProtocolFormatter::format_finish("stop")).await;
    });

    Ok(response)
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    prompt: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct AskResponse {
    response: String,
}

// simple ask an AI for a response, non streaming
async fn ask_handler(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> impl IntoResponse {
    let messages = vec![Message::user().with_text(request.prompt)];

    match state.agent.run(&messages).await {
        Ok(response) => (StatusCode::OK, Json(AskResponse { response })),
        Err(e) => {
            error!("Error answering ask request: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AskResponse {
                    response: format!("Execution failed: {}", e),
                }),
            )
        }
    }
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/reply", post(handler))
        .route("/ask", post(ask_handler))
        .with_state(state)
}
