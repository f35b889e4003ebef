// Chat HTTP and WebSocket routes
//
// Every exchange is persisted: the user's prompt, then the assistant reply.
// Prompts that start with "create" or "build" also start a build session.
// The WebSocket variant streams reply chunks as text frames and ends each
// reply with END_OF_STREAM.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use webforge_core::{truncate_chars, BuildStream, SessionSnapshot, TextGenerator};
use webforge_storage::{
    ChatMessageRow, ChatSessionRow, ChatStore, CreateChatMessage, StorageError,
    DEFAULT_SESSION_TITLE,
};
use webforge_worker::BuildRunner;

use super::builds::start_build_session;
use super::common::{ApiError, ApiResult, ErrorResponse, ListResponse};

/// Marks the end of one streamed reply
pub const END_OF_STREAM: &str = "<|EOS|>";

/// Sent in place of a reply when generation fails; details stay in the logs
pub const REPLY_FAILED: &str = "[error] Reply generation failed.";

const TITLE_CHARS: usize = 60;
const BUILD_KEYWORDS: [&str; 2] = ["create", "build"];

/// Request to send a chat message
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChatRequest {
    #[schema(example = "build a portfolio site")]
    pub text: String,
    /// Existing chat session; a new one is created when absent
    #[serde(default)]
    pub session_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub session_id: i64,
    pub reply: String,
    /// Build session started by this message, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<SessionSnapshot>,
}

/// App state for chat routes
#[derive(Clone)]
pub struct AppState {
    pub chat: ChatStore,
    pub text: Arc<dyn TextGenerator>,
    pub stream: Arc<BuildStream>,
    pub runner: Arc<dyn BuildRunner>,
}

/// Create chat routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(send_message))
        .route("/api/chat/sessions", get(list_sessions))
        .route("/api/chat/messages/:session_id", get(list_messages))
        .route("/api/chat/ws/:session_id", get(chat_socket))
        .with_state(state)
}

/// True when a prompt asks for a project rather than a conversation
pub fn is_build_request(prompt: &str) -> bool {
    let lowered = prompt.trim_start().to_lowercase();
    BUILD_KEYWORDS
        .iter()
        .any(|keyword| lowered.starts_with(keyword))
}

fn session_title(prompt: &str) -> String {
    let title = truncate_chars(prompt.trim(), TITLE_CHARS);
    if title.is_empty() {
        DEFAULT_SESSION_TITLE.to_string()
    } else {
        title.to_string()
    }
}

async fn open_session(
    chat: &ChatStore,
    session_id: Option<i64>,
    prompt: &str,
) -> Result<ChatSessionRow, StorageError> {
    match session_id {
        Some(id) => chat.ensure_session(id, &session_title(prompt)).await,
        None => chat.create_session(&session_title(prompt)).await,
    }
}

async fn record(
    chat: &ChatStore,
    session_id: i64,
    role: &str,
    content: &str,
) -> Result<ChatMessageRow, StorageError> {
    chat.add_message(CreateChatMessage {
        session_id,
        role: role.to_string(),
        content: content.to_string(),
    })
    .await
}

/// POST /api/chat - Send a message and get the reply
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Empty message", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "chat"
)]
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let prompt = req.text.trim();
    if prompt.is_empty() {
        return Err(ApiError::bad_request("Message must not be empty."));
    }

    let session = open_session(&state.chat, req.session_id, prompt).await?;
    record(&state.chat, session.id, "user", prompt).await?;

    let (reply, build) = if is_build_request(prompt) {
        let snapshot =
            start_build_session(&state.stream, state.runner.as_ref(), prompt).await?;
        info!(chat_session = session.id, session_id = %snapshot.id, "Chat started a build");
        (
            format!("Building your project. Follow build session {}.", snapshot.id),
            Some(snapshot),
        )
    } else {
        let reply = state.text.complete(prompt).await.map_err(|e| {
            tracing::error!(chat_session = session.id, error = %e, "Chat completion failed");
            ApiError::internal()
        })?;
        (reply, None)
    };

    record(&state.chat, session.id, "assistant", &reply).await?;
    Ok(Json(ChatResponse {
        session_id: session.id,
        reply,
        build,
    }))
}

/// GET /api/chat/sessions - List chat sessions
#[utoipa::path(
    get,
    path = "/api/chat/sessions",
    responses(
        (status = 200, description = "Chat sessions, newest first", body = ListResponse<ChatSessionRow>)
    ),
    tag = "chat"
)]
pub async fn list_sessions(
    State(state): State<AppState>,
) -> ApiResult<Json<ListResponse<ChatSessionRow>>> {
    Ok(Json(ListResponse::new(state.chat.list_sessions().await?)))
}

/// GET /api/chat/messages/{session_id} - Transcript of a chat session
#[utoipa::path(
    get,
    path = "/api/chat/messages/{session_id}",
    params(("session_id" = i64, Path, description = "Chat session ID")),
    responses(
        (status = 200, description = "Messages, oldest first", body = ListResponse<ChatMessageRow>),
        (status = 404, description = "Chat session not found", body = ErrorResponse)
    ),
    tag = "chat"
)]
pub async fn list_messages(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> ApiResult<Json<ListResponse<ChatMessageRow>>> {
    if state.chat.get_session(session_id).await?.is_none() {
        return Err(ApiError::not_found(format!(
            "Chat session {session_id} not found."
        )));
    }
    Ok(Json(ListResponse::new(
        state.chat.list_messages(session_id).await?,
    )))
}

/// GET /api/chat/ws/{session_id} - Streamed chat
pub async fn chat_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> Response {
    ws.on_upgrade(move |socket| serve_chat_socket(socket, state, session_id))
}

async fn serve_chat_socket(mut socket: WebSocket, state: AppState, session_id: i64) {
    info!(chat_session = session_id, "Chat stream attached");

    while let Some(incoming) = socket.recv().await {
        let prompt = match incoming {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };
        let prompt = prompt.trim();
        if prompt.is_empty() {
            continue;
        }

        if let Err(e) = stream_reply(&mut socket, &state, session_id, prompt).await {
            match e {
                ReplyError::Disconnected => break,
                ReplyError::Storage(e) => {
                    warn!(chat_session = session_id, error = %e, "Chat transcript write failed");
                    break;
                }
            }
        }
    }

    debug!(chat_session = session_id, "Chat stream closed");
}

enum ReplyError {
    Disconnected,
    Storage(StorageError),
}

impl From<StorageError> for ReplyError {
    fn from(err: StorageError) -> Self {
        ReplyError::Storage(err)
    }
}

async fn send_text(socket: &mut WebSocket, text: String) -> Result<(), ReplyError> {
    socket
        .send(Message::Text(text))
        .await
        .map_err(|_| ReplyError::Disconnected)
}

async fn stream_reply(
    socket: &mut WebSocket,
    state: &AppState,
    session_id: i64,
    prompt: &str,
) -> Result<(), ReplyError> {
    open_session(&state.chat, Some(session_id), prompt).await?;
    record(&state.chat, session_id, "user", prompt).await?;

    let mut reply = String::new();
    match state.text.complete_stream(prompt).await {
        Ok(mut chunks) => {
            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(text) => {
                        reply.push_str(&text);
                        send_text(socket, text).await?;
                    }
                    Err(e) => {
                        warn!(chat_session = session_id, error = %e, "Chat stream failed");
                        send_text(socket, REPLY_FAILED.to_string()).await?;
                        break;
                    }
                }
            }
        }
        Err(e) => {
            warn!(chat_session = session_id, error = %e, "Chat completion failed");
            send_text(socket, REPLY_FAILED.to_string()).await?;
        }
    }
    send_text(socket, END_OF_STREAM.to_string()).await?;

    if !reply.is_empty() {
        record(&state.chat, session_id, "assistant", &reply).await?;
    }
    Ok(())
}
