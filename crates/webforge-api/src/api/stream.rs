// Build stream adapter (WebSocket)
//
// Replays a session's history, then forwards live events as JSON text
// frames until the terminal event. Close codes:
//   4404 unknown session
//   4409 another client already owns the live stream
//   4408 no event within the idle timeout
//   1000 build finished
// A client going away only ends this connection; the build keeps running.

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures::StreamExt;
use std::borrow::Cow;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use webforge_core::{BuildEvent, BuildStreamError};

use super::builds::{parse_session_id, AppState};

pub const CLOSE_NORMAL: u16 = 1000;
pub const CLOSE_IDLE_TIMEOUT: u16 = 4408;
pub const CLOSE_BUSY: u16 = 4409;
pub const CLOSE_NOT_FOUND: u16 = 4404;

/// GET /ws/build/{id} - Stream a build session
pub async fn build_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    ws.on_upgrade(move |socket| serve_build_socket(socket, state, id))
}

/// Outcome of one send attempt
enum Sent {
    Ok,
    Disconnected,
}

async fn send_event(socket: &mut WebSocket, event: &BuildEvent) -> Sent {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, kind = %event.kind, "Skipping unserializable build event");
            return Sent::Ok;
        }
    };
    match socket.send(Message::Text(text)).await {
        Ok(()) => Sent::Ok,
        Err(_) => Sent::Disconnected,
    }
}

async fn close(mut socket: WebSocket, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code,
        reason: Cow::Borrowed(reason),
    };
    if socket.send(Message::Close(Some(frame))).await.is_err() {
        debug!(code, "Client gone before close frame");
    }
}

async fn serve_build_socket(mut socket: WebSocket, state: AppState, raw_id: String) {
    let Some(id) = parse_session_id(&raw_id) else {
        debug!(session = %raw_id, "Stream requested with malformed session id");
        return close(socket, CLOSE_NOT_FOUND, "Build session not found").await;
    };

    let subscription = match state.stream.subscribe(id) {
        Ok(subscription) => subscription,
        Err(BuildStreamError::SessionNotFound(id)) => {
            debug!(session_id = %id, "Stream requested for unknown build session");
            return close(socket, CLOSE_NOT_FOUND, "Build session not found").await;
        }
        Err(BuildStreamError::StreamBusy(id)) => {
            debug!(session_id = %id, "Build session already being streamed");
            return close(socket, CLOSE_BUSY, "Build session already being streamed").await;
        }
    };

    let session_id = subscription.session_id;
    info!(
        session_id = %session_id,
        replay = subscription.replay.len(),
        "Build stream attached"
    );

    for event in &subscription.replay {
        if let Sent::Disconnected = send_event(&mut socket, event).await {
            debug!(session_id = %session_id, "Client disconnected during replay");
            return;
        }
    }
    if subscription.finished {
        return close(socket, CLOSE_NORMAL, "Build finished").await;
    }

    let mut live = subscription.live;
    let idle = tokio::time::sleep(state.idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            next = live.next() => match next {
                Some(event) => {
                    if let Sent::Disconnected = send_event(&mut socket, &event).await {
                        debug!(session_id = %session_id, "Client disconnected");
                        return;
                    }
                    if event.is_terminal() {
                        info!(session_id = %session_id, kind = %event.kind, "Build stream finished");
                        return close(socket, CLOSE_NORMAL, "Build finished").await;
                    }
                    idle.as_mut().reset(Instant::now() + state.idle_timeout);
                }
                None => {
                    return close(socket, CLOSE_NORMAL, "Build finished").await;
                }
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    debug!(session_id = %session_id, "Client disconnected");
                    return;
                }
                // Client frames carry nothing for build streams
                Some(Ok(_)) => {}
            },
            _ = &mut idle => {
                info!(session_id = %session_id, "Build stream idle, closing");
                return close(socket, CLOSE_IDLE_TIMEOUT, "Idle timeout").await;
            }
        }
    }
}
