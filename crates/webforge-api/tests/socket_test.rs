// WebSocket tests for the WebForge API
// Serves the full router on an ephemeral port and talks to it with a
// tokio-tungstenite client: build stream close codes, replay then live
// delivery, single-consumer streams, and the chat socket.

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;
use webforge_api::api::chat::{END_OF_STREAM, REPLY_FAILED};
use webforge_api::{app, ApiConfig, Services};
use webforge_core::memory::ScriptedTextGenerator;
use webforge_core::{BuildEvent, BuildStream, ScaffoldGenerator};
use webforge_storage::{ChatStore, ModelStore, ProjectStore, SettingsStore};
use webforge_worker::{create_runner, BuildRunner, RunnerConfig};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

struct TestServer {
    _dir: TempDir,
    base_url: String,
    stream: Arc<BuildStream>,
    runner: Arc<dyn BuildRunner>,
    server: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn start_server(config: ApiConfig, write_delay: Duration) -> TestServer {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let projects = ProjectStore::new(dir.path().join("projects")).expect("project store");
    let settings = SettingsStore::new(dir.path().join("config.json")).expect("settings store");
    let models = ModelStore::new(dir.path().join("models"), settings).expect("model store");
    let chat = ChatStore::connect("sqlite::memory:")
        .await
        .expect("chat store");

    let stream = Arc::new(BuildStream::new());
    let runner = create_runner(
        RunnerConfig::default().with_write_delay(write_delay),
        stream.clone(),
        Arc::new(ScaffoldGenerator::new()),
        Arc::new(projects.clone()),
    );
    // No fallback reply: unknown prompts fail
    let text = Arc::new(ScriptedTextGenerator::new().reply("hello", "Hi there"));

    let services = Services {
        stream: stream.clone(),
        runner: runner.clone(),
        projects,
        models,
        chat,
        text,
        generator: "scaffold".to_string(),
    };
    let router = app(services, &config);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("local addr");
    let server = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    TestServer {
        _dir: dir,
        base_url: format!("ws://{addr}"),
        stream,
        runner,
        server,
    }
}

async fn test_server() -> TestServer {
    start_server(ApiConfig::default(), Duration::from_millis(1)).await
}

async fn connect(server: &TestServer, path: &str) -> Client {
    let (client, _) = connect_async(format!("{}{path}", server.base_url))
        .await
        .expect("Failed to connect");
    client
}

/// Next text or close frame; pings and pongs are skipped
async fn next_frame(client: &mut Client) -> Option<Message> {
    loop {
        let next = tokio::time::timeout(FRAME_TIMEOUT, client.next())
            .await
            .expect("Timed out waiting for a frame");
        match next {
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            Some(Ok(message)) => return Some(message),
            Some(Err(_)) | None => return None,
        }
    }
}

async fn next_event(client: &mut Client) -> Value {
    match next_frame(client).await {
        Some(Message::Text(text)) => serde_json::from_str(text.as_str()).expect("event JSON"),
        other => panic!("Expected an event, got {other:?}"),
    }
}

/// Read events until the server closes; returns them with the close code
async fn read_to_close(client: &mut Client) -> (Vec<Value>, Option<u16>) {
    let mut events = Vec::new();
    loop {
        match next_frame(client).await {
            Some(Message::Text(text)) => {
                events.push(serde_json::from_str(text.as_str()).expect("event JSON"));
            }
            Some(Message::Close(frame)) => {
                return (events, frame.map(|frame| u16::from(frame.code)));
            }
            Some(_) => {}
            None => return (events, None),
        }
    }
}

fn kinds(events: &[Value]) -> Vec<&str> {
    events
        .iter()
        .map(|event| event["type"].as_str().unwrap_or_default())
        .collect()
}

/// Session with only its `queued` event, and no workflow attached
fn queued_session(server: &TestServer) -> Uuid {
    let session = server.stream.create_session("a landing page");
    server
        .stream
        .publish(session.id(), BuildEvent::status("queued", "Build session created"));
    session.id()
}

#[tokio::test]
async fn test_unknown_session_closes_with_4404() {
    let server = test_server().await;

    let mut client = connect(&server, &format!("/ws/build/{}", Uuid::now_v7())).await;
    let (events, code) = read_to_close(&mut client).await;
    assert!(events.is_empty());
    assert_eq!(code, Some(4404));
}

#[tokio::test]
async fn test_malformed_session_id_closes_with_4404() {
    let server = test_server().await;

    let mut client = connect(&server, "/ws/build/not-a-session").await;
    let (events, code) = read_to_close(&mut client).await;
    assert!(events.is_empty());
    assert_eq!(code, Some(4404));
}

#[tokio::test]
async fn test_finished_session_replays_history_then_closes_normally() {
    let server = test_server().await;
    let id = queued_session(&server);
    server
        .stream
        .publish(id, BuildEvent::file("index.html", None));
    server.stream.publish(id, BuildEvent::complete("landing-page"));

    let mut client = connect(&server, &format!("/ws/build/{id}")).await;
    let (events, code) = read_to_close(&mut client).await;
    assert_eq!(kinds(&events), vec!["status", "file", "complete"]);
    assert_eq!(events[0]["stage"], "queued");
    assert_eq!(code, Some(1000));
}

#[tokio::test]
async fn test_replay_then_live_events_in_order() {
    let server = test_server().await;
    let id = queued_session(&server);

    let mut client = connect(&server, &format!("/ws/build/{id}")).await;
    let replayed = next_event(&mut client).await;
    assert_eq!(replayed["stage"], "queued");

    server
        .stream
        .publish(id, BuildEvent::status("generating", "Generating files"));
    server
        .stream
        .publish(id, BuildEvent::file("index.html", None));
    server.stream.publish(id, BuildEvent::complete("landing-page"));

    let (events, code) = read_to_close(&mut client).await;
    assert_eq!(kinds(&events), vec!["status", "file", "complete"]);
    assert_eq!(events[0]["stage"], "generating");
    assert_eq!(events[1]["path"], "index.html");
    assert_eq!(code, Some(1000));
}

#[tokio::test]
async fn test_second_client_is_rejected_while_stream_is_held() {
    let server = test_server().await;
    let id = queued_session(&server);

    let mut first = connect(&server, &format!("/ws/build/{id}")).await;
    assert_eq!(next_event(&mut first).await["stage"], "queued");

    let mut second = connect(&server, &format!("/ws/build/{id}")).await;
    let (events, code) = read_to_close(&mut second).await;
    assert!(events.is_empty());
    assert_eq!(code, Some(4409));

    // The first client keeps the live stream
    server.stream.publish(id, BuildEvent::error("model unavailable"));
    let (events, code) = read_to_close(&mut first).await;
    assert_eq!(kinds(&events), vec!["error"]);
    assert_eq!(events[0]["message"], "model unavailable");
    assert_eq!(code, Some(1000));
}

#[tokio::test]
async fn test_idle_stream_closes_with_4408() {
    let config = ApiConfig {
        stream_idle_timeout: Duration::from_millis(200),
        ..ApiConfig::default()
    };
    let server = start_server(config, Duration::from_millis(1)).await;
    let id = queued_session(&server);

    let mut client = connect(&server, &format!("/ws/build/{id}")).await;
    let (events, code) = read_to_close(&mut client).await;
    assert_eq!(kinds(&events), vec!["status"]);
    assert_eq!(code, Some(4408));
}

#[tokio::test]
async fn test_build_keeps_running_after_client_disconnects() {
    let server = start_server(ApiConfig::default(), Duration::from_millis(50)).await;
    let id = queued_session(&server);
    server.runner.start_build(id).await.expect("start build");

    let mut client = connect(&server, &format!("/ws/build/{id}")).await;
    assert_eq!(next_event(&mut client).await["stage"], "queued");
    client.close(None).await.expect("close");
    drop(client);

    let session = server.stream.get_session(id).expect("session");
    for _ in 0..200 {
        if session.is_completed() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(session.is_completed());
    let history = session.history();
    assert_eq!(
        history.last().map(|event| event.kind.as_str()),
        Some("complete")
    );

    // The live stream was released, so a new client can replay the whole build
    let mut client = connect(&server, &format!("/ws/build/{id}")).await;
    let (events, code) = read_to_close(&mut client).await;
    assert_eq!(events.len(), history.len());
    assert_eq!(code, Some(1000));
}

#[tokio::test]
async fn test_chat_socket_streams_reply_then_end_marker() {
    let server = test_server().await;

    let mut client = connect(&server, "/api/chat/ws/1").await;
    client
        .send(Message::Text("hello".into()))
        .await
        .expect("send");

    let mut frames = Vec::new();
    while let Some(Message::Text(text)) = next_frame(&mut client).await {
        let done = text.as_str() == END_OF_STREAM;
        frames.push(text.as_str().to_string());
        if done {
            break;
        }
    }
    assert_eq!(frames, vec!["Hi there".to_string(), END_OF_STREAM.to_string()]);
}

#[tokio::test]
async fn test_chat_socket_hides_generation_failure_details() {
    let server = test_server().await;

    let mut client = connect(&server, "/api/chat/ws/7").await;
    client
        .send(Message::Text("tell me a secret".into()))
        .await
        .expect("send");

    let mut frames = Vec::new();
    while let Some(Message::Text(text)) = next_frame(&mut client).await {
        let done = text.as_str() == END_OF_STREAM;
        frames.push(text.as_str().to_string());
        if done {
            break;
        }
    }
    assert_eq!(frames, vec![REPLY_FAILED.to_string(), END_OF_STREAM.to_string()]);
    assert!(frames.iter().all(|frame| !frame.contains("scripted")));
}
