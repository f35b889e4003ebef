// Integration tests for the OpenAI text generator against a mock server

use futures::StreamExt;
use serde_json::json;
use webforge_openai::{OpenAiConfig, OpenAiTextGenerator, TextGenerator};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn generator_for(server: &MockServer) -> OpenAiTextGenerator {
    let config = OpenAiConfig::new("sk-test")
        .with_model("gpt-test")
        .with_base_url(format!("{}/v1", server.uri()));
    OpenAiTextGenerator::new(config).unwrap()
}

#[tokio::test]
async fn test_complete_returns_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-test", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-test",
            "choices": [{
                "message": {"role": "assistant", "content": "{\"index.html\": \"<h1>Hi</h1>\"}"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 3, "completion_tokens": 5, "total_tokens": 8}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = generator_for(&server).complete("make a page").await.unwrap();
    assert_eq!(reply, r#"{"index.html": "<h1>Hi</h1>"}"#);
}

#[tokio::test]
async fn test_complete_surfaces_http_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let err = generator_for(&server).complete("hi").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("429"), "unexpected error: {message}");
    assert!(message.contains("rate limited"));
}

#[tokio::test]
async fn test_complete_gives_up_after_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": []}))
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = OpenAiConfig::new("sk-test")
        .with_base_url(format!("{}/v1", server.uri()))
        .with_request_timeout(std::time::Duration::from_millis(100));
    let generator = OpenAiTextGenerator::new(config).unwrap();

    let started = std::time::Instant::now();
    assert!(generator.complete("hi").await.is_err());
    assert!(started.elapsed() < std::time::Duration::from_secs(4));
}

#[tokio::test]
async fn test_stream_yields_deltas_until_done() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let chunks: Vec<String> = generator_for(&server)
        .complete_stream("hi")
        .await
        .unwrap()
        .map(|chunk| chunk.unwrap())
        .collect()
        .await;

    assert_eq!(chunks, vec!["Hel".to_string(), "lo".to_string()]);
}
