//! End-to-end tests against a throwaway HTTP server on localhost.
//!
//! The fixture answers exactly one request with a canned response and hands
//! back the raw request text so tests can inspect what the client sent.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use turing_battle::session::Role;
use turing_battle::stream::pump;
use turing_battle::{
    BattleClient, BattleError, ClientConfig, LiveSessionController, PlayRequest, SessionStatus,
};

async fn serve_once(response: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.expect("read");
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        socket.write_all(response.as_bytes()).await.expect("write");
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&request).to_string()
    });
    (format!("http://{}", addr), handle)
}

fn json_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )
}

fn sse_response(events: &[&str]) -> String {
    let mut out = String::from(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/event-stream\r\n\
         Cache-Control: no-cache\r\n\
         Connection: close\r\n\r\n",
    );
    for event in events {
        out.push_str(&format!("data: {}\n\n", event));
    }
    out
}

fn client(url: &str) -> BattleClient {
    BattleClient::new(ClientConfig::new(url).validated().expect("config"))
}

// ---------------------------------------------------------------------------
// Play stream
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_play_stream_end_to_end() {
    let (url, server) = serve_once(sse_response(&[
        r#"{"role": "interrogator", "content": "What did you have for breakfast?", "turn": 1}"#,
        r#"{"role": "human", "content": "Just coffee, running late."}"#,
        r#"{"role": "judgment", "content": "Too terse.\nFinal Verdict: AI"}"#,
    ]))
    .await;

    let client = client(&url);
    let request = PlayRequest::new("moonshotai/kimi-k2", "openai/gpt-4o-mini", 1).unwrap();
    let mut controller = LiveSessionController::new();
    let mut signals = controller.start(&request, &client.play_transport()).unwrap();
    pump(&mut signals, &mut controller).await;

    assert_eq!(controller.status(), SessionStatus::Completed);
    assert_eq!(controller.turn_count(), 1);
    let roles: Vec<Role> = controller.messages().iter().map(|m| m.role.clone()).collect();
    assert_eq!(roles, vec![Role::Interrogator, Role::Participant, Role::Judgment]);

    let raw_request = server.await.unwrap();
    let request_line = raw_request.lines().next().unwrap();
    assert!(request_line.starts_with("GET /api/play?"));
    assert!(request_line.contains("participant_model=moonshotai%2Fkimi-k2"));
    assert!(request_line.contains("interrogator_model=openai%2Fgpt-4o-mini"));
    assert!(request_line.contains("num_questions=1"));
}

#[tokio::test]
async fn test_play_stream_cut_short_fails() {
    let events = [r#"{"role":"interrogator","content":"Q1"}"#];
    let (url, _server) = serve_once(sse_response(&events)).await;

    let client = client(&url);
    let request = PlayRequest::new("a/x", "b/y", 5).unwrap();
    let mut controller = LiveSessionController::new();
    let mut signals = controller.start(&request, &client.play_transport()).unwrap();
    pump(&mut signals, &mut controller).await;

    assert_eq!(controller.status(), SessionStatus::Failed);
    assert_eq!(controller.messages().len(), 2);
    assert_eq!(controller.messages()[1].role, Role::SystemError);
}

#[tokio::test]
async fn test_play_rejected_request_shows_server_error() {
    let (url, _server) = serve_once(json_response(
        "400 BAD REQUEST",
        r#"{"error":"Both participant and interrogator models must be selected"}"#,
    ))
    .await;

    let client = client(&url);
    let request = PlayRequest::new("a/x", "b/y", 5).unwrap();
    let mut controller = LiveSessionController::new();
    let mut signals = controller.start(&request, &client.play_transport()).unwrap();
    pump(&mut signals, &mut controller).await;

    assert_eq!(controller.status(), SessionStatus::Failed);
    assert_eq!(
        controller.messages()[0].content,
        "Both participant and interrogator models must be selected"
    );
}

#[tokio::test]
async fn test_play_unreachable_server_fails() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = client(&url);
    let request = PlayRequest::new("a/x", "b/y", 5).unwrap();
    let mut controller = LiveSessionController::new();
    let mut signals = controller.start(&request, &client.play_transport()).unwrap();
    pump(&mut signals, &mut controller).await;

    assert_eq!(controller.status(), SessionStatus::Failed);
    assert_eq!(controller.messages()[0].role, Role::SystemError);
}

// ---------------------------------------------------------------------------
// JSON endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_models_sorted_by_name() {
    let body = r#"{
        "models": [
            {"id": "openai/gpt-4o", "name": "OpenAI: GPT-4o"},
            {"id": "anthropic/claude", "name": "Anthropic: Claude"}
        ],
        "providers": ["anthropic", "openai"]
    }"#;
    let (url, server) = serve_once(json_response("200 OK", body)).await;

    let models = client(&url).models().await.unwrap();
    assert_eq!(models[0].id, "anthropic/claude");
    assert_eq!(models[1].id, "openai/gpt-4o");
    assert!(server.await.unwrap().starts_with("GET /api/models "));
}

#[tokio::test]
async fn test_battle_not_found_is_api_error() {
    let body = r#"{"error":"Battle not found"}"#;
    let (url, _server) = serve_once(json_response("404 NOT FOUND", body)).await;

    let err = client(&url).battle("missing").await.unwrap_err();
    match err {
        BattleError::Api(message) => assert_eq!(message, "Battle not found"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_leaderboard_http_error() {
    let (url, _server) = serve_once(json_response("500 INTERNAL SERVER ERROR", "{}")).await;

    let err = client(&url).leaderboard().await.unwrap_err();
    assert!(matches!(err, BattleError::Http { status: 500, .. }));
}

#[tokio::test]
async fn test_battles_and_key_status() {
    let body = r#"{"battles": [{
        "run_id": "r1", "participant_model": "a/x", "interrogator_model": "b/y",
        "verdict": "Human", "judgment": "j", "created_at": "2025-01-05 15:04:00"
    }]}"#;
    let (url, _server) = serve_once(json_response("200 OK", body)).await;
    let battles = client(&url).battles().await.unwrap();
    assert_eq!(battles.len(), 1);
    assert_eq!(battles[0].verdict.as_deref(), Some("Human"));

    let (url, _server) = serve_once(json_response("200 OK", r#"{"api_key_set":true}"#)).await;
    assert!(client(&url).api_key_status().await.unwrap().api_key_set);
}
