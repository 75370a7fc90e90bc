//! NL bridge against a mock AI backend served by a local axum app.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use datasynergy::ai::{AiClient, ClientCredentials};
use datasynergy::config::FallbackConfig;
use datasynergy::models::NlResult;
use datasynergy::nl::{AnswerOrigin, NlBridge};
use serde_json::{json, Value};

const TOKEN: &str = "test-token";

#[derive(Clone, Copy)]
enum Mode {
    Structured,
    Raw,
    RejectCredentials,
    Slow,
    UpstreamError,
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn token(State(mode): State<Mode>, headers: HeaderMap) -> Response {
    if matches!(mode, Mode::RejectCredentials) {
        return (StatusCode::UNAUTHORIZED, "invalid_client").into_response();
    }
    // "id:secret"
    let expected = "Basic aWQ6c2VjcmV0";
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(expected) {
        return (StatusCode::UNAUTHORIZED, "bad basic auth").into_response();
    }
    Json(json!({ "access_token": TOKEN, "token_type": "bearer" })).into_response()
}

async fn genai(
    State(mode): State<Mode>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let bearer = format!("Bearer {}", TOKEN);
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(bearer.as_str()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let prompt = params.get("User_Prompt").cloned().unwrap_or_default();
    let limit = params.get("Max_Query_Limit").cloned().unwrap_or_default();
    match mode {
        Mode::Structured => Json(json!({
            "answer": format!("Remote answer to: {}", prompt),
            "sources": [{ "name": "CRM Data", "confidence": 92 }],
            "insights": ["Retention is up"],
            "metrics": { "limit": limit },
            "recommendations": []
        }))
        .into_response(),
        Mode::Raw => Json(json!({
            "Account_Name": "Acme",
            "Revenue": 1200,
            "Tags": ["a", "b"]
        }))
        .into_response(),
        Mode::Slow => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({ "answer": "too late" })).into_response()
        }
        Mode::UpstreamError => Json(json!({ "error": "model overloaded" })).into_response(),
        Mode::RejectCredentials => StatusCode::UNAUTHORIZED.into_response(),
    }
}

struct MockAi {
    port: u16,
    handle: tokio::task::JoinHandle<()>,
}

impl MockAi {
    async fn start(mode: Mode) -> Self {
        let app = Router::new()
            .route("/oauth/token", post(token))
            .route("/genai", get(genai))
            .with_state(mode);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { port, handle }
    }

    fn client(&self, timeout: Duration) -> AiClient {
        AiClient::new(
            format!("http://127.0.0.1:{}/oauth/token", self.port),
            format!("http://127.0.0.1:{}/genai", self.port),
            ClientCredentials {
                client_id: "id".into(),
                client_secret: "secret".into(),
            },
            timeout,
        )
        .unwrap()
        .with_max_query_limit(7)
    }
}

impl Drop for MockAi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn bridge(ai: AiClient) -> NlBridge {
    NlBridge::new(Some(ai), &FallbackConfig::default())
}

#[tokio::test]
async fn test_structured_answer_from_ai_backend() {
    let mock = MockAi::start(Mode::Structured).await;
    let answer = bridge(mock.client(Duration::from_secs(5)))
        .ask("How is retention?")
        .await
        .unwrap();

    assert_eq!(answer.origin, AnswerOrigin::AiBackend);
    match answer.result {
        NlResult::Structured(s) => {
            assert_eq!(s.answer, "Remote answer to: How is retention?");
            assert_eq!(s.sources[0].name, "CRM Data");
            assert_eq!(s.sources[0].confidence, 92);
            assert_eq!(s.metrics["limit"], "7");
        }
        other => panic!("expected structured answer, got {:?}", other),
    }
}

#[tokio::test]
async fn test_raw_answer_is_summarized() {
    let mock = MockAi::start(Mode::Raw).await;
    let answer = bridge(mock.client(Duration::from_secs(5)))
        .ask("Acme?")
        .await
        .unwrap();

    assert_eq!(answer.origin, AnswerOrigin::AiBackend);
    match answer.result {
        NlResult::Raw(raw) => {
            assert_eq!(raw.raw_json["Account_Name"], "Acme");
            assert_eq!(
                raw.natural_language,
                "Based on the data, account name is Acme, revenue is 1200."
            );
        }
        other => panic!("expected raw answer, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rejected_credentials_fall_back() {
    let mock = MockAi::start(Mode::RejectCredentials).await;
    let ai = mock.client(Duration::from_secs(5));
    let err = ai.access_token().await.unwrap_err();
    assert_eq!(err.code(), "authentication");

    let answer = bridge(ai).ask("Tell me about GenePoint").await.unwrap();
    assert_eq!(answer.origin, AnswerOrigin::LocalResponder);
    assert!(answer.result.natural_language().contains("GenePoint"));
}

#[tokio::test]
async fn test_upstream_error_field_falls_back() {
    let mock = MockAi::start(Mode::UpstreamError).await;
    let ai = mock.client(Duration::from_secs(5));
    let err = ai.ask("anything").await.unwrap_err();
    assert_eq!(err.code(), "backend");
    assert!(err.to_string().contains("model overloaded"));

    let answer = bridge(ai).ask("anything").await.unwrap();
    assert_eq!(answer.origin, AnswerOrigin::LocalResponder);
}

#[tokio::test]
async fn test_slow_backend_times_out_and_falls_back() {
    let mock = MockAi::start(Mode::Slow).await;
    let started = std::time::Instant::now();
    let answer = bridge(mock.client(Duration::from_millis(300)))
        .ask("Tell me about GenePoint")
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(answer.origin, AnswerOrigin::LocalResponder);
    assert_eq!(
        answer.result.raw_json()["Account_Details"]["Account_Name"],
        "GenePoint"
    );
}

#[tokio::test]
async fn test_unreachable_backend_falls_back() {
    let port = find_free_port();
    let ai = AiClient::new(
        format!("http://127.0.0.1:{}/oauth/token", port),
        format!("http://127.0.0.1:{}/genai", port),
        ClientCredentials {
            client_id: "id".into(),
            client_secret: "secret".into(),
        },
        Duration::from_secs(2),
    )
    .unwrap();
    let err = ai.ask("x").await.unwrap_err();
    assert!(matches!(err.code(), "connection" | "timeout"));

    let answer = bridge(ai).ask("Tell me about GenePoint").await.unwrap();
    assert_eq!(answer.origin, AnswerOrigin::LocalResponder);
}

#[tokio::test]
async fn test_both_stages_failing_reports_both() {
    let mock = MockAi::start(Mode::UpstreamError).await;
    let bridge = NlBridge::new(
        Some(mock.client(Duration::from_secs(5))),
        &FallbackConfig {
            enabled: false,
            ..FallbackConfig::default()
        },
    );
    let err = bridge.ask("anything").await.unwrap_err();
    let text = err.to_string();
    assert!(text.contains("model overloaded"));
    assert!(text.contains("local responder is disabled"));
}

#[tokio::test]
async fn test_bridge_is_shareable() {
    let mock = MockAi::start(Mode::Structured).await;
    let bridge = Arc::new(bridge(mock.client(Duration::from_secs(5))));
    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..5 {
        let bridge = bridge.clone();
        tasks.spawn(async move { bridge.ask(&format!("question {}", i)).await });
    }
    while let Some(joined) = tasks.join_next().await {
        let answer = joined.unwrap().unwrap();
        assert_eq!(answer.origin, AnswerOrigin::AiBackend);
    }
}
