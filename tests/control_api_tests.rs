// Integration tests for the control API routes

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{spoken, Harness, HarnessBuilder, ScriptedBackend};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use voice_agent::{create_router, AgentError, AppState, Backend, LoopState, TextToSpeech};

fn app(h: &Harness) -> Router {
    let speech = TextToSpeech::new(
        h.backend.clone() as Arc<dyn Backend>,
        h.surface.surface(),
        "en-US-Natalie",
    );
    create_router(AppState {
        conversation: Arc::clone(&h.conversation),
        speech: Arc::new(speech),
        surface: h.surface.clone(),
        session_id: h.session.clone(),
        address: format!("http://localhost:8090/?session={}", h.session),
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn chat_harness() -> Harness {
    HarnessBuilder::new(ScriptedBackend {
        chat: spoken("reply.mp3", Some("hi")),
        ..Default::default()
    })
    .hands_free(false)
    .build()
}

#[tokio::test]
async fn test_health() {
    let h = chat_harness();
    let response = app(&h)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_session_reports_id_and_address() {
    let h = chat_harness();
    let (status, body) = send(&app(&h), "GET", "/session", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], json!(h.session.as_str()));
    assert!(body["address"]
        .as_str()
        .unwrap()
        .ends_with(h.session.as_str()));
}

#[tokio::test]
async fn test_speak_with_blank_text_is_bad_request() {
    let h = chat_harness();
    let (status, body) = send(&app(&h), "POST", "/speak", Some(json!({ "text": "  " }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please enter some text");
    assert_eq!(h.backend.call_count("synthesize"), 0);
}

#[tokio::test]
async fn test_start_then_stop_runs_a_turn() {
    let h = chat_harness();
    let app = app(&h);

    let (status, body) = send(&app, "POST", "/conversation/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "capturing");

    let (status, _) = send(&app, "POST", "/conversation/start", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "POST", "/conversation/stop", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["state"], "processing");

    for _ in 0..200 {
        if h.conversation.stats().turns_completed == 1
            && h.conversation.state() == LoopState::WaitingToStart
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let (status, body) = send(&app, "GET", "/conversation/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["turns_completed"], 1);
    assert_eq!(body["stats"]["state"], "waiting_to_start");
    assert_eq!(body["surface"]["transcript"], "hi");
    assert_eq!(h.player.played(), vec!["reply.mp3".to_string()]);
}

#[tokio::test]
async fn test_stop_without_capture_conflicts() {
    let h = chat_harness();
    let (status, _) = send(&app(&h), "POST", "/conversation/stop", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancel_releases_device() {
    let h = chat_harness();
    let app = app(&h);

    send(&app, "POST", "/conversation/start", None).await;
    assert!(h.device.is_open());

    let (status, body) = send(&app, "POST", "/conversation/cancel", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "waiting_to_start");
    assert!(!h.device.is_open());
}

#[tokio::test]
async fn test_denied_microphone_is_forbidden() {
    let h = HarnessBuilder::new(ScriptedBackend::default())
        .device_error(AgentError::PermissionDenied)
        .build();

    let (status, body) = send(&app(&h), "POST", "/conversation/start", None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Please allow microphone access in your settings");
}

#[tokio::test]
async fn test_voices_fall_back_to_defaults() {
    let h = chat_harness();
    let (status, body) = send(&app(&h), "GET", "/voices", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["voices"].as_array().unwrap().len(), 4);
    assert_eq!(body["voices"][0], "en-US-Natalie");
}
