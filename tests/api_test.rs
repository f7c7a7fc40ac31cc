mod helpers;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use cognis::memory::MemoryKind;
use cognis::server::create_router;
use cognis::Cognition;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
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
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn app() -> (Arc<Cognition>, Router) {
    let core = helpers::test_core();
    let router = create_router(Arc::clone(&core));
    (core, router)
}

#[tokio::test]
async fn health_reports_oracle() {
    let (_, app) = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["oracle"], "extractive");
    assert_eq!(body["persistent"], false);
    assert_eq!(body["operations"]["memory_operations"], 0);
}

#[tokio::test]
async fn health_counts_operations() {
    let (_, app) = app();
    send(
        &app,
        Method::POST,
        "/api/v1/memory/store",
        Some(json!({ "content": "queue depth alarm fired", "kind": "episodic" })),
    )
    .await;
    send(
        &app,
        Method::POST,
        "/api/v1/memory/retrieve",
        Some(json!({ "query": "queue depth" })),
    )
    .await;
    send(
        &app,
        Method::POST,
        "/api/v1/reasoning/analyze",
        Some(json!({ "query": "queue depth", "mode": "abductive" })),
    )
    .await;
    send(
        &app,
        Method::POST,
        "/api/v1/learning/experience",
        Some(json!({ "experience": "scaled workers", "outcome": "success" })),
    )
    .await;

    let (_, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(body["operations"]["memory_operations"], 2);
    assert_eq!(body["operations"]["reasoning_requests"], 1);
    assert_eq!(body["operations"]["learning_sessions"], 1);
}

#[tokio::test]
async fn evolution_history_lists_recent_cycles() {
    let (core, app) = app();
    for _ in 0..3 {
        core.trigger_evolution().unwrap();
    }

    let (status, body) = send(&app, Method::GET, "/api/v1/evolution/history?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["cycles"][0]["generation"], 2);
    assert_eq!(body["cycles"][1]["generation"], 3);
    assert_eq!(body["cycles"][1]["fitness_declined"], false);

    let (_, status_body) = send(&app, Method::GET, "/api/v1/evolution/status", None).await;
    assert_eq!(status_body["recent_cycles"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn store_then_retrieve() {
    let (_, app) = app();
    let (status, stored) = send(
        &app,
        Method::POST,
        "/api/v1/memory/store",
        Some(json!({
            "content": "the on-call rotation changes on mondays",
            "kind": "semantic",
            "importance": 0.7,
            "tags": ["ops"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = stored["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/memory/retrieve",
        Some(json!({ "query": "on-call rotation", "limit": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["memories"][0]["id"], id.as_str());

    let (status, stats) = send(&app, Method::GET, "/api/v1/memory/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 1);
}

#[tokio::test]
async fn unknown_kind_is_bad_request() {
    let (_, app) = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/memory/store",
        Some(json!({ "content": "x", "kind": "dreamlike" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn analyze_without_evidence_is_unprocessable() {
    let (_, app) = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/reasoning/analyze",
        Some(json!({ "query": "what is the meaning of all this" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "insufficient_evidence");
}

#[tokio::test]
async fn analyze_with_memories() {
    let (core, app) = app();
    let entry = helpers::remember(&core, "releases are cut every friday", MemoryKind::Procedural, 0.8);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/reasoning/analyze",
        Some(json!({ "query": "when are releases cut", "mode": "inductive" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "inductive");
    assert_eq!(body["evidence"][0], entry.id.as_str());
    let confidence = body["confidence"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&confidence));
}

#[tokio::test]
async fn bad_mode_is_bad_request() {
    let (_, app) = app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/reasoning/analyze",
        Some(json!({ "query": "q", "mode": "lateral" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn experience_is_accepted_and_counted() {
    let (_, app) = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/learning/experience",
        Some(json!({ "experience": "paired on the migration", "outcome": "success", "importance": 0.6 })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "accepted");

    let (status, stats) = send(&app, Method::GET, "/api/v1/learning/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_experiences"], 1);
    assert!(stats["adaptation_score"].as_f64().unwrap() > 50.0);
}

#[tokio::test]
async fn empty_experience_is_rejected() {
    let (_, app) = app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/learning/experience",
        Some(json!({ "experience": "  ", "outcome": "success" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn trigger_conflicts_while_cycle_runs() {
    let (core, app) = app();

    let guard = core.evolution().begin().unwrap();
    let (status, body) = send(&app, Method::POST, "/api/v1/evolution/trigger", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "already_running");

    // Status stays readable during the cycle.
    let (status, running) = send(&app, Method::GET, "/api/v1/evolution/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(running["state"], "running");
    guard.complete().unwrap();

    let (status, body) = send(&app, Method::POST, "/api/v1/evolution/trigger", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");
    assert_eq!(body["cycle"]["generation"], 2);

    let (_, status_body) = send(&app, Method::GET, "/api/v1/evolution/status", None).await;
    assert_eq!(status_body["generation"], 2);
    assert_eq!(status_body["state"], "idle");
}
