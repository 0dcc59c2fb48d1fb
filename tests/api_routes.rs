// Integration tests for the ranking HTTP API: routing, validation, ordering,
// error responses and the text export, driven through the router without a socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use ranking_relay::api;
use ranking_relay::control::ControlHub;
use ranking_relay::metrics;
use ranking_relay::store::RankingStore;

async fn test_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = RankingStore::open(dir.path().join("rankings.json"))
        .await
        .unwrap();
    (api::router(Arc::new(store), ControlHub::new()), dir)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send_json(app, "POST", uri, Some(body)).await
}

fn names(list: &Value) -> Vec<&str> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect()
}

// ── Status / document ────────────────────────────────────────────────

#[tokio::test]
async fn test_status_reports_online() {
    let (app, _dir) = test_app().await;
    let (status, body) = send_json(&app, "GET", "/api/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "online");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_fresh_document_has_four_empty_lists() {
    let (app, _dir) = test_app().await;
    let (status, body) = send_json(&app, "GET", "/api/rankings", None).await;
    assert_eq!(status, StatusCode::OK);
    for key in ["mazeRankingEasy", "mazeRankingMedium", "mazeRankingHard", "quizRanking"] {
        assert_eq!(body[key], json!([]), "{key} should start empty");
    }
}

// ── Append ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_append_maze_entry_into_empty_list() {
    let (app, _dir) = test_app().await;
    let entry = json!({
        "name": "Ana",
        "time": 45230,
        "timeString": "0:45.23",
        "date": "01/02/2025",
        "difficulty": "easy"
    });

    let (status, body) = post(&app, "/api/rankings/maze-easy", json!({ "entry": entry })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["ranking"], json!([entry]));

    let (_, list) = send_json(&app, "GET", "/api/rankings/maze-easy", None).await;
    assert_eq!(list, json!([entry]));
}

#[tokio::test]
async fn test_append_keeps_fastest_first() {
    let (app, _dir) = test_app().await;
    let slow = json!({ "entry": { "name": "slow", "time": 30000 } });
    let fast = json!({ "entry": { "name": "fast", "time": 20000 } });
    post(&app, "/api/rankings/maze-hard", slow).await;
    let (_, body) = post(&app, "/api/rankings/maze-hard", fast).await;

    assert_eq!(names(&body["ranking"]), vec!["fast", "slow"]);
}

#[tokio::test]
async fn test_quiz_orders_by_percentage_descending() {
    let (app, _dir) = test_app().await;
    for (name, score, pct) in [("low", 3, 30), ("high", 9, 90), ("mid", 6, 60)] {
        let entry = json!({ "name": name, "score": score, "total": 10, "percentage": pct });
        let (status, _) = post(&app, "/api/rankings/quiz", json!({ "entry": entry })).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, list) = send_json(&app, "GET", "/api/rankings/quiz", None).await;
    assert_eq!(names(&list), vec!["high", "mid", "low"]);
}

#[tokio::test]
async fn test_eleventh_entry_drops_the_worst() {
    let (app, _dir) = test_app().await;
    for i in 0..10 {
        let entry = json!({ "name": format!("p{i}"), "time": 10_000 + i * 1000 });
        post(&app, "/api/rankings/maze-medium", json!({ "entry": entry })).await;
    }
    let newcomer = json!({ "entry": { "name": "new", "time": 5000 } });
    let (_, body) = post(&app, "/api/rankings/maze-medium", newcomer).await;

    let list = names(&body["ranking"]);
    assert_eq!(list.len(), 10);
    assert_eq!(list[0], "new");
    assert!(!list.contains(&"p9"), "slowest entry should be dropped");
}

#[tokio::test]
async fn test_append_requires_entry() {
    let (app, _dir) = test_app().await;
    let (status, body) = post(&app, "/api/rankings/quiz", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "entry is required");
}

#[tokio::test]
async fn test_append_rejects_invalid_entries() {
    let (app, _dir) = test_app().await;

    // Quiz shape posted to a maze list
    let quiz = json!({ "name": "x", "score": 1, "total": 2, "percentage": 50 });
    let (status, _) = post(&app, "/api/rankings/maze-easy", json!({ "entry": quiz })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let blank = json!({ "name": "   ", "time": 1000 });
    let (status, _) = post(&app, "/api/rankings/maze-easy", json!({ "entry": blank })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let wrong_level = json!({ "name": "x", "time": 1000, "difficulty": "hard" });
    let (status, body) =
        post(&app, "/api/rankings/maze-easy", json!({ "entry": wrong_level })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("hard"));

    let (_, list) = send_json(&app, "GET", "/api/rankings/maze-easy", None).await;
    assert_eq!(list, json!([]));
}

// ── Replace / clear ──────────────────────────────────────────────────

#[tokio::test]
async fn test_replace_sorts_and_caps() {
    let (app, _dir) = test_app().await;
    let ranking: Vec<Value> = (0..12)
        .map(|i| json!({ "name": format!("q{i}"), "score": i, "total": 12, "percentage": i * 8 }))
        .collect();

    let (status, body) =
        post(&app, "/api/rankings/quiz/replace", json!({ "ranking": ranking })).await;
    assert_eq!(status, StatusCode::OK);
    let list = names(&body["ranking"]);
    assert_eq!(list.len(), 10);
    assert_eq!(list[0], "q11");
    assert_eq!(list[9], "q2");
}

#[tokio::test]
async fn test_replace_requires_array() {
    let (app, _dir) = test_app().await;
    let (status, body) =
        post(&app, "/api/rankings/quiz/replace", json!({ "ranking": "nope" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ranking must be an array");

    let (status, _) = post(&app, "/api/rankings/quiz/replace", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_replace_reports_bad_position() {
    let (app, _dir) = test_app().await;
    let ranking = json!([{ "name": "ok", "time": 1000 }, { "name": "bad" }]);
    let (status, body) =
        post(&app, "/api/rankings/maze-easy/replace", json!({ "ranking": ranking })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("position 1"));
}

#[tokio::test]
async fn test_clear_then_get_is_empty() {
    let (app, _dir) = test_app().await;
    let entry = json!({ "name": "a", "score": 5, "total": 10, "percentage": 50 });
    post(&app, "/api/rankings/quiz", json!({ "entry": entry })).await;

    let (status, body) = send_json(&app, "DELETE", "/api/rankings/quiz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (_, list) = send_json(&app, "GET", "/api/rankings/quiz", None).await;
    assert_eq!(list, json!([]));

    let (_, doc) = send_json(&app, "GET", "/api/rankings", None).await;
    assert_eq!(doc["quizRanking"], json!([]));
}

// ── Unknown types ────────────────────────────────────────────────────

#[tokio::test]
async fn test_unknown_type_get_is_empty() {
    let (app, _dir) = test_app().await;
    let (status, body) = send_json(&app, "GET", "/api/rankings/chess", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_unknown_type_rejected_on_writes() {
    let (app, _dir) = test_app().await;
    let entry = json!({ "entry": { "name": "a", "time": 1 } });

    let (status, body) = post(&app, "/api/rankings/chess", entry).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid ranking type");

    let (status, _) = post(&app, "/api/rankings/chess/replace", json!({ "ranking": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(&app, "DELETE", "/api/rankings/chess", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/api/rankings/chess/export", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Request bodies / write failures ──────────────────────────────────

#[tokio::test]
async fn test_missing_body_is_bad_request() {
    let (app, _dir) = test_app().await;

    let (status, body) = send_json(&app, "POST", "/api/rankings/quiz", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("invalid request body"));

    let (status, body) = send_json(&app, "POST", "/api/rankings/quiz/replace", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unknown_type_checked_before_body() {
    let (app, _dir) = test_app().await;

    let (status, body) = send_json(&app, "POST", "/api/rankings/chess", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid ranking type");

    let (status, body) = send_json(&app, "POST", "/api/rankings/chess/replace", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid ranking type");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (app, _dir) = test_app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/rankings/quiz")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_write_failure_returns_server_error() {
    let (app, dir) = test_app().await;
    // The store writes through a sibling temp file; a directory in its place
    // makes every write fail.
    std::fs::create_dir(dir.path().join("rankings.json.tmp")).unwrap();

    let entry = json!({ "name": "a", "score": 5, "total": 10, "percentage": 50 });
    let (status, body) = post(&app, "/api/rankings/quiz", json!({ "entry": entry })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to save ranking");

    let (status, _) = send_json(&app, "DELETE", "/api/rankings/quiz", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, list) = send_json(&app, "GET", "/api/rankings/quiz", None).await;
    assert_eq!(list, json!([]));
}

// ── Export / metrics ─────────────────────────────────────────────────

#[tokio::test]
async fn test_export_renders_text_report() {
    let (app, _dir) = test_app().await;
    let entry = json!({ "name": "Ana", "time": 45230, "timeString": "0:45.23" });
    post(&app, "/api/rankings/maze-easy", json!({ "entry": entry })).await;

    let (status, bytes) = send(&app, "GET", "/api/rankings/maze-easy/export", None).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("RANKING - MAZE - EASY"));
    assert!(text.contains("Ana"));
    assert!(text.contains("0:45.23"));
    assert!(text.contains("Participants: 1"));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    metrics::register_metrics();
    let (app, _dir) = test_app().await;
    send(&app, "GET", "/api/status", None).await;

    let (status, bytes) = send(&app, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("ranking_relay_api_requests_total"));
}
