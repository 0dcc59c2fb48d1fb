// HTTP API routes (ranking lists, status, export, metrics, remote control).

pub mod ws;

use axum::{
    extract::{rejection::JsonRejection, Json, Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{Local, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

use crate::control::ControlHub;
use crate::metrics;
use crate::ranking::{RankingEntry, RankingKind};
use crate::report;
use crate::store::{RankingStore, StoreError};

// ── Request types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct AppendRequest {
    pub entry: Option<Value>,
}

#[derive(Deserialize)]
pub struct ReplaceRequest {
    pub ranking: Option<Value>,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RankingStore>,
    pub control: ControlHub,
}

// ── Error helper ──────────────────────────────────────────────────────

fn json_error(status: StatusCode, msg: &str) -> impl IntoResponse {
    (status, Json(json!({ "error": msg })))
}

fn internal_error(e: StoreError) -> impl IntoResponse {
    tracing::error!("Ranking store error: {e}");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save ranking")
}

fn parse_kind(raw: &str) -> Result<RankingKind, Response> {
    raw.parse::<RankingKind>().map_err(|e| {
        tracing::warn!("Rejected request: {e}");
        json_error(StatusCode::BAD_REQUEST, "Invalid ranking type").into_response()
    })
}

/// Unwrap a JSON body, answering malformed or missing bodies with a 400.
fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    body.map(|Json(req)| req).map_err(|rejection| {
        let msg = format!("invalid request body: {}", rejection.body_text());
        json_error(StatusCode::BAD_REQUEST, &msg).into_response()
    })
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(store: Arc<RankingStore>, control: ControlHub) -> Router {
    let state = AppState { store, control };

    Router::new()
        .route("/api/status", get(status))
        // Rankings
        .route("/api/rankings", get(get_all_rankings))
        .route(
            "/api/rankings/{kind}",
            get(get_ranking).post(append_entry).delete(clear_ranking),
        )
        .route("/api/rankings/{kind}/replace", post(replace_ranking))
        .route("/api/rankings/{kind}/export", get(export_ranking))
        // Observability
        .route("/metrics", get(get_metrics))
        // Remote control
        .route("/ws/control", get(ws::ws_control))
        .layer(middleware::from_fn(track_requests))
        .with_state(state)
}

async fn track_requests(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let endpoint = metrics::normalize_path(req.uri().path());
    let started = Instant::now();

    let response = next.run(req).await;

    metrics::API_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), endpoint.as_str(), response.status().as_str()])
        .inc();
    metrics::API_REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint.as_str()])
        .observe(started.elapsed().as_secs_f64());
    response
}

// ── Status ────────────────────────────────────────────────────────────

async fn status() -> impl IntoResponse {
    Json(json!({
        "status": "online",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

// ── Ranking handlers ──────────────────────────────────────────────────

async fn get_all_rankings(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.document().await)
}

/// Unknown types answer with an empty list rather than an error.
async fn get_ranking(State(state): State<AppState>, Path(kind): Path<String>) -> impl IntoResponse {
    match RankingKind::from_slug(&kind) {
        Some(kind) => Json(json!(state.store.list(kind).await)),
        None => {
            tracing::debug!("GET for unknown ranking type {kind:?}, returning empty list");
            Json(json!([]))
        }
    }
}

async fn append_entry(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    body: Result<Json<AppendRequest>, JsonRejection>,
) -> impl IntoResponse {
    let kind = match parse_kind(&kind) {
        Ok(k) => k,
        Err(resp) => return resp,
    };
    let req = match parse_body(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let Some(raw_entry) = req.entry else {
        return json_error(StatusCode::BAD_REQUEST, "entry is required").into_response();
    };
    let entry = match kind.parse_entry(raw_entry) {
        Ok(e) => e,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, &e.to_string()).into_response(),
    };

    match state.store.append(kind, entry).await {
        Ok(ranking) => {
            tracing::info!("Appended entry to {kind} ranking ({} entries)", ranking.len());
            (
                StatusCode::OK,
                Json(json!({ "success": true, "ranking": ranking })),
            )
                .into_response()
        }
        Err(e) => internal_error(e).into_response(),
    }
}

async fn replace_ranking(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    body: Result<Json<ReplaceRequest>, JsonRejection>,
) -> impl IntoResponse {
    let kind = match parse_kind(&kind) {
        Ok(k) => k,
        Err(resp) => return resp,
    };
    let req = match parse_body(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let Some(Value::Array(items)) = req.ranking else {
        return json_error(StatusCode::BAD_REQUEST, "ranking must be an array").into_response();
    };

    let mut entries: Vec<RankingEntry> = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match kind.parse_entry(item) {
            Ok(e) => entries.push(e),
            Err(e) => {
                let msg = format!("invalid entry at position {i}: {e}");
                return json_error(StatusCode::BAD_REQUEST, &msg).into_response();
            }
        }
    }

    match state.store.replace(kind, entries).await {
        Ok(ranking) => (
            StatusCode::OK,
            Json(json!({ "success": true, "ranking": ranking })),
        )
            .into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

async fn clear_ranking(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> impl IntoResponse {
    let kind = match parse_kind(&kind) {
        Ok(k) => k,
        Err(resp) => return resp,
    };
    match state.store.clear(kind).await {
        Ok(()) => {
            tracing::info!("Cleared {kind} ranking");
            (StatusCode::OK, Json(json!({ "success": true }))).into_response()
        }
        Err(e) => internal_error(e).into_response(),
    }
}

async fn export_ranking(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> impl IntoResponse {
    let kind = match parse_kind(&kind) {
        Ok(k) => k,
        Err(resp) => return resp,
    };
    let entries = state.store.list(kind).await;
    let body = report::render(kind, &entries, Local::now());
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

// ── Metrics ───────────────────────────────────────────────────────────

async fn get_metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
        .into_response()
}
