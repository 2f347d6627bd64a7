//! HTTP control surface: REST mutations, status/log reads, the artifact
//! endpoint, and the SSE event stream.
//!
//! Handlers validate inputs at this boundary and hand the core pre-validated
//! primitives; malformed payloads are rejected with a 400 and leave core
//! state untouched.

use crate::hub::Hub;
use crate::models::Event;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::sse::{Event as SseEvent, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use futures::stream::{self, Stream, StreamExt};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub hub: Hub,
    pub artifact_path: PathBuf,
    pub keepalive_secs: u64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/logs", get(get_logs))
        .route("/adjustment", post(set_adjustment))
        .route("/filters", post(set_filters))
        .route("/refresh", post(set_refresh))
        .route("/stream", get(stream_events))
        .route("/auction_items.json", get(serve_artifact))
        // External dashboards consume the surface cross-origin.
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Control surface listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Rejection for malformed control input. Core state is unchanged when one of
/// these is returned.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("invalid adjustment amount: {0:?}")]
    InvalidAmount(String),
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "error", "error": self.to_string() })),
        )
            .into_response()
    }
}

// ── Read endpoints ────────────────────────────────────────────────────────────

async fn get_status(State(app): State<AppState>) -> impl IntoResponse {
    Json(app.hub.read_status())
}

async fn get_logs(State(app): State<AppState>) -> impl IntoResponse {
    Json(app.hub.read_logs())
}

async fn serve_artifact(State(app): State<AppState>) -> Response {
    match tokio::fs::read(&app.artifact_path).await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, "application/json")],
            bytes,
        )
            .into_response(),
        Err(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "auction_items.json not found" })),
        )
            .into_response(),
    }
}

// ── Mutating endpoints ────────────────────────────────────────────────────────

async fn set_adjustment(
    State(app): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ControlError> {
    let amount = parse_amount(&payload)?;
    app.hub.set_adjustment(amount);
    Ok(Json(json!({ "status": "ok", "manual_adjustment": amount })))
}

async fn set_filters(
    State(app): State<AppState>,
    Json(payload): Json<Value>,
) -> Json<Value> {
    let terms = parse_keywords(&payload);
    app.hub.set_filters(terms.clone());
    Json(json!({ "status": "ok", "filters": terms }))
}

async fn set_refresh(
    State(app): State<AppState>,
    Json(payload): Json<Value>,
) -> Json<Value> {
    let requested = payload
        .get("state")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_lowercase();

    let mut triggered = false;
    match requested.as_str() {
        "pause" => app.hub.pause(),
        "resume" => app.hub.resume(),
        "now" => {
            app.hub.trigger_now();
            triggered = true;
        }
        // Unrecognized states are a no-op, not an error.
        _ => {}
    }

    Json(json!({
        "status": "ok",
        "refresh_paused": app.hub.read_status().refresh_paused,
        "refresh_triggered": triggered,
    }))
}

// ── Event stream ──────────────────────────────────────────────────────────────

async fn stream_events(
    State(app): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, axum::Error>>> {
    // Register before snapshotting so nothing published in between is missed;
    // duplicates are acceptable, gaps are not.
    let subscriber = app.hub.subscribe();
    let snapshot = app.hub.read_status();
    let logs = app.hub.read_logs();
    let keepalive = Duration::from_secs(app.keepalive_secs);

    let mut head = vec![SseEvent::default().event("status").json_data(&snapshot)];
    if !logs.is_empty() {
        head.push(SseEvent::default().event("logs").json_data(&logs));
    }

    let live = stream::unfold(subscriber, move |mut subscriber| async move {
        match tokio::time::timeout(keepalive, subscriber.recv()).await {
            Ok(Some(event)) => Some((frame(event), subscriber)),
            // Bus gone; end the stream.
            Ok(None) => None,
            // Idle: synthetic keep-alive ping.
            Err(_) => Some((Ok(SseEvent::default().event("ping").data("{}")), subscriber)),
        }
    });

    Sse::new(stream::iter(head).chain(live))
}

fn frame(event: Event) -> Result<SseEvent, axum::Error> {
    let sse = SseEvent::default().event(event.kind());
    match event {
        Event::Status(snapshot) => sse.json_data(&snapshot),
        Event::Log(entry) => sse.json_data(&entry),
        Event::Ping => Ok(sse.data("{}")),
    }
}

// ── Payload parsing ───────────────────────────────────────────────────────────

/// `amount` may arrive as a JSON number or a numeric string (the form posts
/// strings). A missing amount means zero; a non-numeric one is rejected.
fn parse_amount(payload: &Value) -> Result<f64, ControlError> {
    let amount = match payload.get("amount") {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ControlError::InvalidAmount(n.to_string()))?,
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| ControlError::InvalidAmount(s.clone()))?,
        Some(other) => return Err(ControlError::InvalidAmount(other.to_string())),
    };
    if !amount.is_finite() {
        return Err(ControlError::InvalidAmount(amount.to_string()));
    }
    Ok(amount)
}

/// `keywords` may be a comma-separated string, an array of values, or a bare
/// scalar. Terms are trimmed; empty ones are dropped. Anything unusable
/// yields an empty set, which clears the filters.
fn parse_keywords(payload: &Value) -> Vec<String> {
    let raw = match payload.get("keywords") {
        None | Some(Value::Null) => return Vec::new(),
        Some(v) => v,
    };

    let stringify = |v: &Value| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    match raw {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(values) => values
            .iter()
            .map(|v| stringify(v).trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        other => {
            let term = stringify(other).trim().to_string();
            if term.is_empty() { Vec::new() } else { vec![term] }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, BodyDataStream};
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_app(keepalive_secs: u64) -> AppState {
        AppState {
            hub: Hub::new(10),
            artifact_path: PathBuf::from("does-not-exist.json"),
            keepalive_secs,
        }
    }

    async fn next_frame(body: &mut BodyDataStream) -> String {
        let bytes = body
            .next()
            .await
            .expect("stream ended early")
            .expect("body read failed");
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_parse_amount_variants() {
        assert_eq!(parse_amount(&json!({ "amount": 12.5 })).unwrap(), 12.5);
        assert_eq!(parse_amount(&json!({ "amount": "12.5" })).unwrap(), 12.5);
        assert_eq!(parse_amount(&json!({ "amount": "-3" })).unwrap(), -3.0);
        assert_eq!(parse_amount(&json!({})).unwrap(), 0.0);
        assert!(parse_amount(&json!({ "amount": "plenty" })).is_err());
        assert!(parse_amount(&json!({ "amount": [1, 2] })).is_err());
    }

    #[test]
    fn test_parse_keywords_variants() {
        assert_eq!(
            parse_keywords(&json!({ "keywords": " raffle, ticket ,," })),
            vec!["raffle", "ticket"]
        );
        assert_eq!(
            parse_keywords(&json!({ "keywords": ["raffle", " ticket ", ""] })),
            vec!["raffle", "ticket"]
        );
        assert_eq!(parse_keywords(&json!({ "keywords": 50 })), vec!["50"]);
        assert!(parse_keywords(&json!({})).is_empty());
        assert!(parse_keywords(&json!({ "keywords": "" })).is_empty());
    }

    #[tokio::test]
    async fn test_invalid_adjustment_leaves_state_unchanged() {
        let app = test_app(15);
        app.hub.set_adjustment(1.0);

        let result = set_adjustment(
            State(app.clone()),
            Json(json!({ "amount": "not a number" })),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(app.hub.read_status().manual_adjustment, 1.0);
    }

    #[tokio::test]
    async fn test_refresh_endpoint_round_trip() {
        let app = test_app(15);

        let Json(body) =
            set_refresh(State(app.clone()), Json(json!({ "state": "pause" }))).await;
        assert_eq!(body["refresh_paused"], json!(true));

        let Json(body) =
            set_refresh(State(app.clone()), Json(json!({ "state": "resume" }))).await;
        assert_eq!(body["refresh_paused"], json!(false));

        let Json(body) = set_refresh(State(app.clone()), Json(json!({ "state": "now" }))).await;
        assert_eq!(body["refresh_triggered"], json!(true));

        // Unknown state is a no-op, not an error.
        let Json(body) =
            set_refresh(State(app.clone()), Json(json!({ "state": "sideways" }))).await;
        assert_eq!(body["refresh_triggered"], json!(false));
    }

    #[tokio::test]
    async fn test_stream_opens_with_snapshot_and_log_dump_then_goes_live() {
        let app = test_app(1);
        app.hub.log("⏳ Starting auction inventory watch service...");

        let response = router(app.clone())
            .oneshot(Request::get("/stream").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(app.hub.subscriber_count(), 1);

        let mut body = response.into_body().into_data_stream();

        let frame = next_frame(&mut body).await;
        assert!(frame.starts_with("event: status"), "got {frame:?}");
        assert!(frame.contains("\"refresh_interval\":10"));

        let frame = next_frame(&mut body).await;
        assert!(frame.starts_with("event: logs"), "got {frame:?}");
        assert!(frame.contains("Starting auction inventory watch service"));

        app.hub.set_adjustment(2.5);
        let frame = next_frame(&mut body).await;
        assert!(frame.starts_with("event: log\n"), "got {frame:?}");
        assert!(frame.contains("Manual adjustment set to +2.50"));
        let frame = next_frame(&mut body).await;
        assert!(frame.starts_with("event: status"), "got {frame:?}");

        // Nothing published within the keep-alive window yields a synthetic
        // ping rather than a silent gap.
        let frame = next_frame(&mut body).await;
        assert!(frame.starts_with("event: ping"), "got {frame:?}");

        drop(body);
        assert_eq!(app.hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_log_ring_skips_the_dump_frame() {
        let app = test_app(1);

        let response = router(app.clone())
            .oneshot(Request::get("/stream").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let mut body = response.into_body().into_data_stream();

        let frame = next_frame(&mut body).await;
        assert!(frame.starts_with("event: status"), "got {frame:?}");

        // No logs yet, so the next frame is the idle ping, not a log dump.
        let frame = next_frame(&mut body).await;
        assert!(frame.starts_with("event: ping"), "got {frame:?}");
    }

    #[tokio::test]
    async fn test_cors_allows_cross_origin_reads() {
        let app = test_app(15);

        let response = router(app)
            .oneshot(
                Request::get("/status")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
