//! Shared helpers for transport integration tests: an in-process mock of
//! the analytics ingestion endpoint.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Json;
use chrono::{TimeZone, Utc};
use tourbook_core::event::{AnalyticsEvent, EventDefaults, EventDraft};

/// One request received by the mock backend.
#[derive(Debug, Clone)]
pub struct ReceivedBatch {
    /// Value of the `X-Device-Id` header, if present.
    pub device_id: Option<String>,
    /// Value of the `Content-Type` header, if present.
    pub content_type: Option<String>,
    /// Parsed JSON body.
    pub body: serde_json::Value,
}

/// Mock backend state: what to answer and what was received.
#[derive(Debug, Clone)]
pub struct MockBackend {
    status: StatusCode,
    delay: Duration,
    received: Arc<Mutex<Vec<ReceivedBatch>>>,
}

impl MockBackend {
    /// All requests received so far.
    pub fn received(&self) -> Vec<ReceivedBatch> {
        self.received.lock().unwrap().clone()
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

async fn ingest(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    backend.received.lock().unwrap().push(ReceivedBatch {
        device_id: header(&headers, "x-device-id"),
        content_type: header(&headers, "content-type"),
        body,
    });
    if !backend.delay.is_zero() {
        tokio::time::sleep(backend.delay).await;
    }
    backend.status
}

/// Start a mock backend answering `status` and return its base URL.
pub async fn spawn_backend(status: StatusCode) -> (String, MockBackend) {
    spawn_backend_with_delay(status, Duration::ZERO).await
}

/// Start a mock backend that waits `delay` before answering.
pub async fn spawn_backend_with_delay(status: StatusCode, delay: Duration) -> (String, MockBackend) {
    let backend = MockBackend {
        status,
        delay,
        received: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/analytics/events", post(ingest))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), backend)
}

/// A base URL nothing is listening on.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Build a normalized event with fixed identity and timestamp.
pub fn make_event(name: &str) -> AnalyticsEvent {
    EventDraft::new(name)
        .entity("tour", "42")
        .with_metadata("price_cents", 12_500)
        .normalize(&EventDefaults {
            now: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            device_id: "device-1",
            session_id: "session-1",
        })
        .unwrap()
}
