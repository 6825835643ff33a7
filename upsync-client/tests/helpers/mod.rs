//! Shared fixtures for upsync-client integration tests
//!
//! Spins up an axum mock of the three remote endpoints on `127.0.0.1:0` and
//! wires the real reqwest gateway against it.

#![allow(dead_code)]

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use upsync_client::{
    BinaryPayload, DataSyncScheduler, ItemStore, ReqwestGateway, SubmissionOrchestrator,
    UploadCandidate,
};
use upsync_common::config::{EndpointConfig, GatewayConfig, SubmissionConfig, SyncConfig};
use upsync_common::events::EventBus;

/// One multipart `file` field as the mock received it
#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    pub upload_id: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
}

#[derive(Clone, Default)]
pub struct MockState {
    pub data_hits: Arc<AtomicUsize>,
    pub create_bodies: Arc<Mutex<Vec<Value>>>,
    pub uploads: Arc<Mutex<Vec<ReceivedUpload>>>,
}

pub struct MockServer {
    pub base_url: String,
    pub state: MockState,
}

impl MockServer {
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new()
            .route("/data-correct", get(data_correct))
            .route("/data-incorrect", get(data_incorrect))
            .route("/data-empty", get(data_empty))
            .route("/data-error", get(data_error))
            .route("/submit-correct", post(submit_correct))
            .route("/submit-invalid-payload", post(submit_invalid_payload))
            .route("/submit-no-upload-id", post(submit_no_upload_id))
            .route("/upload-correct/:id", post(upload_correct))
            .route("/upload-rejected/:id", post(upload_rejected))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn data_hits(&self) -> usize {
        self.state.data_hits.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.state.uploads.lock().unwrap().clone()
    }

    pub fn create_bodies(&self) -> Vec<Value> {
        self.state.create_bodies.lock().unwrap().clone()
    }
}

/// URL of a port nothing listens on
pub fn unreachable_url(path: &str) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}{}", addr, path)
}

async fn data_correct(State(state): State<MockState>) -> Json<Value> {
    state.data_hits.fetch_add(1, Ordering::SeqCst);
    Json(json!([
        { "name": "Kubula", "height": 46, "file": "soubor.jpg" },
        { "name": "Alice", "height": 170, "file": "alice.png" },
    ]))
}

async fn data_incorrect(State(state): State<MockState>) -> Json<Value> {
    state.data_hits.fetch_add(1, Ordering::SeqCst);
    Json(json!([{ "naaame": "Kubula", "height": 46, "file": "soubor.jpg" }]))
}

async fn data_empty(State(state): State<MockState>) -> Json<Value> {
    state.data_hits.fetch_add(1, Ordering::SeqCst);
    Json(json!([]))
}

async fn data_error(State(state): State<MockState>) -> (StatusCode, Json<Value>) {
    state.data_hits.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Internal error" })),
    )
}

async fn submit_correct(State(state): State<MockState>, Json(body): Json<Value>) -> Json<Value> {
    state.create_bodies.lock().unwrap().push(body);
    Json(json!({ "uploadId": "X" }))
}

async fn submit_invalid_payload(
    State(state): State<MockState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.create_bodies.lock().unwrap().push(body);
    (
        StatusCode::MOVED_PERMANENTLY,
        Json(json!({
            "statusCode": 400,
            "error": "Bad Request",
            "message": "Invalid request payload input"
        })),
    )
}

async fn submit_no_upload_id(State(state): State<MockState>, Json(body): Json<Value>) -> Json<Value> {
    state.create_bodies.lock().unwrap().push(body);
    Json(json!({}))
}

async fn upload_correct(
    State(state): State<MockState>,
    Path(upload_id): Path<String>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let size = field.bytes().await.map(|b| b.len()).unwrap_or(0);
        state.uploads.lock().unwrap().push(ReceivedUpload {
            upload_id,
            file_name,
            content_type,
            size,
        });
        return (StatusCode::OK, Json(json!({ "result": true })));
    }
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": "Missing file field" })),
    )
}

async fn upload_rejected(Path(_upload_id): Path<String>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": "File type not allowed" })),
    )
}

/// Store, scheduler and orchestrator wired to the real gateway
pub struct TestClient {
    pub store: Arc<ItemStore>,
    pub scheduler: Arc<DataSyncScheduler>,
    pub orchestrator: SubmissionOrchestrator,
    pub event_bus: EventBus,
}

pub struct TestClientOptions {
    pub auto_sync: bool,
    pub interval_ms: u64,
    pub append_on_success: bool,
    pub validation_enabled: bool,
    pub timeout_ms: Option<u64>,
}

impl Default for TestClientOptions {
    fn default() -> Self {
        Self {
            auto_sync: false,
            interval_ms: 60_000,
            append_on_success: true,
            validation_enabled: true,
            timeout_ms: Some(5_000),
        }
    }
}

pub fn endpoints(data: String, submit: String, upload: String) -> EndpointConfig {
    EndpointConfig {
        data,
        submit,
        upload,
    }
}

pub fn test_client(endpoints: EndpointConfig, options: TestClientOptions) -> TestClient {
    let event_bus = EventBus::new(1000);
    let gateway = Arc::new(
        ReqwestGateway::new(&GatewayConfig {
            timeout_ms: options.timeout_ms,
        })
        .unwrap(),
    );
    let store = Arc::new(ItemStore::new(event_bus.clone()));
    let scheduler = Arc::new(DataSyncScheduler::new(
        &endpoints,
        SyncConfig {
            auto_sync: options.auto_sync,
            interval_ms: options.interval_ms,
        },
        gateway.clone(),
        store.clone(),
        event_bus.clone(),
    ));
    let orchestrator = SubmissionOrchestrator::new(
        &endpoints,
        &SubmissionConfig {
            append_on_success: options.append_on_success,
            validation_enabled: options.validation_enabled,
        },
        gateway,
        store.clone(),
        scheduler.clone(),
        event_bus.clone(),
    );

    TestClient {
        store,
        scheduler,
        orchestrator,
        event_bus,
    }
}

/// Valid candidate with a small PNG-looking payload
pub fn peter() -> UploadCandidate {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend(std::iter::repeat(7u8).take(200 * 1024));
    UploadCandidate::new(
        "Peter",
        "157",
        BinaryPayload::new("avatar.png", "image/png", bytes),
    )
}

/// Poll `check` until it holds or `limit` elapses
pub async fn wait_until(limit: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
