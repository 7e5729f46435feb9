//! Shared test harness for integration tests.
//!
//! Provides [`MockStash`], a minimal in-process Stash lookalike answering
//! GraphQL queries and image requests, and [`TestHarness`], which starts the
//! full Axum app on a random port wired to one or more mock stashes.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde_json::{json, Value};

use stashbridge::config::{Config, StashConfig};
use stashbridge::server::{create_router, AppContext};

// ---------------------------------------------------------------------------
// Mock Stash backend
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct MockState {
    scenes: Arc<RwLock<Vec<Value>>>,
    search_calls: Arc<AtomicUsize>,
    scene_calls: Arc<AtomicUsize>,
    image_calls: Arc<AtomicUsize>,
    last_api_key: Arc<RwLock<Option<String>>>,
}

/// An in-process stand-in for a Stash server.
pub struct MockStash {
    pub addr: SocketAddr,
    state: MockState,
}

impl MockStash {
    /// Bind a mock Stash on a random port. Scenes start empty; install them
    /// with [`set_scenes`](Self::set_scenes) once the address is known.
    pub async fn start() -> Self {
        let state = MockState {
            scenes: Arc::new(RwLock::new(Vec::new())),
            search_calls: Arc::new(AtomicUsize::new(0)),
            scene_calls: Arc::new(AtomicUsize::new(0)),
            image_calls: Arc::new(AtomicUsize::new(0)),
            last_api_key: Arc::new(RwLock::new(None)),
        };

        let app = Router::new()
            .route("/graphql", post(graphql))
            .route("/scene/:id/screenshot", get(screenshot))
            .route("/scene/:id/preview", get(preview))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { addr, state }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_scenes(&self, scenes: Vec<Value>) {
        *self.state.scenes.write() = scenes;
    }

    /// A full scene record as Stash would return it, with image paths on this
    /// mock's own origin.
    pub fn scene(&self, id: &str, title: &str, date: Option<&str>) -> Value {
        json!({
            "id": id,
            "title": title,
            "details": format!("Details for {title}"),
            "date": date,
            "rating100": 80,
            "organized": true,
            "studio": { "id": "1", "name": "Test Studio", "image_path": null },
            "tags": [{ "id": "1", "name": "Action" }],
            "performers": [{ "id": "1", "name": "Pat Example", "image_path": null }],
            "paths": {
                "screenshot": format!("{}/scene/{id}/screenshot", self.endpoint()),
                "preview": format!("{}/scene/{id}/preview", self.endpoint()),
                "stream": null,
            },
            "created_at": "2023-01-02T03:04:05Z",
            "updated_at": "2023-02-02T03:04:05Z",
        })
    }

    pub fn search_calls(&self) -> usize {
        self.state.search_calls.load(Ordering::SeqCst)
    }

    pub fn scene_calls(&self) -> usize {
        self.state.scene_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.state.image_calls.load(Ordering::SeqCst)
    }

    pub fn last_api_key(&self) -> Option<String> {
        self.state.last_api_key.read().clone()
    }
}

async fn graphql(
    State(state): State<MockState>,
    headers: axum::http::HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    *state.last_api_key.write() = headers
        .get("ApiKey")
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let query = body["query"].as_str().unwrap_or_default();

    if query.contains("findScenes") {
        state.search_calls.fetch_add(1, Ordering::SeqCst);
        let scenes = state.scenes.read().clone();
        return Json(json!({
            "data": { "findScenes": { "count": scenes.len(), "scenes": scenes } }
        }));
    }

    if query.contains("findScene") {
        state.scene_calls.fetch_add(1, Ordering::SeqCst);
        let id = body["variables"]["id"].as_str().unwrap_or_default();
        let scene = state
            .scenes
            .read()
            .iter()
            .find(|s| s["id"] == id)
            .cloned();
        return Json(json!({ "data": { "findScene": scene } }));
    }

    if query.contains("systemStatus") {
        return Json(json!({
            "data": { "systemStatus": { "appSchema": 68, "status": "OK", "databasePath": "" } }
        }));
    }

    Json(json!({ "errors": [{ "message": "unknown query" }] }))
}

async fn screenshot(State(state): State<MockState>, Path(_id): Path<String>) -> impl IntoResponse {
    state.image_calls.fetch_add(1, Ordering::SeqCst);
    ([(header::CONTENT_TYPE, "image/jpeg")], b"jpegbytes".to_vec())
}

async fn preview(State(state): State<MockState>, Path(_id): Path<String>) -> impl IntoResponse {
    state.image_calls.fetch_add(1, Ordering::SeqCst);
    ([(header::CONTENT_TYPE, "image/webp")], b"webpbytes".to_vec())
}

// ---------------------------------------------------------------------------
// App harness
// ---------------------------------------------------------------------------

/// Test harness wrapping a fully-constructed [`AppContext`] served on a
/// random port.
pub struct TestHarness {
    pub ctx: AppContext,
    pub addr: SocketAddr,
}

impl TestHarness {
    /// Start the app configured with the given stashes.
    pub async fn with_stashes(stashes: Vec<StashConfig>) -> Self {
        let config = Config {
            stashes,
            ..Config::default()
        };
        let ctx = AppContext::from_config(&config);
        let app = create_router(ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { ctx, addr }
    }

    /// Start the app with a single enabled stash pointing at a mock backend.
    pub async fn with_mock(mock: &MockStash) -> Self {
        Self::with_stashes(vec![stash("home", &mock.endpoint(), true, 0)]).await
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

/// Build a stash config pointing at an arbitrary endpoint.
pub fn stash(id: &str, endpoint: &str, enabled: bool, priority: i32) -> StashConfig {
    StashConfig {
        id: id.to_string(),
        name: format!("{id} stash"),
        endpoint: endpoint.to_string(),
        api_key: String::new(),
        enabled,
        priority,
        ..StashConfig::default()
    }
}
