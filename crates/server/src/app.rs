//! HTTP test server router
//!
//! Endpoints: `POST /create` stores an echo definition, `/echo/{id}`
//! replays it under any method, `/static/` serves files, `/ping` is the
//! startup health check and `/shutdown` triggers graceful shutdown.
//! Everything is CORS-permissive so pages from other origins can reach it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{Response, StatusCode},
    response::{Html, IntoResponse},
    routing::{any, get, post},
    Json, Router,
};
use pagetest_protocol::EchoDefinition;
use tokio::sync::{Notify, RwLock};
use tower_http::cors::{self, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{debug, info};

// Shared state
#[derive(Clone)]
pub struct AppState {
    echoes: Arc<RwLock<HashMap<String, EchoDefinition>>>,
    next_echo_id: Arc<AtomicU64>,
    shutdown: Arc<Notify>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            echoes: Arc::new(RwLock::new(HashMap::new())),
            next_echo_id: Arc::new(AtomicU64::new(1)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Notify handle the binary awaits for `/shutdown`-initiated exits.
    pub fn shutdown_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    pub async fn echo_count(&self) -> usize {
        self.echoes.read().await.len()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

// Routes
pub fn router(state: AppState, static_dir: impl Into<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods(cors::Any)
        .allow_headers(cors::Any);

    Router::new()
        .route("/", get(index))
        .route("/ping", get(ping))
        .route("/shutdown", get(shutdown))
        .route("/create", post(create_echo))
        .route("/echo/:id", any(echo))
        .nest_service("/static", ServeDir::new(static_dir.into()))
        .layer(cors)
        .with_state(state)
}

// Handlers

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn ping() -> &'static str {
    "pong"
}

async fn shutdown(State(state): State<AppState>) -> &'static str {
    info!("shutdown requested over HTTP");
    state.shutdown.notify_one();
    "Goodbye"
}

async fn create_echo(
    State(state): State<AppState>,
    Json(definition): Json<EchoDefinition>,
) -> impl IntoResponse {
    let id = state.next_echo_id.fetch_add(1, Ordering::SeqCst).to_string();
    state.echoes.write().await.insert(id.clone(), definition);
    debug!(%id, "echo definition stored");
    (StatusCode::CREATED, Json(serde_json::json!({ "id": id })))
}

/// Replay a stored echo definition: its status (default 200), exactly its
/// headers, and its body, after the optional delay.
async fn echo(State(state): State<AppState>, Path(id): Path<String>) -> Response<Body> {
    let definition = state.echoes.read().await.get(&id).cloned();
    let Some(definition) = definition else {
        return (StatusCode::NOT_FOUND, "Echo response not found").into_response();
    };

    if let Some(delay) = definition.delay {
        if delay.is_finite() && delay > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
        }
    }

    let status = definition
        .status
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);

    let mut response = Response::builder().status(status);
    for (name, value) in &definition.headers {
        response = response.header(name, value);
    }
    match response.body(Body::from(definition.body.unwrap_or_default())) {
        Ok(response) => response,
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("invalid echo definition: {e}"),
        )
            .into_response(),
    }
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>pagetest HTTP Test Server</title>
</head>
<body>
    <h1>pagetest HTTP Test Server</h1>
    <ul>
        <li><code>/ping</code> - health check (GET)</li>
        <li><code>/create</code> - create a new echo response (POST)</li>
        <li><code>/echo/{id}</code> - replay an echo response (any method)</li>
        <li><code>/static/{path}</code> - serve static files (GET)</li>
        <li><code>/shutdown</code> - stop the server (GET)</li>
    </ul>
    <h2>Echo definition format</h2>
    <pre>
{
    "status": int,
    "headers": { "Header-Name": "Header-Value" },
    "body": str,
    "delay": float  # optional seconds
}
    </pre>
</body>
</html>
"#;
