//! HTTP API over the content store.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | API name, version and description |
//! | `GET`  | `/health` | Health check |
//! | `GET`  | `/api/content/{source}?date=YYYY-MM-DD` | Stored documents, with latest-date fallback |
//! | `GET`  | `/api/weather` | Current temperature and icon code |
//! | `POST` | `/api/chat` | LLM answer about a supplied Markdown document |
//!
//! # Error Contract
//!
//! Every error response has the body `{"detail": "<message>"}`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the dashboard can be
//! served from anywhere.

mod chat;
mod content;
mod weather;

use crate::config::WeatherConfig;
use crate::llm::LlmClient;
use crate::query::QueryFacade;
use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::error::Error;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub const API_NAME: &str = "Nook API";
pub const API_DESCRIPTION: &str = "Personal information hub API";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub query: Arc<QueryFacade>,
    /// `None` when no LLM key is configured; chat then answers with a notice.
    pub llm: Option<Arc<LlmClient>>,
    pub weather: Arc<WeatherConfig>,
    pub weather_api_key: Option<String>,
    /// Client for upstream calls (weather).
    pub http: reqwest::Client,
}

/// Build the router with all routes and CORS.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/api/content/{source}", get(content::handle_content))
        .route("/api/weather", get(weather::handle_weather))
        .route("/api/chat", post(chat::handle_chat))
        .layer(cors)
        .with_state(state)
}

/// Bind `bind` and serve until the process is terminated.
pub async fn run_server(state: AppState, bind: &str) -> Result<(), Box<dyn Error>> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(%bind, "API server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

/// Error that renders as `{"detail": ...}` with a status code.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    detail: String,
}

impl AppError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

// ============ GET / and /health ============

#[derive(Serialize)]
struct RootResponse {
    name: &'static str,
    version: &'static str,
    description: &'static str,
}

async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        name: API_NAME,
        version: env!("CARGO_PKG_VERSION"),
        description: API_DESCRIPTION,
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::store::ContentStore;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    pub fn state(store: ContentStore) -> AppState {
        AppState {
            query: Arc::new(QueryFacade::new(store)),
            llm: None,
            weather: Arc::new(WeatherConfig::default()),
            weather_api_key: None,
            http: reqwest::Client::new(),
        }
    }

    /// Send one request through the router; returns status and JSON body.
    pub async fn send(state: AppState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }
}
