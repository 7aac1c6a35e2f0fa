//! HTTP surface: `POST /create-podcast` and a health check.
//!
//! Handlers are thin. They parse the body, call
//! [`PodcastPipeline::run`] and map its error to a status code:
//!
//! | Failure | Status |
//! |---------|--------|
//! | invalid locator | 400 |
//! | malformed body | axum's 4xx rejection |
//! | download or LLM timeout | 504 |
//! | anything else | 500 |
//!
//! Error bodies are `{"detail": "..."}`.

use crate::error::PipelineError;
use crate::model::PodcastOutput;
use crate::podcast::PodcastPipeline;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PodcastPipeline>,
}

impl AppState {
    pub fn new(pipeline: PodcastPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Body of a podcast request.
#[derive(Debug, Deserialize)]
pub struct CreatePodcastRequest {
    pub url: String,
}

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/create-podcast", post(create_podcast_handler))
        .route("/create-podcast/", post(create_podcast_handler))
        .route("/create_podcast", post(create_podcast_handler))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn create_podcast_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<CreatePodcastRequest>,
) -> Result<Json<PodcastOutput>, AppError> {
    info!("Received podcast request for: {}", payload.url);
    let output = app_state.pipeline.run(&payload.url).await?;
    Ok(Json(output))
}

/// A failed request, rendered as `{"detail": ...}`.
#[derive(Debug)]
pub struct AppError(PipelineError);

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError(err)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else if self.0.cause.is_timeout() {
            StatusCode::GATEWAY_TIMEOUT
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Podcast request failed: {:?}", self.0);
        } else {
            info!("Rejected podcast request: {}", self.0);
        }
        let detail = if self.0.is_client_error() {
            self.0.cause.to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
