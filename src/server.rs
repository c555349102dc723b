use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::{
    error::ServiceError,
    input::parse_body,
    model::{ModelRegistry, PredictionResponse},
};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    message: &'static str,
    success: bool,
}

pub fn build_router(registry: Arc<ModelRegistry>) -> Router {
    let state = AppState { registry };

    Router::new()
        .route("/", get(health))
        .route("/predict", post(predict))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            message: "Hi there!",
            success: true,
        }),
    )
}

// The body is taken as raw bytes so neither content type nor encoding is
// enforced by the extractor; every parse failure maps to our own 400 response.
async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PredictionResponse>, ServiceError> {
    let batch = parse_body(&body)?;
    debug!(records = batch.len(), "running prediction");

    let predictions = state.registry.predict(batch).await?;
    Ok(Json(PredictionResponse { predictions }))
}
