use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use chess_sight_core::{AnalysisRequest, AnalysisResult, Error, Health};

use crate::AppState;

/// Failures as HTTP responses with a `{"detail": ...}` body
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let status = match &error {
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::EngineBusy => StatusCode::TOO_MANY_REQUESTS,
            Error::EngineUnavailable | Error::Handshake { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::Communication(_) => StatusCode::BAD_GATEWAY,
        };

        let detail = if error.is_unavailable() {
            "Chess engine not available. Please check server logs.".to_string()
        } else {
            error.to_string()
        };

        ApiError { status, detail }
    }
}

// Body extraction failures keep axum's status (400/415/422) but use our body shape
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "running",
        "service": "ChessSight Engine API",
        "version": env!("CARGO_PKG_VERSION"),
        "engine": {
            "name": "stockfish",
            "loaded": state.engine.health().ready,
        }
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(state.engine.health())
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let Json(request) = payload?;

    // Run detached so a client disconnect cannot cut a session short
    let engine = state.engine.clone();
    let session = tokio::spawn(async move { engine.analyze(&request).await });

    match session.await {
        Ok(Ok(result)) => Ok(Json(result)),
        Ok(Err(e)) => {
            tracing::error!("analysis request failed: {}", e);
            Err(e.into())
        }
        Err(e) => {
            tracing::error!("analysis task failed: {}", e);
            Err(Error::EngineUnavailable.into())
        }
    }
}

pub async fn restart_engine(State(state): State<Arc<AppState>>) -> Result<Json<Health>, ApiError> {
    state.engine.restart().await?;
    Ok(Json(state.engine.health()))
}
