use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod auth;

use crate::pipeline::{ExtractRequest, ExtractResponse, ExtractionPipeline};
use crate::ExtractorError;
use auth::{Auth, AuthDecision};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<ExtractionPipeline>,
    auth: Auth,
}

impl AppState {
    pub fn new(pipeline: ExtractionPipeline, api_key: Option<String>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            auth: Auth::new(api_key),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/extract", post(extract))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let ytdlp_version = match state.pipeline.tool_version().await {
        Ok(version) if !version.is_empty() => version,
        Ok(_) => "unknown".to_string(),
        Err(err) => {
            tracing::warn!("yt-dlp version check failed: {:#}", err);
            "unknown".to_string()
        }
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        ytdlp_version,
        timestamp: Utc::now(),
    })
}

async fn extract(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractResponse>, ApiError> {
    match state.auth.check(&headers) {
        AuthDecision::Allowed => {}
        AuthDecision::Denied => return Err(ApiError::Unauthorized),
        AuthDecision::NotConfigured => return Err(ApiError::AuthNotConfigured),
    }

    let Json(request) = body.map_err(|rejection| ApiError::Invalid(rejection.body_text()))?;

    let response = state.pipeline.run(&request).await?;
    Ok(Json(response))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub ytdlp_version: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid API key")]
    Unauthorized,
    #[error("API_KEY not configured")]
    AuthNotConfigured,
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::AuthNotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(err) => match err.downcast_ref::<ExtractorError>() {
                Some(ExtractorError::InvalidRequest(_)) => StatusCode::UNPROCESSABLE_ENTITY,
                Some(ExtractorError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {:#}", self);
        }

        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
