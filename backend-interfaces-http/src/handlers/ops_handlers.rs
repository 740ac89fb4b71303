use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use tokio::time::{timeout, Duration};
use tracing::{error, warn};

use backend_application::AppState;

use crate::error::HttpError;
use crate::middleware::require_principal;

#[derive(Debug, Serialize)]
pub struct ReadyStatus {
    pub database: &'static str,
    pub analytics: &'static str,
}

pub async fn health_live() -> StatusCode {
    StatusCode::OK
}

pub async fn health_ready(State(state): State<AppState>) -> impl IntoResponse {
    let timeout_secs = state.config.request_timeout_seconds.max(1);
    let timeout_duration = Duration::from_secs(timeout_secs);
    let database = match timeout(timeout_duration, state.health_service.check_database()).await {
        Ok(Ok(true)) => "ok",
        Ok(Ok(false)) => "error",
        Ok(Err(err)) => {
            error!("ready check failed: {}", err);
            "error"
        }
        Err(_) => {
            error!("ready check timeout after {}s", timeout_secs);
            "timeout"
        }
    };
    // the analytics mirror is optional and never fails readiness
    let analytics = match timeout(timeout_duration, state.health_service.check_analytics()).await {
        Ok(Ok(_)) => "ok",
        Ok(Err(err)) => {
            warn!("analytics check failed: {}", err);
            "error"
        }
        Err(_) => "timeout",
    };
    let status = if database == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(ReadyStatus { database, analytics }))
}

pub async fn metrics_prometheus(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    principal.require_admin()?;
    let payload = state.metrics.render_prometheus();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    Ok((headers, payload))
}
