use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use backend_application::commands::event_commands;
use backend_application::queries::event_queries::{self, EventListing};
use backend_application::queries::financial_queries::{self, EventFinancials};
use backend_application::AppState;
use backend_domain::{
    CheckInRequest, CheckInResult, CreateEventRequest, CreateTierRequest, Event,
    EventSearchQuery, ExportKind, TicketTier,
};

use crate::error::HttpError;
use crate::middleware::require_principal;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub kind: Option<String>,
}

pub async fn search_events(
    State(state): State<AppState>,
    Query(query): Query<EventSearchQuery>,
) -> Result<Json<Vec<Event>>, HttpError> {
    Ok(Json(event_queries::search_events(&state, query).await?))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventListing>, HttpError> {
    Ok(Json(event_queries::published_event(&state, event_id).await?))
}

pub async fn create_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateEventRequest>,
) -> Result<Json<Event>, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    Ok(Json(event_commands::create_event(&state, &principal, request).await?))
}

pub async fn add_tier(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(event_id): Path<Uuid>,
    Json(request): Json<CreateTierRequest>,
) -> Result<Json<TicketTier>, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    Ok(Json(
        event_commands::add_tier(&state, &principal, event_id, request).await?,
    ))
}

pub async fn publish_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Event>, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    Ok(Json(
        event_commands::publish_event(&state, &principal, event_id).await?,
    ))
}

pub async fn check_in(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(event_id): Path<Uuid>,
    Json(request): Json<CheckInRequest>,
) -> Result<Json<CheckInResult>, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    Ok(Json(
        event_commands::check_in(&state, &principal, event_id, request).await?,
    ))
}

pub async fn event_financials(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventFinancials>, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    Ok(Json(
        financial_queries::event_financials(&state, &principal, event_id).await?,
    ))
}

pub async fn export_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(event_id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    let kind = match query.kind.as_deref() {
        Some(raw) => raw
            .parse::<ExportKind>()
            .map_err(|err| HttpError::BadRequest(err.to_string()))?,
        None => ExportKind::Summary,
    };
    let export = financial_queries::export_event(&state, &principal, event_id, kind).await?;
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.filename),
            ),
        ],
        export.body,
    ))
}
