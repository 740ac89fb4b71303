use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use uuid::Uuid;

use backend_application::commands::admin_commands;
use backend_application::queries::admin_queries::{self, PlatformOverview};
use backend_application::AppState;
use backend_domain::{
    OrganizerEarnings, RoleUpdateRequest, SuspiciousActivity, SuspiciousActivityQuery, Ticket,
    VerificationUpdateRequest,
};

use crate::error::HttpError;
use crate::middleware::require_principal;

pub async fn overview(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PlatformOverview>, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    Ok(Json(admin_queries::platform_overview(&state, &principal).await?))
}

pub async fn refund_ticket(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<Ticket>, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    Ok(Json(
        admin_commands::refund_ticket(&state, &principal, ticket_id).await?,
    ))
}

pub async fn update_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Json(request): Json<RoleUpdateRequest>,
) -> Result<StatusCode, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    admin_commands::update_user_role(&state, &principal, user_id, request.role).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_verification(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Json(request): Json<VerificationUpdateRequest>,
) -> Result<StatusCode, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    admin_commands::set_user_verification(&state, &principal, user_id, request.verified).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_suspicious(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SuspiciousActivityQuery>,
) -> Result<Json<Vec<SuspiciousActivity>>, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    Ok(Json(
        admin_queries::list_suspicious(&state, &principal, query).await?,
    ))
}

pub async fn review_suspicious(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(activity_id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    admin_commands::review_suspicious_activity(&state, &principal, activity_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reconcile_earnings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(organizer_id): Path<Uuid>,
) -> Result<Json<Vec<OrganizerEarnings>>, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    Ok(Json(
        admin_commands::reconcile_earnings(&state, &principal, organizer_id).await?,
    ))
}
