use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use uuid::Uuid;

use backend_application::commands::promo_code_commands;
use backend_application::queries::promo_code_queries;
use backend_application::AppState;
use backend_domain::{
    CreatePromoCodeRequest, PromoCode, PromoCodeToggleRequest, PromoCodeValidation,
    ValidatePromoCodeRequest,
};

use crate::error::HttpError;
use crate::middleware::require_principal;

pub async fn create_promo_code(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(event_id): Path<Uuid>,
    Json(request): Json<CreatePromoCodeRequest>,
) -> Result<Json<PromoCode>, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    let promo =
        promo_code_commands::create_promo_code(&state, &principal, event_id, request).await?;
    Ok(Json(promo))
}

pub async fn list_promo_codes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<PromoCode>>, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    Ok(Json(
        promo_code_queries::list_promo_codes(&state, &principal, event_id).await?,
    ))
}

pub async fn toggle_promo_code(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(promo_id): Path<Uuid>,
    Json(request): Json<PromoCodeToggleRequest>,
) -> Result<Json<PromoCode>, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    let promo =
        promo_code_commands::set_promo_code_active(&state, &principal, promo_id, request.active)
            .await?;
    Ok(Json(promo))
}

pub async fn validate_promo_code(
    State(state): State<AppState>,
    Json(request): Json<ValidatePromoCodeRequest>,
) -> Result<Json<PromoCodeValidation>, HttpError> {
    Ok(Json(
        promo_code_queries::validate_promo_code(&state, request).await?,
    ))
}
