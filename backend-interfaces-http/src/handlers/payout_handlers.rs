use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use uuid::Uuid;

use backend_application::commands::payout_commands;
use backend_application::queries::{earnings_queries, payout_queries};
use backend_application::AppState;
use backend_domain::{
    DeclinePayoutRequest, EarningsBalance, FailPayoutRequest, MarkPaidRequest, Payout,
    PayoutAction, PayoutDetail, PayoutListQuery, PayoutRequest,
};

use crate::error::HttpError;
use crate::middleware::require_principal;

pub async fn request_payout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PayoutRequest>,
) -> Result<Json<Payout>, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    Ok(Json(
        payout_commands::request_payout(&state, &principal, request).await?,
    ))
}

pub async fn list_my_payouts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Payout>>, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    Ok(Json(payout_queries::list_my_payouts(&state, &principal).await?))
}

pub async fn payout_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(payout_id): Path<Uuid>,
) -> Result<Json<PayoutDetail>, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    Ok(Json(
        payout_queries::payout_detail(&state, &principal, payout_id).await?,
    ))
}

pub async fn my_earnings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<EarningsBalance>>, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    Ok(Json(earnings_queries::my_earnings(&state, &principal).await?))
}

pub async fn admin_list_payouts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PayoutListQuery>,
) -> Result<Json<Vec<Payout>>, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    Ok(Json(
        payout_queries::list_payouts(&state, &principal, query).await?,
    ))
}

async fn apply(
    state: &AppState,
    headers: &HeaderMap,
    payout_id: Uuid,
    action: PayoutAction,
) -> Result<Json<Payout>, HttpError> {
    let principal = require_principal(state, headers).await?;
    Ok(Json(
        payout_commands::apply_payout_action(state, &principal, payout_id, action).await?,
    ))
}

pub async fn approve_payout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(payout_id): Path<Uuid>,
) -> Result<Json<Payout>, HttpError> {
    apply(&state, &headers, payout_id, PayoutAction::Approve).await
}

pub async fn decline_payout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(payout_id): Path<Uuid>,
    Json(request): Json<DeclinePayoutRequest>,
) -> Result<Json<Payout>, HttpError> {
    let action = PayoutAction::Decline {
        reason: request.reason,
    };
    apply(&state, &headers, payout_id, action).await
}

pub async fn process_payout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(payout_id): Path<Uuid>,
) -> Result<Json<Payout>, HttpError> {
    apply(&state, &headers, payout_id, PayoutAction::StartProcessing).await
}

pub async fn mark_payout_paid(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(payout_id): Path<Uuid>,
    Json(request): Json<MarkPaidRequest>,
) -> Result<Json<Payout>, HttpError> {
    // missing fields are rejected by the state machine
    let action = PayoutAction::MarkPaid {
        payment_reference: request.payment_reference.unwrap_or_default(),
        receipt_url: request.receipt_url.unwrap_or_default(),
    };
    apply(&state, &headers, payout_id, action).await
}

pub async fn fail_payout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(payout_id): Path<Uuid>,
    Json(request): Json<FailPayoutRequest>,
) -> Result<Json<Payout>, HttpError> {
    let action = PayoutAction::Fail {
        reason: request.reason,
    };
    apply(&state, &headers, payout_id, action).await
}
