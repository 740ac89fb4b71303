use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{AppendHeaders, IntoResponse, Redirect};
use axum::Json;
use tracing::info;

use backend_application::commands::checkout_commands::{self, ReturnCookies};
use backend_application::AppState;
use backend_domain::{CardCheckout, CartRequest, MobileMoneyCheckout, MobileMoneyReturnQuery};

use crate::error::HttpError;
use crate::middleware::{clear_cookie, read_cookie, require_principal, set_cookie, ORDER_COOKIE, TOKEN_COOKIE};

pub async fn card_checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(cart): Json<CartRequest>,
) -> Result<Json<CardCheckout>, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    let checkout = checkout_commands::start_card_checkout(&state, &principal, cart).await?;
    Ok(Json(checkout))
}

pub async fn mobile_money_checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(cart): Json<CartRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let principal = require_principal(&state, &headers).await?;
    let checkout: MobileMoneyCheckout =
        checkout_commands::start_mobile_money_checkout(&state, &principal, cart).await?;

    let max_age = state.config.order_cookie_max_age_seconds;
    let secure = state.config.public_base_url.starts_with("https://");
    let mut cookies = vec![(SET_COOKIE, set_cookie(ORDER_COOKIE, &checkout.order_id, max_age, secure))];
    if let Some(token) = &checkout.gateway_token {
        cookies.push((SET_COOKIE, set_cookie(TOKEN_COOKIE, token, max_age, secure)));
    }
    Ok((AppendHeaders(cookies), Json(checkout)))
}

// Errors keep the cookies so a reload can retry.
pub async fn mobile_money_return(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<MobileMoneyReturnQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let cookies = ReturnCookies {
        order_id: read_cookie(&headers, ORDER_COOKIE),
        gateway_token: read_cookie(&headers, TOKEN_COOKIE),
    };
    let outcome = checkout_commands::complete_mobile_money_return(&state, query, cookies).await?;
    info!(
        order_id = outcome.order_id.as_deref().unwrap_or("-"),
        success = outcome.success,
        "mobile money return handled"
    );
    Ok((
        AppendHeaders([
            (SET_COOKIE, clear_cookie(ORDER_COOKIE)),
            (SET_COOKIE, clear_cookie(TOKEN_COOKIE)),
        ]),
        Redirect::to(&outcome.redirect_url),
    ))
}
