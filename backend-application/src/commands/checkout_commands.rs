use backend_domain::{
    charge_in_htg, normalize_cart, normalize_code, price_cart, CardCheckout, CardCheckoutRequest,
    CartRequest, Currency, Event, IssuanceOutcome, IssuanceRequest,
    MobileMoneyCheckout, MobileMoneyPayment, MobileMoneyReturnQuery, PaymentMethod,
    PendingStatus, PendingStatusUpdate, PendingTransaction, PricedCart, RawPurchaseMetadata,
    Severity, SuspiciousActivity, WebhookRef,
};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::commands::issuance_commands::issue_tickets;
use crate::{AppError, AppState, Principal};

pub const MOBILE_MONEY_PROVIDER: &str = "moncash";

async fn price_request(state: &AppState, cart: &CartRequest) -> Result<(Event, PricedCart), AppError> {
    let lines = normalize_cart(cart, state.config.max_tickets_per_order)?;
    let event = state
        .event_repo
        .find_event(cart.event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("event".to_string()))?;
    let tiers = state.event_repo.list_tiers(event.id).await?;

    let code = cart
        .promo_code
        .as_deref()
        .map(normalize_code)
        .filter(|code| !code.is_empty());
    let promo = match code {
        Some(code) => Some(
            state
                .promo_repo
                .find_by_code(event.id, &code)
                .await?
                .ok_or_else(|| AppError::BadRequest(format!("promo code {code} not found")))?,
        ),
        None => None,
    };

    let priced = price_cart(&event, &tiers, &lines, promo.as_ref(), Utc::now())?;
    Ok((event, priced))
}

// Live rate plus the configured spread, or the fallback rate when the rate
// service is unavailable.
pub async fn usd_htg_rate(state: &AppState) -> Decimal {
    let base = match state.fx_provider.usd_to_htg().await {
        Ok(rate) if rate > Decimal::ZERO => rate,
        Ok(rate) => {
            warn!(%rate, "ignoring non-positive USD/HTG rate");
            state.config.fallback_usd_htg_rate
        }
        Err(err) => {
            warn!("USD/HTG rate unavailable, using fallback: {err:#}");
            state.config.fallback_usd_htg_rate
        }
    };
    base + state.config.usd_htg_spread
}

pub async fn start_mobile_money_checkout(
    state: &AppState,
    principal: &Principal,
    cart: CartRequest,
) -> Result<MobileMoneyCheckout, AppError> {
    let (event, priced) = price_request(state, &cart).await?;
    if priced.total <= 0 {
        return Err(AppError::BadRequest(
            "free orders are confirmed through card checkout".to_string(),
        ));
    }

    let (charged_amount, fx_rate) = match priced.currency {
        Currency::Htg => (priced.total, None),
        Currency::Usd => charge_in_htg(priced.total, priced.currency, usd_htg_rate(state).await),
    };

    let order_id = format!("EH{}", Uuid::new_v4().simple()).to_uppercase();
    let pending = PendingTransaction {
        order_id: order_id.clone(),
        event_id: event.id,
        attendee_id: principal.id(),
        lines: priced.lines.clone(),
        promo_code_id: priced.promo_code_id,
        amount: priced.total,
        currency: priced.currency,
        charged_amount,
        fx_rate,
        gateway_token: None,
        status: PendingStatus::Pending,
        transaction_id: None,
        created_at: Utc::now(),
    };
    state.pending_repo.insert_pending(&pending).await?;
    state.metrics.record_checkout();

    let (redirect, gateway_token) = match state
        .mobile_money_gateway
        .create_payment(&order_id, charged_amount)
        .await
    {
        Ok(token) => {
            if let Err(err) = state.pending_repo.set_gateway_token(&order_id, &token).await {
                warn!(order_id = %order_id, "failed to store gateway token: {err:#}");
            }
            (state.mobile_money_gateway.redirect_for_token(&token), Some(token))
        }
        Err(err) => {
            warn!(order_id = %order_id, "payment token request failed, using form post: {err:#}");
            (
                state
                    .mobile_money_gateway
                    .form_post_fallback(&order_id, charged_amount),
                None,
            )
        }
    };

    info!(
        order_id = %order_id,
        event_id = %event.id,
        amount = priced.total,
        charged_amount,
        "mobile money checkout started"
    );
    Ok(MobileMoneyCheckout {
        order_id,
        amount: priced.total,
        currency: priced.currency,
        charged_amount,
        fx_rate,
        redirect,
        gateway_token,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobileMoneyReturn {
    pub order_id: Option<String>,
    pub success: bool,
    pub redirect_url: String,
}

impl MobileMoneyReturn {
    fn new(state: &AppState, order_id: Option<String>, success: bool) -> Self {
        let base = state.config.public_base_url.trim_end_matches('/');
        let page = if success { "success" } else { "failed" };
        let redirect_url = match &order_id {
            Some(order) => format!("{base}/purchase/{page}?order={order}"),
            None => format!("{base}/purchase/{page}"),
        };
        Self {
            order_id,
            success,
            redirect_url,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

#[derive(Debug, Default)]
pub struct ReturnCookies {
    pub order_id: Option<String>,
    pub gateway_token: Option<String>,
}

// The order id comes from the query, then the order cookie, then the pending
// transaction holding the token cookie, then a gateway lookup by transaction id.
pub async fn complete_mobile_money_return(
    state: &AppState,
    query: MobileMoneyReturnQuery,
    cookies: ReturnCookies,
) -> Result<MobileMoneyReturn, AppError> {
    let transaction_id = non_empty(query.transaction_id);
    let mut payment: Option<MobileMoneyPayment> = None;

    let mut order_id = non_empty(query.order_id).or_else(|| non_empty(cookies.order_id));
    if order_id.is_none() {
        if let Some(token) = non_empty(cookies.gateway_token) {
            match state.pending_repo.find_by_gateway_token(&token).await {
                Ok(found) => order_id = found.map(|pending| pending.order_id),
                Err(err) => warn!("pending lookup by gateway token failed: {err:#}"),
            }
        }
    }
    if order_id.is_none() {
        if let Some(txn) = &transaction_id {
            match state.mobile_money_gateway.retrieve_by_transaction(txn).await {
                Ok(found) => {
                    payment = found;
                    order_id = payment.as_ref().map(|p| p.order_id.clone());
                }
                Err(err) => warn!(transaction_id = %txn, "transaction lookup failed: {err:#}"),
            }
        }
    }
    let Some(order_id) = order_id else {
        warn!("mobile money return without a resolvable order");
        return Ok(MobileMoneyReturn::new(state, None, false));
    };

    let Some(pending) = state.pending_repo.find_pending(&order_id).await? else {
        warn!(order_id = %order_id, "mobile money return for unknown order");
        return Ok(MobileMoneyReturn::new(state, Some(order_id), false));
    };
    match pending.status {
        PendingStatus::Completed => return Ok(MobileMoneyReturn::new(state, Some(order_id), true)),
        PendingStatus::Failed | PendingStatus::NeedsRefund => {
            return Ok(MobileMoneyReturn::new(state, Some(order_id), false))
        }
        PendingStatus::Pending => {}
    }

    if payment.is_none() {
        let lookup = match &transaction_id {
            Some(txn) => state.mobile_money_gateway.retrieve_by_transaction(txn).await,
            None => state.mobile_money_gateway.retrieve_by_order(&order_id).await,
        };
        payment = match lookup {
            Ok(found) => found,
            Err(err) => {
                warn!(order_id = %order_id, "payment verification failed: {err:#}");
                return Ok(MobileMoneyReturn::new(state, Some(order_id), false));
            }
        };
    }

    let Some(payment) = payment.filter(|p| p.order_id == order_id) else {
        warn!(order_id = %order_id, "gateway has no payment for order");
        return Ok(MobileMoneyReturn::new(state, Some(order_id), false));
    };
    if !payment.successful {
        mark_failed(state, &order_id, &payment.transaction_id).await;
        return Ok(MobileMoneyReturn::new(state, Some(order_id), false));
    }
    if payment.amount < pending.charged_amount {
        warn!(
            order_id = %order_id,
            paid = payment.amount,
            expected = pending.charged_amount,
            "mobile money payment below charged amount"
        );
        flag_activity(
            state,
            pending.attendee_id,
            "payment_amount_mismatch",
            format!(
                "order {order_id} paid {} of {} HTG minor units (transaction {})",
                payment.amount, pending.charged_amount, payment.transaction_id
            ),
        )
        .await;
        mark_failed(state, &order_id, &payment.transaction_id).await;
        return Ok(MobileMoneyReturn::new(state, Some(order_id), false));
    }

    let outcome = issue_tickets(
        state,
        IssuanceRequest {
            payment_id: format!("moncash_{}", payment.transaction_id),
            payment_method: PaymentMethod::MobileMoney,
            webhook: Some(WebhookRef {
                provider: MOBILE_MONEY_PROVIDER.to_string(),
                event_id: payment.transaction_id.clone(),
            }),
            order_id: Some(order_id.clone()),
            event_id: pending.event_id,
            attendee_id: pending.attendee_id,
            lines: pending.lines.clone(),
            promo_code_id: pending.promo_code_id,
            charged_amount: Some(pending.charged_amount),
            charged_currency: Some(Currency::Htg),
            fx_rate: pending.fx_rate,
        },
    )
    .await?;

    let success = match outcome {
        IssuanceOutcome::Issued { .. } => true,
        IssuanceOutcome::AlreadyProcessed => {
            let update = PendingStatusUpdate {
                status: PendingStatus::Completed,
                transaction_id: Some(payment.transaction_id.clone()),
            };
            if let Err(err) = state.pending_repo.update_pending_status(&order_id, &update).await {
                warn!(order_id = %order_id, "failed to complete pending transaction: {err:#}");
            }
            true
        }
        IssuanceOutcome::SoldOut { .. } => false,
    };
    Ok(MobileMoneyReturn::new(state, Some(order_id), success))
}

async fn mark_failed(state: &AppState, order_id: &str, transaction_id: &str) {
    let update = PendingStatusUpdate {
        status: PendingStatus::Failed,
        transaction_id: Some(transaction_id.to_string()),
    };
    if let Err(err) = state.pending_repo.update_pending_status(order_id, &update).await {
        warn!(order_id = %order_id, "failed to mark pending transaction failed: {err:#}");
    }
}

async fn flag_activity(state: &AppState, user_id: Uuid, kind: &str, details: String) {
    let activity = SuspiciousActivity::new(user_id, kind, Severity::High, details);
    if let Err(err) = state.suspicious_repo.insert_activity(&activity).await {
        warn!(user_id = %user_id, "failed to record suspicious activity: {err:#}");
    }
}

pub async fn start_card_checkout(
    state: &AppState,
    principal: &Principal,
    cart: CartRequest,
) -> Result<CardCheckout, AppError> {
    let (event, priced) = price_request(state, &cart).await?;

    if priced.total == 0 {
        let outcome = issue_tickets(
            state,
            IssuanceRequest {
                payment_id: format!("free_{}", Uuid::new_v4().simple()),
                payment_method: PaymentMethod::Free,
                webhook: None,
                order_id: None,
                event_id: event.id,
                attendee_id: principal.id(),
                lines: priced.lines,
                promo_code_id: priced.promo_code_id,
                charged_amount: None,
                charged_currency: None,
                fx_rate: None,
            },
        )
        .await?;
        return match outcome {
            IssuanceOutcome::Issued { ticket_ids } => Ok(CardCheckout::Issued { ticket_ids }),
            IssuanceOutcome::SoldOut { reason } => Err(AppError::Conflict(reason)),
            IssuanceOutcome::AlreadyProcessed => {
                Err(AppError::Conflict("order already processed".to_string()))
            }
        };
    }

    let items = serde_json::to_string(&priced.lines)
        .map_err(|err| AppError::Internal(anyhow::Error::new(err)))?;
    let base = state.config.public_base_url.trim_end_matches('/');
    let request = CardCheckoutRequest {
        event_title: event.title.clone(),
        currency: priced.currency,
        total: priced.total,
        quantity: priced.quantity(),
        customer_email: Some(principal.user.email.clone()),
        success_url: format!("{base}/purchase/success?session_id={{CHECKOUT_SESSION_ID}}"),
        cancel_url: format!("{base}/events/{}", event.id),
        metadata: RawPurchaseMetadata {
            event_id: Some(event.id.to_string()),
            user_id: Some(principal.id().to_string()),
            items: Some(items),
            promo_code_id: priced.promo_code_id.map(|id| id.to_string()),
            ..RawPurchaseMetadata::default()
        },
    };
    let session = state.card_gateway.create_checkout_session(&request).await?;
    state.metrics.record_checkout();
    info!(event_id = %event.id, session_id = %session.id, total = priced.total, "card checkout started");

    Ok(CardCheckout::Redirect {
        session_id: session.id,
        url: session.url,
    })
}
