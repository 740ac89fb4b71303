use backend_domain::{
    transition, validate_payout_request, Payout, PayoutAction, PayoutNotice, PayoutRequest,
    PayoutStatus,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::queries::earnings_queries::available_balance;
use crate::{AppError, AppState, Principal};

pub async fn request_payout(
    state: &AppState,
    principal: &Principal,
    request: PayoutRequest,
) -> Result<Payout, AppError> {
    principal.require_organizer()?;
    let available = available_balance(state, principal.id(), request.currency).await?;
    validate_payout_request(&request, state.config.minimum_payout_minor, available)?;

    let now = Utc::now();
    let payout = Payout {
        id: Uuid::new_v4(),
        organizer_id: principal.id(),
        amount: request.amount,
        currency: request.currency,
        method: request.method,
        destination: request.destination.trim().to_string(),
        status: PayoutStatus::Pending,
        decline_reason: None,
        failure_reason: None,
        payment_reference: None,
        receipt_url: None,
        scheduled_for: request.scheduled_for,
        completed_at: None,
        created_at: now,
        updated_at: now,
    };
    state.payout_repo.insert_payout(&payout).await?;
    info!(
        payout_id = %payout.id,
        organizer_id = %payout.organizer_id,
        amount = payout.amount,
        currency = %payout.currency,
        "payout requested"
    );
    Ok(payout)
}

// Admin-only status change. The stored row is only replaced when it still holds
// the status the transition was computed from.
pub async fn apply_payout_action(
    state: &AppState,
    principal: &Principal,
    payout_id: Uuid,
    action: PayoutAction,
) -> Result<Payout, AppError> {
    principal.require_admin()?;
    let current = state
        .payout_repo
        .find_payout(payout_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("payout {payout_id}")))?;

    let action_name = action.name();
    let (next, audit) = transition(&current, action, principal.id(), Utc::now())?;
    if !state
        .payout_repo
        .update_payout(&next, current.status, &audit)
        .await?
    {
        return Err(AppError::Conflict(
            "payout changed while the action was applied".to_string(),
        ));
    }
    info!(
        payout_id = %payout_id,
        actor_id = %principal.id(),
        from = %current.status,
        to = %next.status,
        action = action_name,
        "payout updated"
    );

    match state.user_repo.find_user(next.organizer_id).await {
        Ok(Some(organizer)) => state
            .notification_service
            .spawn_payout_update(PayoutNotice {
                organizer_email: organizer.email,
                payout_id: next.id,
                amount: next.amount,
                currency: next.currency,
                status: next.status,
                note: audit.note.clone(),
            }),
        Ok(None) => warn!(payout_id = %payout_id, "payout organizer not found"),
        Err(err) => {
            state.metrics.record_side_effect_failure();
            warn!(payout_id = %payout_id, "failed to load payout organizer: {err:#}");
        }
    }
    Ok(next)
}
