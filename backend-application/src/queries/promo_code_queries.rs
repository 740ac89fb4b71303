use backend_domain::{
    apply_discount, check_promo, normalize_code, PromoCode, PromoCodeValidation,
    ValidatePromoCodeRequest,
};
use chrono::Utc;
use uuid::Uuid;

use crate::commands::event_commands::load_event;
use crate::{AppError, AppState, Principal};

pub async fn list_promo_codes(
    state: &AppState,
    principal: &Principal,
    event_id: Uuid,
) -> Result<Vec<PromoCode>, AppError> {
    let event = load_event(state, event_id).await?;
    principal.require_event_access(&event)?;
    let mut codes = state.promo_repo.list_by_event(event_id).await?;
    codes.sort_by(|a, b| a.code.cmp(&b.code));
    Ok(codes)
}

pub async fn validate_promo_code(
    state: &AppState,
    request: ValidatePromoCodeRequest,
) -> Result<PromoCodeValidation, AppError> {
    let event = load_event(state, request.event_id).await?;
    let code = normalize_code(&request.code);
    let promo = state
        .promo_repo
        .find_by_code(event.id, &code)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("promo code {code}")))?;
    check_promo(&promo, event.id, Utc::now())?;

    let original_price = match request.tier_id {
        Some(tier_id) => state
            .event_repo
            .list_tiers(event.id)
            .await?
            .into_iter()
            .find(|tier| tier.id == tier_id)
            .map(|tier| tier.price)
            .ok_or_else(|| AppError::NotFound(format!("tier {tier_id}")))?,
        None => event.ticket_price,
    };
    Ok(PromoCodeValidation {
        promo_code_id: promo.id,
        code: promo.code,
        discount: promo.discount,
        original_price,
        discounted_price: apply_discount(original_price, &promo.discount),
    })
}
