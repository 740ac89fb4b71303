use backend_domain::{normalize_code, CreatePromoCodeRequest, Discount, PromoCode};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::commands::event_commands::load_event;
use crate::{AppError, AppState, Principal};

const MAX_CODE_LEN: usize = 32;

fn validate_code(raw: &str) -> Result<String, AppError> {
    let code = normalize_code(raw);
    if code.is_empty() || code.len() > MAX_CODE_LEN {
        return Err(AppError::BadRequest(format!(
            "code must be 1 to {MAX_CODE_LEN} characters"
        )));
    }
    if !code
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(AppError::BadRequest(
            "code may only contain letters, digits, '-' and '_'".to_string(),
        ));
    }
    Ok(code)
}

fn validate_discount(discount: &Discount) -> Result<(), AppError> {
    match discount {
        Discount::Percentage(percent) if !(1..=100).contains(percent) => Err(AppError::BadRequest(
            "percentage discount must be between 1 and 100".to_string(),
        )),
        Discount::Fixed(amount) if *amount <= 0 => Err(AppError::BadRequest(
            "fixed discount must be positive".to_string(),
        )),
        _ => Ok(()),
    }
}

pub async fn create_promo_code(
    state: &AppState,
    principal: &Principal,
    event_id: Uuid,
    request: CreatePromoCodeRequest,
) -> Result<PromoCode, AppError> {
    let event = load_event(state, event_id).await?;
    principal.require_event_access(&event)?;
    let code = validate_code(&request.code)?;
    validate_discount(&request.discount)?;
    if request.max_uses.is_some_and(|max| max < 1) {
        return Err(AppError::BadRequest("max_uses must be at least 1".to_string()));
    }
    if state.promo_repo.find_by_code(event_id, &code).await?.is_some() {
        return Err(AppError::Conflict(format!("promo code {code} already exists")));
    }

    let promo = PromoCode {
        id: Uuid::new_v4(),
        event_id,
        code,
        discount: request.discount,
        max_uses: request.max_uses,
        uses: 0,
        active: true,
        expires_at: request.expires_at,
        created_at: Utc::now(),
    };
    state.promo_repo.insert_promo_code(&promo).await?;
    info!(event_id = %event_id, promo_code_id = %promo.id, code = %promo.code, "promo code created");
    Ok(promo)
}

pub async fn set_promo_code_active(
    state: &AppState,
    principal: &Principal,
    promo_id: Uuid,
    active: bool,
) -> Result<PromoCode, AppError> {
    let mut promo = state
        .promo_repo
        .find_promo_code(promo_id)
        .await?
        .ok_or_else(|| AppError::NotFound("promo code".to_string()))?;
    let event = load_event(state, promo.event_id).await?;
    principal.require_event_access(&event)?;

    state.promo_repo.set_active(promo_id, active).await?;
    promo.active = active;
    info!(promo_code_id = %promo_id, active, "promo code toggled");
    Ok(promo)
}
