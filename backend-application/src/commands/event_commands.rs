use backend_domain::{
    verify_ticket_qr, CheckInRequest, CheckInResult, CreateEventRequest, CreateTierRequest, Event,
    Severity, SuspiciousActivity, TicketTier, MAX_UNIT_PRICE,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{AppError, AppState, Principal};

fn required_text(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn check_price(price: i64, field: &str) -> Result<(), AppError> {
    if !(0..=MAX_UNIT_PRICE).contains(&price) {
        return Err(AppError::BadRequest(format!(
            "{field} must be between 0 and {MAX_UNIT_PRICE}"
        )));
    }
    Ok(())
}

pub(crate) async fn load_event(state: &AppState, event_id: Uuid) -> Result<Event, AppError> {
    state
        .event_repo
        .find_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event {event_id}")))
}

pub async fn create_event(
    state: &AppState,
    principal: &Principal,
    request: CreateEventRequest,
) -> Result<Event, AppError> {
    principal.require_organizer()?;
    let title = required_text(&request.title, "title")?;
    let venue = required_text(&request.venue, "venue")?;
    check_price(request.ticket_price, "ticket_price")?;
    if request.total_tickets < 0 {
        return Err(AppError::BadRequest("total_tickets must not be negative".to_string()));
    }
    if request.ends_at.is_some_and(|ends| ends <= request.starts_at) {
        return Err(AppError::BadRequest("ends_at must be after starts_at".to_string()));
    }

    let event = Event {
        id: Uuid::new_v4(),
        organizer_id: principal.id(),
        title,
        description: request
            .description
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()),
        venue,
        starts_at: request.starts_at,
        ends_at: request.ends_at,
        currency: request.currency,
        ticket_price: request.ticket_price,
        total_tickets: request.total_tickets,
        sold_tickets: 0,
        published: false,
        created_at: Utc::now(),
    };
    state.event_repo.insert_event(&event).await?;
    info!(event_id = %event.id, organizer_id = %event.organizer_id, "event created");
    Ok(event)
}

pub async fn add_tier(
    state: &AppState,
    principal: &Principal,
    event_id: Uuid,
    request: CreateTierRequest,
) -> Result<TicketTier, AppError> {
    let event = load_event(state, event_id).await?;
    principal.require_event_access(&event)?;
    let name = required_text(&request.name, "name")?;
    if request.total_quantity < 1 {
        return Err(AppError::BadRequest("total_quantity must be at least 1".to_string()));
    }
    check_price(request.price, "price")?;
    if let (Some(start), Some(end)) = (request.sales_start, request.sales_end) {
        if end <= start {
            return Err(AppError::BadRequest("sales_end must be after sales_start".to_string()));
        }
    }

    let tier = TicketTier {
        id: Uuid::new_v4(),
        event_id,
        name,
        price: request.price,
        total_quantity: request.total_quantity,
        sold_quantity: 0,
        sales_start: request.sales_start,
        sales_end: request.sales_end,
    };
    state.event_repo.insert_tier(&tier).await?;
    info!(event_id = %event_id, tier_id = %tier.id, "tier added");
    Ok(tier)
}

pub async fn publish_event(
    state: &AppState,
    principal: &Principal,
    event_id: Uuid,
) -> Result<Event, AppError> {
    let mut event = load_event(state, event_id).await?;
    principal.require_event_access(&event)?;
    if event.total_tickets <= 0 && state.event_repo.list_tiers(event_id).await?.is_empty() {
        return Err(AppError::BadRequest(
            "event needs general admission inventory or at least one tier".to_string(),
        ));
    }
    state.event_repo.set_published(event_id, true).await?;
    event.published = true;
    info!(event_id = %event_id, "event published");
    Ok(event)
}

pub async fn check_in(
    state: &AppState,
    principal: &Principal,
    event_id: Uuid,
    request: CheckInRequest,
) -> Result<CheckInResult, AppError> {
    let event = load_event(state, event_id).await?;
    principal.require_event_access(&event)?;

    let claims = verify_ticket_qr(&state.config.qr_secret, &request.qr_payload)
        .ok_or_else(|| AppError::BadRequest("invalid ticket code".to_string()))?;
    if claims.event_id != event_id {
        return Err(AppError::BadRequest("ticket belongs to another event".to_string()));
    }
    let ticket = state
        .ticket_repo
        .find_ticket(claims.ticket_id)
        .await?
        .filter(|ticket| ticket.event_id == event_id)
        .ok_or_else(|| AppError::NotFound("ticket".to_string()))?;
    if !ticket.status.is_active() {
        return Err(AppError::Conflict(format!("ticket is {}", ticket.status.as_str())));
    }

    let now = Utc::now();
    if !state.ticket_repo.mark_checked_in(ticket.id, now).await? {
        warn!(ticket_id = %ticket.id, event_id = %event_id, "repeated check-in attempt");
        let activity = SuspiciousActivity::new(
            ticket.attendee_id,
            "duplicate_check_in",
            Severity::Medium,
            format!("ticket {} scanned again at event {}", ticket.id, event_id),
        );
        if let Err(err) = state.suspicious_repo.insert_activity(&activity).await {
            warn!("failed to record suspicious activity: {err:#}");
        }
        return Err(AppError::Conflict("ticket already checked in".to_string()));
    }

    info!(ticket_id = %ticket.id, event_id = %event_id, "ticket checked in");
    Ok(CheckInResult {
        ticket_id: ticket.id,
        attendee_id: ticket.attendee_id,
        tier_id: ticket.tier_id,
        checked_in_at: now,
    })
}
