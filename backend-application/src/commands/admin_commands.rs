use std::collections::BTreeMap;

use backend_domain::{settle, Currency, OrganizerEarnings, Role, Ticket, TicketStatus};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::commands::issuance_commands::earnings_delta;
use crate::{AppError, AppState, Principal};

// Marks a ticket refunded. Amount and currency stay as issued.
pub async fn refund_ticket(
    state: &AppState,
    principal: &Principal,
    ticket_id: Uuid,
) -> Result<Ticket, AppError> {
    principal.require_admin()?;
    let mut ticket = state
        .ticket_repo
        .find_ticket(ticket_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("ticket {ticket_id}")))?;
    if ticket.status == TicketStatus::Refunded {
        return Err(AppError::Conflict("ticket is already refunded".to_string()));
    }
    state
        .ticket_repo
        .update_status(ticket_id, TicketStatus::Refunded)
        .await?;
    ticket.status = TicketStatus::Refunded;
    info!(ticket_id = %ticket_id, actor_id = %principal.id(), "ticket refunded");
    Ok(ticket)
}

pub async fn update_user_role(
    state: &AppState,
    principal: &Principal,
    user_id: Uuid,
    role: Role,
) -> Result<(), AppError> {
    principal.require_admin()?;
    if !state.user_repo.update_role(user_id, role).await? {
        return Err(AppError::NotFound(format!("user {user_id}")));
    }
    info!(user_id = %user_id, role = role.as_str(), "user role updated");
    Ok(())
}

pub async fn set_user_verification(
    state: &AppState,
    principal: &Principal,
    user_id: Uuid,
    verified: bool,
) -> Result<(), AppError> {
    principal.require_admin()?;
    if !state.user_repo.set_verified(user_id, verified).await? {
        return Err(AppError::NotFound(format!("user {user_id}")));
    }
    info!(user_id = %user_id, verified, "user verification updated");
    Ok(())
}

pub async fn review_suspicious_activity(
    state: &AppState,
    principal: &Principal,
    activity_id: Uuid,
) -> Result<(), AppError> {
    principal.require_admin()?;
    if !state
        .suspicious_repo
        .mark_reviewed(activity_id, principal.id())
        .await?
    {
        return Err(AppError::NotFound(format!("activity {activity_id}")));
    }
    Ok(())
}

pub async fn reconcile_earnings(
    state: &AppState,
    principal: &Principal,
    organizer_id: Uuid,
) -> Result<Vec<OrganizerEarnings>, AppError> {
    principal.require_admin()?;
    let events = state
        .event_repo
        .list_events_by_organizer(organizer_id)
        .await?;

    let mut per_currency: BTreeMap<Currency, OrganizerEarnings> = BTreeMap::new();
    let now = Utc::now();
    for event in events {
        let tickets = state.ticket_repo.list_by_event(event.id).await?;
        let settlement = settle(&tickets, &state.config.fees);
        let delta = earnings_delta(&settlement, event.currency);
        let row = per_currency
            .entry(event.currency)
            .or_insert_with(|| OrganizerEarnings {
                organizer_id,
                currency: event.currency,
                gross: 0,
                platform_fees: 0,
                processing_fees: 0,
                net: 0,
                tickets_sold: 0,
                updated_at: now,
            });
        row.gross += delta.gross;
        row.platform_fees += delta.platform_fees;
        row.processing_fees += delta.processing_fees;
        row.net += delta.net;
        row.tickets_sold += delta.tickets_sold;
    }

    let rows: Vec<OrganizerEarnings> = per_currency.into_values().collect();
    state
        .earnings_repo
        .replace_for_organizer(organizer_id, &rows)
        .await?;
    info!(organizer_id = %organizer_id, currencies = rows.len(), "earnings reconciled");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::issuance_commands::issue_tickets;
    use crate::testing::{test_state, MemoryStore};
    use backend_domain::{IssuanceRequest, PaymentMethod, PurchaseLine};
    use std::sync::atomic::Ordering;

    fn admin(store: &MemoryStore) -> Principal {
        Principal {
            user: store.seed_user("admin@eventhaiti.test", Role::Attendee),
            is_admin: true,
        }
    }

    async fn buy(state: &AppState, event_id: Uuid, payment_id: &str, quantity: u32) {
        issue_tickets(
            state,
            IssuanceRequest {
                payment_id: payment_id.to_string(),
                payment_method: PaymentMethod::Card,
                webhook: None,
                order_id: None,
                event_id,
                attendee_id: Uuid::new_v4(),
                lines: vec![PurchaseLine { tier_id: None, quantity, unit_price: 5000 }],
                promo_code_id: None,
                charged_amount: None,
                charged_currency: None,
                fx_rate: None,
            },
        )
        .await
        .expect("issue");
    }

    #[tokio::test]
    async fn refund_changes_status_only() {
        let store = MemoryStore::new();
        let state = test_state(&store);
        let event = store.seed_event(Uuid::new_v4(), Currency::Usd, 5000, 10);
        buy(&state, event.id, "pi_r", 1).await;
        let ticket = store.tickets()[0].clone();

        let refunded = refund_ticket(&state, &admin(&store), ticket.id).await.expect("refund");
        assert_eq!(refunded.status, TicketStatus::Refunded);
        let stored = store.tickets()[0].clone();
        assert_eq!(stored.status, TicketStatus::Refunded);
        assert_eq!(stored.price_paid, ticket.price_paid);
        assert_eq!(stored.currency, ticket.currency);

        let err = refund_ticket(&state, &admin(&store), ticket.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn reconcile_rebuilds_missing_earnings() {
        let store = MemoryStore::new();
        let state = test_state(&store);
        let organizer = store.seed_user("org@example.com", Role::Organizer);
        let event = store.seed_event(organizer.id, Currency::Usd, 5000, 10);
        store.fail_earnings.store(true, Ordering::Relaxed);
        buy(&state, event.id, "pi_a", 2).await;
        assert!(store.earnings_for(organizer.id, Currency::Usd).is_none());

        store.fail_earnings.store(false, Ordering::Relaxed);
        let rows = reconcile_earnings(&state, &admin(&store), organizer.id)
            .await
            .expect("reconcile");
        assert_eq!(rows.len(), 1);
        let stored = store.earnings_for(organizer.id, Currency::Usd).expect("earnings");
        assert_eq!(stored.gross, 10_000);
        assert_eq!(stored.net, 8680);
        assert_eq!(stored.tickets_sold, 2);
    }

    #[tokio::test]
    async fn role_and_verification_updates_require_admin() {
        let store = MemoryStore::new();
        let state = test_state(&store);
        let user = store.seed_user("fan@example.com", Role::Attendee);
        let outsider = Principal {
            user: user.clone(),
            is_admin: false,
        };
        assert!(matches!(
            update_user_role(&state, &outsider, user.id, Role::Organizer).await,
            Err(AppError::Forbidden)
        ));

        update_user_role(&state, &admin(&store), user.id, Role::Organizer)
            .await
            .expect("promote");
        set_user_verification(&state, &admin(&store), user.id, false)
            .await
            .expect("verify");
        let stored = store.users.lock().expect("lock")[&user.id].clone();
        assert_eq!(stored.role, Role::Organizer);
        assert!(!stored.verified);

        assert!(matches!(
            update_user_role(&state, &admin(&store), Uuid::new_v4(), Role::Organizer).await,
            Err(AppError::NotFound(_))
        ));
    }
}
