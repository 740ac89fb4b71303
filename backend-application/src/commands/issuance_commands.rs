use backend_domain::{
    allocate_proportionally, settle, sign_ticket_qr, CardWebhookKind, Currency, EarningsDelta,
    Event, IssuanceOutcome, IssuanceRequest, PaymentMethod, PendingStatus, PendingStatusUpdate,
    PurchaseLine, SaleRecord, Settlement, Ticket, TicketNotice, TicketStatus, WebhookRef,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{AppError, AppState};

pub const CARD_PROVIDER: &str = "stripe";

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<IssuanceOutcome>,
}

pub async fn handle_card_webhook(
    state: &AppState,
    payload: &[u8],
    signature_header: &str,
) -> Result<WebhookAck, AppError> {
    state.metrics.record_webhook();
    let now = Utc::now().timestamp();
    let event = state
        .card_gateway
        .verify_webhook(payload, signature_header, now)
        .map_err(|err| {
            state.metrics.record_webhook_failure();
            warn!("rejected card webhook: {err:#}");
            AppError::BadRequest("invalid webhook signature".to_string())
        })?;

    match &event.kind {
        CardWebhookKind::Ignored(kind) => {
            debug!(webhook_id = %event.id, kind = %kind, "ignoring card webhook");
            return Ok(WebhookAck { received: true, outcome: None });
        }
        CardWebhookKind::CheckoutCompleted if !event.paid => {
            debug!(webhook_id = %event.id, "checkout completed without payment yet");
            return Ok(WebhookAck { received: true, outcome: None });
        }
        _ => {}
    }

    let metadata = event.metadata.normalize(event.amount).map_err(|err| {
        state.metrics.record_webhook_failure();
        error!(webhook_id = %event.id, payment_id = %event.payment_id, "unusable purchase metadata: {err:#}");
        AppError::BadRequest(format!("invalid purchase metadata: {err}"))
    })?;

    let request = IssuanceRequest {
        payment_id: event.payment_id.clone(),
        payment_method: PaymentMethod::Card,
        webhook: Some(WebhookRef {
            provider: CARD_PROVIDER.to_string(),
            event_id: event.id.clone(),
        }),
        order_id: None,
        event_id: metadata.event_id,
        attendee_id: metadata.attendee_id,
        lines: metadata.lines,
        promo_code_id: metadata.promo_code_id,
        charged_amount: Some(event.amount),
        charged_currency: event.currency,
        fx_rate: metadata.fx_rate,
    };
    let outcome = issue_tickets(state, request).await.map_err(|err| {
        state.metrics.record_webhook_failure();
        err
    })?;
    Ok(WebhookAck {
        received: true,
        outcome: Some(outcome),
    })
}

// Duplicate deliveries converge on the payment claim. Everything after the
// ticket insert is best effort.
pub async fn issue_tickets(
    state: &AppState,
    request: IssuanceRequest,
) -> Result<IssuanceOutcome, AppError> {
    if let Some(webhook) = &request.webhook {
        if state
            .receipt_repo
            .has_receipt(&webhook.provider, &webhook.event_id)
            .await?
        {
            info!(provider = %webhook.provider, webhook_id = %webhook.event_id, "webhook already processed");
            return Ok(IssuanceOutcome::AlreadyProcessed);
        }
    }
    if state
        .ticket_repo
        .exists_for_payment(&request.payment_id)
        .await?
    {
        info!(payment_id = %request.payment_id, "tickets already issued for payment");
        record_receipt(state, request.webhook.as_ref()).await;
        return Ok(IssuanceOutcome::AlreadyProcessed);
    }
    if request.lines.is_empty() || request.lines.iter().any(|line| line.quantity == 0) {
        return Err(AppError::BadRequest("purchase has no tickets".to_string()));
    }

    if !state.receipt_repo.claim_payment(&request.payment_id).await? {
        info!(payment_id = %request.payment_id, "payment claimed by another delivery");
        record_receipt(state, request.webhook.as_ref()).await;
        return Ok(IssuanceOutcome::AlreadyProcessed);
    }
    let outcome = issue_claimed(state, &request).await;
    if outcome.is_err() {
        if let Err(err) = state.receipt_repo.release_payment(&request.payment_id).await {
            error!(payment_id = %request.payment_id, "failed to release payment claim: {err:#}");
        }
    }
    outcome
}

async fn issue_claimed(
    state: &AppState,
    request: &IssuanceRequest,
) -> Result<IssuanceOutcome, AppError> {
    let event = state
        .event_repo
        .find_event(request.event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event {}", request.event_id)))?;

    if let Some(reason) = reserve_lines(state, &event, &request.lines).await? {
        warn!(
            payment_id = %request.payment_id,
            event_id = %event.id,
            "paid purchase could not be fulfilled: {reason}"
        );
        if let Some(order_id) = &request.order_id {
            mark_pending(state, order_id, PendingStatus::NeedsRefund, None).await;
        }
        record_receipt(state, request.webhook.as_ref()).await;
        return Ok(IssuanceOutcome::SoldOut { reason });
    }

    let tickets = match build_tickets(state, &event, request) {
        Ok(tickets) => tickets,
        Err(err) => {
            release_lines(state, event.id, &request.lines).await;
            return Err(err);
        }
    };
    if let Err(err) = state.ticket_repo.insert_tickets(&tickets).await {
        error!(payment_id = %request.payment_id, "ticket insert failed: {err:#}");
        release_lines(state, event.id, &request.lines).await;
        return Err(AppError::Internal(err));
    }

    let ticket_ids: Vec<Uuid> = tickets.iter().map(|ticket| ticket.id).collect();
    info!(
        payment_id = %request.payment_id,
        event_id = %event.id,
        count = tickets.len(),
        "tickets issued"
    );
    state.metrics.record_tickets_issued(tickets.len());

    record_receipt(state, request.webhook.as_ref()).await;
    if let Some(order_id) = &request.order_id {
        let transaction_id = request
            .payment_id
            .strip_prefix("moncash_")
            .map(ToString::to_string);
        mark_pending(state, order_id, PendingStatus::Completed, transaction_id).await;
    }
    run_side_effects(state, &event, request, &tickets).await;

    Ok(IssuanceOutcome::Issued { ticket_ids })
}

// Earlier lines are released when a later one is sold out.
async fn reserve_lines(
    state: &AppState,
    event: &Event,
    lines: &[PurchaseLine],
) -> Result<Option<String>, AppError> {
    let mut reserved: Vec<PurchaseLine> = Vec::with_capacity(lines.len());
    for line in lines {
        let outcome = state
            .event_repo
            .reserve_inventory(event.id, line.tier_id, line.quantity)
            .await;
        match outcome {
            Ok(true) => reserved.push(line.clone()),
            Ok(false) => {
                release_lines(state, event.id, &reserved).await;
                let label = line
                    .tier_id
                    .map(|id| format!("tier {id}"))
                    .unwrap_or_else(|| "general admission".to_string());
                return Ok(Some(format!("{label} is sold out")));
            }
            Err(err) => {
                release_lines(state, event.id, &reserved).await;
                return Err(AppError::Internal(err));
            }
        }
    }
    Ok(None)
}

async fn release_lines(state: &AppState, event_id: Uuid, lines: &[PurchaseLine]) {
    for line in lines {
        if let Err(err) = state
            .event_repo
            .release_inventory(event_id, line.tier_id, line.quantity)
            .await
        {
            error!(event_id = %event_id, "failed to release inventory: {err:#}");
        }
    }
}

fn build_tickets(
    state: &AppState,
    event: &Event,
    request: &IssuanceRequest,
) -> Result<Vec<Ticket>, AppError> {
    let units: Vec<&PurchaseLine> = request
        .lines
        .iter()
        .flat_map(|line| std::iter::repeat(line).take(line.quantity as usize))
        .collect();
    let weights: Vec<i64> = units.iter().map(|line| line.unit_price).collect();
    let charged_split = request
        .charged_amount
        .map(|total| allocate_proportionally(total, &weights));

    let purchased_at = Utc::now();
    units
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            let id = Uuid::new_v4();
            let qr_payload = sign_ticket_qr(&state.config.qr_secret, id, event.id)?;
            Ok(Ticket {
                id,
                event_id: event.id,
                tier_id: line.tier_id,
                attendee_id: request.attendee_id,
                price_paid: line.unit_price,
                currency: event.currency,
                payment_method: request.payment_method,
                payment_id: Some(request.payment_id.clone()),
                status: TicketStatus::Valid,
                qr_payload,
                checked_in_at: None,
                charged_amount: charged_split.as_ref().map(|split| split[idx]),
                charged_currency: request.charged_currency,
                fx_rate: request.fx_rate,
                promo_code_id: request.promo_code_id,
                purchased_at,
            })
        })
        .collect::<anyhow::Result<Vec<Ticket>>>()
        .map_err(AppError::Internal)
}

async fn record_receipt(state: &AppState, webhook: Option<&WebhookRef>) {
    let Some(webhook) = webhook else {
        return;
    };
    if let Err(err) = state
        .receipt_repo
        .record_receipt(&webhook.provider, &webhook.event_id)
        .await
    {
        state.metrics.record_side_effect_failure();
        warn!(webhook_id = %webhook.event_id, "failed to record webhook receipt: {err:#}");
    }
}

async fn mark_pending(
    state: &AppState,
    order_id: &str,
    status: PendingStatus,
    transaction_id: Option<String>,
) {
    let update = PendingStatusUpdate {
        status,
        transaction_id,
    };
    match state.pending_repo.update_pending_status(order_id, &update).await {
        Ok(true) => {}
        Ok(false) => warn!(order_id = %order_id, "pending transaction not found"),
        Err(err) => {
            state.metrics.record_side_effect_failure();
            warn!(order_id = %order_id, "failed to update pending transaction: {err:#}");
        }
    }
}

pub(crate) fn earnings_delta(settlement: &Settlement, currency: Currency) -> EarningsDelta {
    EarningsDelta {
        currency,
        gross: settlement.totals.gross,
        platform_fees: settlement.totals.platform_fee,
        processing_fees: settlement.totals.processing_fee,
        net: settlement.totals.organizer_net,
        tickets_sold: settlement.totals.tickets as i64,
    }
}

// Failures here are logged and counted, never returned.
async fn run_side_effects(
    state: &AppState,
    event: &Event,
    request: &IssuanceRequest,
    tickets: &[Ticket],
) {
    if let Some(promo_id) = request.promo_code_id {
        if let Err(err) = state.promo_repo.increment_usage(promo_id, 1).await {
            state.metrics.record_side_effect_failure();
            warn!(promo_code_id = %promo_id, "failed to record promo usage: {err:#}");
        }
    }

    let settlement = settle(tickets, &state.config.fees);
    if settlement.totals.gross > 0 {
        let delta = earnings_delta(&settlement, event.currency);
        if let Err(err) = state.earnings_repo.credit(event.organizer_id, &delta).await {
            state.metrics.record_side_effect_failure();
            error!(
                organizer_id = %event.organizer_id,
                payment_id = %request.payment_id,
                "failed to credit organizer earnings: {err:#}"
            );
        }
    }

    let sale = SaleRecord {
        payment_id: request.payment_id.clone(),
        event_id: event.id,
        organizer_id: event.organizer_id,
        attendee_id: request.attendee_id,
        payment_method: request.payment_method,
        currency: event.currency,
        quantity: tickets.len() as u32,
        gross: settlement.totals.gross,
        net: settlement.totals.organizer_net,
        purchased_at: tickets
            .first()
            .map(|ticket| ticket.purchased_at)
            .unwrap_or_else(Utc::now),
    };
    if let Err(err) = state.analytics_mirror.mirror_sale(&sale).await {
        state.metrics.record_side_effect_failure();
        warn!(payment_id = %request.payment_id, "failed to mirror sale: {err:#}");
    }

    match state.user_repo.find_user(request.attendee_id).await {
        Ok(Some(attendee)) => {
            state
                .notification_service
                .spawn_ticket_confirmation(TicketNotice {
                    attendee_email: attendee.email,
                    attendee_name: attendee.display_name,
                    phone: attendee.phone,
                    push_tokens: attendee.push_tokens,
                    channels: attendee.notification_prefs,
                    event_title: event.title.clone(),
                    starts_at: event.starts_at,
                    venue: event.venue.clone(),
                    ticket_ids: tickets.iter().map(|ticket| ticket.id).collect(),
                    qr_payloads: tickets.iter().map(|ticket| ticket.qr_payload.clone()).collect(),
                });
        }
        Ok(None) => warn!(attendee_id = %request.attendee_id, "attendee not found for notification"),
        Err(err) => {
            state.metrics.record_side_effect_failure();
            warn!(attendee_id = %request.attendee_id, "failed to load attendee: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_state, MemoryStore};
    use backend_domain::{
        verify_ticket_qr, CardWebhookEvent, Discount, RawPurchaseMetadata, Role,
    };
    use std::sync::atomic::Ordering;

    fn card_event(event_id: Uuid, attendee_id: Uuid, quantity: u32, amount: i64) -> CardWebhookEvent {
        CardWebhookEvent {
            id: "evt_1".to_string(),
            kind: CardWebhookKind::CheckoutCompleted,
            payment_id: "pi_1".to_string(),
            amount,
            currency: Some(Currency::Usd),
            paid: true,
            metadata: RawPurchaseMetadata {
                event_id: Some(event_id.to_string()),
                user_id: Some(attendee_id.to_string()),
                quantity: Some(quantity.to_string()),
                ..RawPurchaseMetadata::default()
            },
        }
    }

    #[tokio::test]
    async fn card_webhook_issues_one_ticket_per_unit() {
        let store = MemoryStore::new();
        let state = test_state(&store);
        let organizer = store.seed_user("org@example.com", Role::Organizer);
        let attendee = store.seed_user("fan@example.com", Role::Attendee);
        let event = store.seed_event(organizer.id, Currency::Usd, 5000, 100);
        store.set_card_event(card_event(event.id, attendee.id, 2, 10_000));

        let ack = handle_card_webhook(&state, b"{}", "valid").await.expect("ack");
        let Some(IssuanceOutcome::Issued { ticket_ids }) = ack.outcome else {
            panic!("expected issued outcome");
        };
        assert_eq!(ticket_ids.len(), 2);

        let tickets = store.tickets();
        assert_eq!(tickets.len(), 2);
        assert!(tickets.iter().all(|t| t.price_paid == 5000 && t.currency == Currency::Usd));
        assert!(tickets.iter().all(|t| t.payment_id.as_deref() == Some("pi_1")));
        assert!(tickets
            .iter()
            .all(|t| verify_ticket_qr("test-qr-secret", &t.qr_payload).is_some()));
        assert_eq!(store.event(event.id).expect("event").sold_tickets, 2);

        let earnings = store.earnings_for(organizer.id, Currency::Usd).expect("earnings");
        assert_eq!(earnings.gross, 10_000);
        assert_eq!(earnings.platform_fees, 1000);
        assert_eq!(earnings.processing_fees, 320);
        assert_eq!(earnings.net, 8680);
        assert_eq!(store.ticket_notices.lock().expect("lock").len(), 1);
        assert_eq!(store.sales.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn duplicate_webhook_delivery_does_not_duplicate_tickets() {
        let store = MemoryStore::new();
        let state = test_state(&store);
        let organizer = store.seed_user("org@example.com", Role::Organizer);
        let attendee = store.seed_user("fan@example.com", Role::Attendee);
        let event = store.seed_event(organizer.id, Currency::Usd, 5000, 100);
        store.set_card_event(card_event(event.id, attendee.id, 1, 5000));

        handle_card_webhook(&state, b"{}", "valid").await.expect("first");
        let second = handle_card_webhook(&state, b"{}", "valid").await.expect("second");
        assert_eq!(second.outcome, Some(IssuanceOutcome::AlreadyProcessed));

        // payment_intent.succeeded for the same purchase converges on the payment id
        let mut intent = card_event(event.id, attendee.id, 1, 5000);
        intent.id = "evt_2".to_string();
        intent.kind = CardWebhookKind::PaymentSucceeded;
        store.set_card_event(intent);
        let third = handle_card_webhook(&state, b"{}", "valid").await.expect("third");
        assert_eq!(third.outcome, Some(IssuanceOutcome::AlreadyProcessed));

        assert_eq!(store.tickets().len(), 1);
        assert_eq!(store.event(event.id).expect("event").sold_tickets, 1);
    }

    #[tokio::test]
    async fn concurrent_deliveries_for_one_payment_issue_once() {
        let store = MemoryStore::new();
        let state = test_state(&store);
        let organizer = store.seed_user("org@example.com", Role::Organizer);
        let attendee = store.seed_user("fan@example.com", Role::Attendee);
        let event = store.seed_event(organizer.id, Currency::Usd, 5000, 100);
        store.set_card_event(card_event(event.id, attendee.id, 1, 5000));
        store.yield_on_reserve.store(true, Ordering::Relaxed);

        let (first, second) = tokio::join!(
            handle_card_webhook(&state, b"{}", "valid"),
            handle_card_webhook(&state, b"{}", "valid"),
        );
        let outcomes = [
            first.expect("first").outcome,
            second.expect("second").outcome,
        ];
        let issued = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, Some(IssuanceOutcome::Issued { .. })))
            .count();
        assert_eq!(issued, 1);
        assert!(outcomes.contains(&Some(IssuanceOutcome::AlreadyProcessed)));

        assert_eq!(store.tickets().len(), 1);
        assert_eq!(store.event(event.id).expect("event").sold_tickets, 1);
        let earnings = store.earnings_for(organizer.id, Currency::Usd).expect("earnings");
        assert_eq!(earnings.gross, 5000);
    }

    #[tokio::test]
    async fn bad_signature_is_rejected() {
        let store = MemoryStore::new();
        let state = test_state(&store);
        let err = handle_card_webhook(&state, b"{}", "t=1,v1=bad").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn ignored_and_unpaid_events_are_acknowledged() {
        let store = MemoryStore::new();
        let state = test_state(&store);
        let mut event = card_event(Uuid::new_v4(), Uuid::new_v4(), 1, 100);
        event.kind = CardWebhookKind::Ignored("charge.refunded".to_string());
        store.set_card_event(event.clone());
        let ack = handle_card_webhook(&state, b"{}", "valid").await.expect("ack");
        assert!(ack.outcome.is_none());

        event.kind = CardWebhookKind::CheckoutCompleted;
        event.paid = false;
        store.set_card_event(event);
        let ack = handle_card_webhook(&state, b"{}", "valid").await.expect("ack");
        assert!(ack.outcome.is_none());
        assert!(store.tickets().is_empty());
    }

    #[tokio::test]
    async fn sold_out_tier_releases_reservations_and_reports() {
        let store = MemoryStore::new();
        let state = test_state(&store);
        let organizer = store.seed_user("org@example.com", Role::Organizer);
        let event = store.seed_event(organizer.id, Currency::Htg, 50_000, 100);
        let open = store.seed_tier(event.id, 20_000, 50, 0);
        let full = store.seed_tier(event.id, 50_000, 100, 100);

        let outcome = issue_tickets(
            &state,
            IssuanceRequest {
                payment_id: "moncash_T1".to_string(),
                payment_method: PaymentMethod::MobileMoney,
                webhook: None,
                order_id: None,
                event_id: event.id,
                attendee_id: Uuid::new_v4(),
                lines: vec![
                    PurchaseLine { tier_id: Some(open.id), quantity: 2, unit_price: 20_000 },
                    PurchaseLine { tier_id: Some(full.id), quantity: 1, unit_price: 50_000 },
                ],
                promo_code_id: None,
                charged_amount: None,
                charged_currency: None,
                fx_rate: None,
            },
        )
        .await
        .expect("outcome");

        assert!(matches!(outcome, IssuanceOutcome::SoldOut { .. }));
        assert!(store.tickets().is_empty());
        assert_eq!(store.tier(open.id).expect("tier").sold_quantity, 0);
        assert_eq!(store.tier(full.id).expect("tier").sold_quantity, 100);
        assert_eq!(store.event(event.id).expect("event").sold_tickets, 0);
    }

    #[tokio::test]
    async fn insert_failure_aborts_and_releases_inventory() {
        let store = MemoryStore::new();
        let state = test_state(&store);
        let organizer = store.seed_user("org@example.com", Role::Organizer);
        let attendee = store.seed_user("fan@example.com", Role::Attendee);
        let event = store.seed_event(organizer.id, Currency::Usd, 5000, 100);
        store.set_card_event(card_event(event.id, attendee.id, 1, 5000));
        store.fail_ticket_insert.store(true, Ordering::Relaxed);

        let err = handle_card_webhook(&state, b"{}", "valid").await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(store.event(event.id).expect("event").sold_tickets, 0);

        // the claim is released so the gateway retry succeeds
        assert!(store.payment_claims.lock().expect("lock").is_empty());
        store.fail_ticket_insert.store(false, Ordering::Relaxed);
        handle_card_webhook(&state, b"{}", "valid").await.expect("retry");
        assert_eq!(store.tickets().len(), 1);
    }

    #[tokio::test]
    async fn side_effect_failures_do_not_fail_issuance() {
        let store = MemoryStore::new();
        let state = test_state(&store);
        let organizer = store.seed_user("org@example.com", Role::Organizer);
        let attendee = store.seed_user("fan@example.com", Role::Attendee);
        let event = store.seed_event(organizer.id, Currency::Usd, 5000, 100);
        let promo = store.seed_promo(event.id, "KREYOL", Discount::Percentage(10));
        let mut webhook = card_event(event.id, attendee.id, 1, 4500);
        webhook.metadata.promo_code_id = Some(promo.id.to_string());
        store.set_card_event(webhook);
        store.fail_earnings.store(true, Ordering::Relaxed);
        store.fail_analytics.store(true, Ordering::Relaxed);

        let ack = handle_card_webhook(&state, b"{}", "valid").await.expect("ack");
        assert!(matches!(ack.outcome, Some(IssuanceOutcome::Issued { .. })));
        assert_eq!(store.tickets()[0].price_paid, 4500);
        assert_eq!(state.metrics.side_effect_failures(), 2);
        let uses = store.promo_codes.lock().expect("lock")[&promo.id].uses;
        assert_eq!(uses, 1);
    }

    #[tokio::test]
    async fn charged_amount_is_split_across_units() {
        let store = MemoryStore::new();
        let state = test_state(&store);
        let organizer = store.seed_user("org@example.com", Role::Organizer);
        let event = store.seed_event(organizer.id, Currency::Usd, 1000, 100);

        issue_tickets(
            &state,
            IssuanceRequest {
                payment_id: "moncash_T9".to_string(),
                payment_method: PaymentMethod::MobileMoney,
                webhook: None,
                order_id: None,
                event_id: event.id,
                attendee_id: Uuid::new_v4(),
                lines: vec![PurchaseLine { tier_id: None, quantity: 3, unit_price: 1000 }],
                promo_code_id: None,
                charged_amount: Some(400_000),
                charged_currency: Some(Currency::Htg),
                fx_rate: Some(rust_decimal::Decimal::new(13_333, 2)),
            },
        )
        .await
        .expect("issued");

        let charged: Vec<i64> = store
            .tickets()
            .iter()
            .map(|t| t.charged_amount.unwrap_or_default())
            .collect();
        assert_eq!(charged.iter().sum::<i64>(), 400_000);
        assert!(charged.contains(&133_334));
    }
}
