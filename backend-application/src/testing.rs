// In-memory port implementations for workflow and router tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use backend_domain::*;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::auth::sign_session_token;
use crate::{AppState, Metrics};

pub const TEST_SESSION_SECRET: &str = "test-session-secret";
pub const TEST_ADMIN_EMAIL: &str = "admin@eventhaiti.test";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct MemoryStore {
    pub users: Mutex<HashMap<Uuid, User>>,
    pub events: Mutex<HashMap<Uuid, Event>>,
    pub tiers: Mutex<HashMap<Uuid, TicketTier>>,
    pub tickets: Mutex<Vec<Ticket>>,
    pub payouts: Mutex<HashMap<Uuid, Payout>>,
    pub payout_audit: Mutex<Vec<PayoutAuditEntry>>,
    pub promo_codes: Mutex<HashMap<Uuid, PromoCode>>,
    pub pending: Mutex<HashMap<String, PendingTransaction>>,
    pub activities: Mutex<Vec<SuspiciousActivity>>,
    pub earnings: Mutex<HashMap<(Uuid, Currency), OrganizerEarnings>>,
    pub receipts: Mutex<HashSet<(String, String)>>,
    pub payment_claims: Mutex<HashSet<String>>,
    pub yield_on_reserve: AtomicBool,
    pub fail_ticket_insert: AtomicBool,
    pub fail_counts: AtomicBool,
    pub fail_earnings: AtomicBool,
    pub fail_analytics: AtomicBool,

    pub card_event: Mutex<Option<CardWebhookEvent>>,
    pub card_sessions: Mutex<Vec<CardCheckoutRequest>>,
    pub mobile_money_token_fails: AtomicBool,
    pub mobile_money_payments: Mutex<Vec<MobileMoneyPayment>>,
    pub mobile_money_lookup_fails: AtomicBool,
    pub usd_htg_rate: Mutex<Option<Decimal>>,
    pub ticket_notices: Mutex<Vec<TicketNotice>>,
    pub payout_notices: Mutex<Vec<PayoutNotice>>,
    pub sales: Mutex<Vec<SaleRecord>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        let store = Self::default();
        *lock(&store.usd_htg_rate) = Some(Decimal::new(13_000, 2));
        Arc::new(store)
    }

    pub fn seed_user(&self, email: &str, role: Role) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: Some(email.split('@').next().unwrap_or(email).to_string()),
            phone: Some("+50937000000".to_string()),
            role,
            verified: true,
            notification_prefs: NotificationPrefs::default(),
            push_tokens: Vec::new(),
            created_at: Utc::now(),
        };
        lock(&self.users).insert(user.id, user.clone());
        user
    }

    pub fn seed_event(&self, organizer_id: Uuid, currency: Currency, ticket_price: i64, total: i32) -> Event {
        let event = Event {
            id: Uuid::new_v4(),
            organizer_id,
            title: "Festival Lakay".to_string(),
            description: None,
            venue: "Cap-Haitien".to_string(),
            starts_at: Utc::now() + Duration::days(14),
            ends_at: None,
            currency,
            ticket_price,
            total_tickets: total,
            sold_tickets: 0,
            published: true,
            created_at: Utc::now(),
        };
        lock(&self.events).insert(event.id, event.clone());
        event
    }

    pub fn seed_tier(&self, event_id: Uuid, price: i64, total: i32, sold: i32) -> TicketTier {
        let tier = TicketTier {
            id: Uuid::new_v4(),
            event_id,
            name: "VIP".to_string(),
            price,
            total_quantity: total,
            sold_quantity: sold,
            sales_start: None,
            sales_end: None,
        };
        lock(&self.tiers).insert(tier.id, tier.clone());
        tier
    }

    pub fn seed_promo(&self, event_id: Uuid, code: &str, discount: Discount) -> PromoCode {
        let promo = PromoCode {
            id: Uuid::new_v4(),
            event_id,
            code: code.to_string(),
            discount,
            max_uses: None,
            uses: 0,
            active: true,
            expires_at: None,
            created_at: Utc::now(),
        };
        lock(&self.promo_codes).insert(promo.id, promo.clone());
        promo
    }

    pub fn seed_earnings(&self, organizer_id: Uuid, currency: Currency, net: i64) {
        lock(&self.earnings).insert(
            (organizer_id, currency),
            OrganizerEarnings {
                organizer_id,
                currency,
                gross: net,
                platform_fees: 0,
                processing_fees: 0,
                net,
                tickets_sold: 1,
                updated_at: Utc::now(),
            },
        );
    }

    pub fn seed_payout(&self, organizer_id: Uuid, amount: i64, status: PayoutStatus) -> Payout {
        let now = Utc::now();
        let payout = Payout {
            id: Uuid::new_v4(),
            organizer_id,
            amount,
            currency: Currency::Htg,
            method: PayoutMethod::MobileMoney,
            destination: "+50937000000".to_string(),
            status,
            decline_reason: None,
            failure_reason: None,
            payment_reference: None,
            receipt_url: None,
            scheduled_for: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        lock(&self.payouts).insert(payout.id, payout.clone());
        payout
    }

    pub fn tickets(&self) -> Vec<Ticket> {
        lock(&self.tickets).clone()
    }

    pub fn event(&self, id: Uuid) -> Option<Event> {
        lock(&self.events).get(&id).cloned()
    }

    pub fn tier(&self, id: Uuid) -> Option<TicketTier> {
        lock(&self.tiers).get(&id).cloned()
    }

    pub fn pending(&self, order_id: &str) -> Option<PendingTransaction> {
        lock(&self.pending).get(order_id).cloned()
    }

    pub fn earnings_for(&self, organizer_id: Uuid, currency: Currency) -> Option<OrganizerEarnings> {
        lock(&self.earnings).get(&(organizer_id, currency)).cloned()
    }

    pub fn set_card_event(&self, event: CardWebhookEvent) {
        *lock(&self.card_event) = Some(event);
    }

    pub fn add_mobile_money_payment(&self, payment: MobileMoneyPayment) {
        lock(&self.mobile_money_payments).push(payment);
    }

    fn counts_fail(&self) -> Result<()> {
        if self.fail_counts.load(Ordering::Relaxed) {
            Err(anyhow!("count query failed"))
        } else {
            Ok(())
        }
    }
}

pub fn test_config() -> RuntimeConfig {
    RuntimeConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        public_base_url: "https://eventhaiti.test".to_string(),
        session_secret: TEST_SESSION_SECRET.to_string(),
        qr_secret: "test-qr-secret".to_string(),
        admin_emails: vec![TEST_ADMIN_EMAIL.to_string()],
        fees: FeeSchedule::default(),
        usd_htg_spread: Decimal::new(250, 2),
        fallback_usd_htg_rate: Decimal::from(135),
        order_cookie_max_age_seconds: 1800,
        max_tickets_per_order: 10,
        minimum_payout_minor: 5000,
        max_body_bytes: 1024 * 1024,
        request_timeout_seconds: 30,
        cors_allowed_origins: Vec::new(),
    }
}

pub fn test_state(store: &Arc<MemoryStore>) -> AppState {
    AppState {
        config: test_config(),
        user_repo: store.clone(),
        event_repo: store.clone(),
        ticket_repo: store.clone(),
        payout_repo: store.clone(),
        promo_repo: store.clone(),
        pending_repo: store.clone(),
        suspicious_repo: store.clone(),
        earnings_repo: store.clone(),
        receipt_repo: store.clone(),
        card_gateway: store.clone(),
        mobile_money_gateway: store.clone(),
        fx_provider: store.clone(),
        notification_service: store.clone(),
        analytics_mirror: store.clone(),
        health_service: store.clone(),
        metrics: Arc::new(Metrics::default()),
    }
}

pub fn bearer_for(user: &User) -> String {
    let expires = Utc::now().timestamp() + 3600;
    sign_session_token(TEST_SESSION_SECRET, user.id, expires).unwrap_or_default()
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(lock(&self.users).get(&id).cloned())
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<bool> {
        Ok(lock(&self.users)
            .get_mut(&id)
            .map(|user| user.role = role)
            .is_some())
    }

    async fn set_verified(&self, id: Uuid, verified: bool) -> Result<bool> {
        Ok(lock(&self.users)
            .get_mut(&id)
            .map(|user| user.verified = verified)
            .is_some())
    }

    async fn count_users(&self) -> Result<u64> {
        self.counts_fail()?;
        Ok(lock(&self.users).len() as u64)
    }
}

#[async_trait]
impl EventRepository for MemoryStore {
    async fn insert_event(&self, event: &Event) -> Result<()> {
        lock(&self.events).insert(event.id, event.clone());
        Ok(())
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>> {
        Ok(self.event(id))
    }

    async fn set_published(&self, id: Uuid, published: bool) -> Result<bool> {
        Ok(lock(&self.events)
            .get_mut(&id)
            .map(|event| event.published = published)
            .is_some())
    }

    async fn list_events_by_organizer(&self, organizer_id: Uuid) -> Result<Vec<Event>> {
        Ok(lock(&self.events)
            .values()
            .filter(|event| event.organizer_id == organizer_id)
            .cloned()
            .collect())
    }

    async fn search_published(&self, query: &str, limit: usize) -> Result<Vec<Event>> {
        let needle = query.to_lowercase();
        let mut found: Vec<Event> = lock(&self.events)
            .values()
            .filter(|event| event.published)
            .filter(|event| {
                event.title.to_lowercase().contains(&needle)
                    || event.venue.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        found.sort_by_key(|event| event.starts_at);
        found.truncate(limit);
        Ok(found)
    }

    async fn count_events(&self) -> Result<u64> {
        self.counts_fail()?;
        Ok(lock(&self.events).len() as u64)
    }

    async fn insert_tier(&self, tier: &TicketTier) -> Result<()> {
        lock(&self.tiers).insert(tier.id, tier.clone());
        Ok(())
    }

    async fn list_tiers(&self, event_id: Uuid) -> Result<Vec<TicketTier>> {
        Ok(lock(&self.tiers)
            .values()
            .filter(|tier| tier.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn reserve_inventory(&self, event_id: Uuid, tier_id: Option<Uuid>, quantity: u32) -> Result<bool> {
        // stands in for the database round trip so concurrent callers interleave
        if self.yield_on_reserve.load(Ordering::Relaxed) {
            tokio::task::yield_now().await;
        }
        let quantity = quantity as i32;
        let mut events = lock(&self.events);
        let mut tiers = lock(&self.tiers);
        let Some(event) = events.get_mut(&event_id) else {
            return Ok(false);
        };
        match tier_id {
            Some(tier_id) => {
                let Some(tier) = tiers.get_mut(&tier_id).filter(|t| t.event_id == event_id) else {
                    return Ok(false);
                };
                if tier.sold_quantity + quantity > tier.total_quantity {
                    return Ok(false);
                }
                tier.sold_quantity += quantity;
            }
            None => {
                if event.sold_tickets + quantity > event.total_tickets {
                    return Ok(false);
                }
            }
        }
        event.sold_tickets += quantity;
        Ok(true)
    }

    async fn release_inventory(&self, event_id: Uuid, tier_id: Option<Uuid>, quantity: u32) -> Result<()> {
        let quantity = quantity as i32;
        if let Some(tier_id) = tier_id {
            if let Some(tier) = lock(&self.tiers).get_mut(&tier_id) {
                tier.sold_quantity = (tier.sold_quantity - quantity).max(0);
            }
        }
        if let Some(event) = lock(&self.events).get_mut(&event_id) {
            event.sold_tickets = (event.sold_tickets - quantity).max(0);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl TicketRepository for MemoryStore {
    async fn insert_tickets(&self, tickets: &[Ticket]) -> Result<()> {
        if self.fail_ticket_insert.load(Ordering::Relaxed) {
            return Err(anyhow!("ticket insert failed"));
        }
        lock(&self.tickets).extend_from_slice(tickets);
        Ok(())
    }

    async fn exists_for_payment(&self, payment_id: &str) -> Result<bool> {
        Ok(lock(&self.tickets)
            .iter()
            .any(|ticket| ticket.payment_id.as_deref() == Some(payment_id)))
    }

    async fn find_ticket(&self, id: Uuid) -> Result<Option<Ticket>> {
        Ok(lock(&self.tickets).iter().find(|t| t.id == id).cloned())
    }

    async fn list_by_event(&self, event_id: Uuid) -> Result<Vec<Ticket>> {
        Ok(lock(&self.tickets)
            .iter()
            .filter(|t| t.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn mark_checked_in(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let mut tickets = lock(&self.tickets);
        match tickets.iter_mut().find(|t| t.id == id && t.checked_in_at.is_none()) {
            Some(ticket) => {
                ticket.checked_in_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_status(&self, id: Uuid, status: TicketStatus) -> Result<bool> {
        Ok(lock(&self.tickets)
            .iter_mut()
            .find(|t| t.id == id)
            .map(|ticket| ticket.status = status)
            .is_some())
    }

    async fn count_tickets(&self) -> Result<u64> {
        self.counts_fail()?;
        Ok(lock(&self.tickets).len() as u64)
    }
}

#[async_trait]
impl PayoutRepository for MemoryStore {
    async fn insert_payout(&self, payout: &Payout) -> Result<()> {
        lock(&self.payouts).insert(payout.id, payout.clone());
        Ok(())
    }

    async fn find_payout(&self, id: Uuid) -> Result<Option<Payout>> {
        Ok(lock(&self.payouts).get(&id).cloned())
    }

    async fn update_payout(&self, payout: &Payout, expected: PayoutStatus, audit: &PayoutAuditEntry) -> Result<bool> {
        let mut payouts = lock(&self.payouts);
        match payouts.get_mut(&payout.id) {
            Some(stored) if stored.status == expected => {
                *stored = payout.clone();
                lock(&self.payout_audit).push(audit.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_by_organizer(&self, organizer_id: Uuid) -> Result<Vec<Payout>> {
        Ok(lock(&self.payouts)
            .values()
            .filter(|p| p.organizer_id == organizer_id)
            .cloned()
            .collect())
    }

    async fn list_by_status(&self, status: Option<PayoutStatus>, limit: usize) -> Result<Vec<Payout>> {
        let mut found: Vec<Payout> = lock(&self.payouts)
            .values()
            .filter(|p| status.map_or(true, |s| p.status == s))
            .cloned()
            .collect();
        found.sort_by_key(|p| p.created_at);
        found.truncate(limit);
        Ok(found)
    }

    async fn list_audit(&self, payout_id: Uuid) -> Result<Vec<PayoutAuditEntry>> {
        Ok(lock(&self.payout_audit)
            .iter()
            .filter(|entry| entry.payout_id == payout_id)
            .cloned()
            .collect())
    }

    async fn count_pending(&self) -> Result<u64> {
        self.counts_fail()?;
        Ok(lock(&self.payouts)
            .values()
            .filter(|p| p.status == PayoutStatus::Pending)
            .count() as u64)
    }
}

#[async_trait]
impl PromoCodeRepository for MemoryStore {
    async fn insert_promo_code(&self, promo: &PromoCode) -> Result<()> {
        lock(&self.promo_codes).insert(promo.id, promo.clone());
        Ok(())
    }

    async fn find_promo_code(&self, id: Uuid) -> Result<Option<PromoCode>> {
        Ok(lock(&self.promo_codes).get(&id).cloned())
    }

    async fn find_by_code(&self, event_id: Uuid, code: &str) -> Result<Option<PromoCode>> {
        Ok(lock(&self.promo_codes)
            .values()
            .find(|p| p.event_id == event_id && p.code == code)
            .cloned())
    }

    async fn list_by_event(&self, event_id: Uuid) -> Result<Vec<PromoCode>> {
        Ok(lock(&self.promo_codes)
            .values()
            .filter(|p| p.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool> {
        Ok(lock(&self.promo_codes)
            .get_mut(&id)
            .map(|p| p.active = active)
            .is_some())
    }

    async fn increment_usage(&self, id: Uuid, by: u32) -> Result<()> {
        if let Some(promo) = lock(&self.promo_codes).get_mut(&id) {
            promo.uses += by as i32;
        }
        Ok(())
    }
}

#[async_trait]
impl PendingTransactionRepository for MemoryStore {
    async fn insert_pending(&self, pending: &PendingTransaction) -> Result<()> {
        lock(&self.pending).insert(pending.order_id.clone(), pending.clone());
        Ok(())
    }

    async fn find_pending(&self, order_id: &str) -> Result<Option<PendingTransaction>> {
        Ok(self.pending(order_id))
    }

    async fn set_gateway_token(&self, order_id: &str, token: &str) -> Result<()> {
        if let Some(pending) = lock(&self.pending).get_mut(order_id) {
            pending.gateway_token = Some(token.to_string());
        }
        Ok(())
    }

    async fn find_by_gateway_token(&self, token: &str) -> Result<Option<PendingTransaction>> {
        Ok(lock(&self.pending)
            .values()
            .find(|pending| pending.gateway_token.as_deref() == Some(token))
            .cloned())
    }

    async fn update_pending_status(&self, order_id: &str, update: &PendingStatusUpdate) -> Result<bool> {
        Ok(lock(&self.pending)
            .get_mut(order_id)
            .map(|pending| {
                pending.status = update.status;
                if update.transaction_id.is_some() {
                    pending.transaction_id = update.transaction_id.clone();
                }
            })
            .is_some())
    }
}

#[async_trait]
impl SuspiciousActivityRepository for MemoryStore {
    async fn insert_activity(&self, activity: &SuspiciousActivity) -> Result<()> {
        lock(&self.activities).push(activity.clone());
        Ok(())
    }

    async fn list_activities(&self, reviewed: Option<bool>, limit: usize) -> Result<Vec<SuspiciousActivity>> {
        Ok(lock(&self.activities)
            .iter()
            .filter(|a| reviewed.map_or(true, |r| a.reviewed == r))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_reviewed(&self, id: Uuid, reviewer: Uuid) -> Result<bool> {
        Ok(lock(&self.activities)
            .iter_mut()
            .find(|a| a.id == id)
            .map(|activity| {
                activity.reviewed = true;
                activity.reviewed_by = Some(reviewer);
            })
            .is_some())
    }

    async fn count_unreviewed(&self) -> Result<u64> {
        self.counts_fail()?;
        Ok(lock(&self.activities).iter().filter(|a| !a.reviewed).count() as u64)
    }
}

#[async_trait]
impl EarningsRepository for MemoryStore {
    async fn credit(&self, organizer_id: Uuid, delta: &EarningsDelta) -> Result<()> {
        if self.fail_earnings.load(Ordering::Relaxed) {
            return Err(anyhow!("earnings write failed"));
        }
        let mut earnings = lock(&self.earnings);
        let row = earnings
            .entry((organizer_id, delta.currency))
            .or_insert_with(|| OrganizerEarnings {
                organizer_id,
                currency: delta.currency,
                gross: 0,
                platform_fees: 0,
                processing_fees: 0,
                net: 0,
                tickets_sold: 0,
                updated_at: Utc::now(),
            });
        row.gross += delta.gross;
        row.platform_fees += delta.platform_fees;
        row.processing_fees += delta.processing_fees;
        row.net += delta.net;
        row.tickets_sold += delta.tickets_sold;
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn list_for_organizer(&self, organizer_id: Uuid) -> Result<Vec<OrganizerEarnings>> {
        let mut rows: Vec<OrganizerEarnings> = lock(&self.earnings)
            .values()
            .filter(|row| row.organizer_id == organizer_id)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.currency);
        Ok(rows)
    }

    async fn replace_for_organizer(&self, organizer_id: Uuid, rows: &[OrganizerEarnings]) -> Result<()> {
        let mut earnings = lock(&self.earnings);
        earnings.retain(|(owner, _), _| *owner != organizer_id);
        for row in rows {
            earnings.insert((organizer_id, row.currency), row.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl WebhookReceiptRepository for MemoryStore {
    async fn has_receipt(&self, provider: &str, event_id: &str) -> Result<bool> {
        Ok(lock(&self.receipts).contains(&(provider.to_string(), event_id.to_string())))
    }

    async fn record_receipt(&self, provider: &str, event_id: &str) -> Result<()> {
        lock(&self.receipts).insert((provider.to_string(), event_id.to_string()));
        Ok(())
    }

    async fn claim_payment(&self, payment_id: &str) -> Result<bool> {
        Ok(lock(&self.payment_claims).insert(payment_id.to_string()))
    }

    async fn release_payment(&self, payment_id: &str) -> Result<()> {
        lock(&self.payment_claims).remove(payment_id);
        Ok(())
    }
}

#[async_trait]
impl CardGateway for MemoryStore {
    fn verify_webhook(&self, _payload: &[u8], signature_header: &str, _now_unix: i64) -> Result<CardWebhookEvent> {
        if signature_header != "valid" {
            return Err(anyhow!("signature mismatch"));
        }
        lock(&self.card_event)
            .clone()
            .ok_or_else(|| anyhow!("no event queued"))
    }

    async fn create_checkout_session(&self, request: &CardCheckoutRequest) -> Result<CardCheckoutSession> {
        lock(&self.card_sessions).push(request.clone());
        Ok(CardCheckoutSession {
            id: "cs_test_1".to_string(),
            url: "https://checkout.test/cs_test_1".to_string(),
        })
    }
}

#[async_trait]
impl MobileMoneyGateway for MemoryStore {
    async fn create_payment(&self, order_id: &str, _amount: i64) -> Result<String> {
        if self.mobile_money_token_fails.load(Ordering::Relaxed) {
            return Err(anyhow!("oauth token request failed"));
        }
        Ok(format!("tok-{order_id}"))
    }

    fn redirect_for_token(&self, token: &str) -> CheckoutRedirect {
        CheckoutRedirect::Redirect {
            url: format!("https://gateway.test/Payment/Redirect?token={token}"),
        }
    }

    fn form_post_fallback(&self, order_id: &str, amount: i64) -> CheckoutRedirect {
        CheckoutRedirect::FormPost {
            action: "https://gateway.test/MerChantApi/Checkout".to_string(),
            fields: vec![
                ("orderId".to_string(), order_id.to_string()),
                ("amount".to_string(), format_minor(amount)),
            ],
        }
    }

    async fn retrieve_by_transaction(&self, transaction_id: &str) -> Result<Option<MobileMoneyPayment>> {
        if self.mobile_money_lookup_fails.load(Ordering::Relaxed) {
            return Err(anyhow!("gateway unavailable"));
        }
        Ok(lock(&self.mobile_money_payments)
            .iter()
            .find(|p| p.transaction_id == transaction_id)
            .cloned())
    }

    async fn retrieve_by_order(&self, order_id: &str) -> Result<Option<MobileMoneyPayment>> {
        if self.mobile_money_lookup_fails.load(Ordering::Relaxed) {
            return Err(anyhow!("gateway unavailable"));
        }
        Ok(lock(&self.mobile_money_payments)
            .iter()
            .find(|p| p.order_id == order_id)
            .cloned())
    }
}

#[async_trait]
impl FxRateProvider for MemoryStore {
    async fn usd_to_htg(&self) -> Result<Decimal> {
        (*lock(&self.usd_htg_rate)).ok_or_else(|| anyhow!("rate service down"))
    }
}

impl NotificationService for MemoryStore {
    fn spawn_ticket_confirmation(&self, notice: TicketNotice) {
        lock(&self.ticket_notices).push(notice);
    }

    fn spawn_payout_update(&self, notice: PayoutNotice) {
        lock(&self.payout_notices).push(notice);
    }
}

#[async_trait]
impl AnalyticsMirror for MemoryStore {
    async fn mirror_sale(&self, sale: &SaleRecord) -> Result<()> {
        if self.fail_analytics.load(Ordering::Relaxed) {
            return Err(anyhow!("analytics insert failed"));
        }
        lock(&self.sales).push(sale.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl HealthCheckService for MemoryStore {
    async fn check_database(&self) -> Result<bool> {
        Ok(true)
    }

    async fn check_analytics(&self) -> Result<bool> {
        Ok(!self.fail_analytics.load(Ordering::Relaxed))
    }
}
