use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entities::{
    EarningsDelta, Event, OrganizerEarnings, Payout, PayoutAuditEntry, PendingStatusUpdate,
    PendingTransaction, PromoCode, SuspiciousActivity, Ticket, TicketTier, User,
};
use crate::value_objects::{PayoutStatus, Role, TicketStatus};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn update_role(&self, id: Uuid, role: Role) -> anyhow::Result<bool>;
    async fn set_verified(&self, id: Uuid, verified: bool) -> anyhow::Result<bool>;
    async fn count_users(&self) -> anyhow::Result<u64>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn insert_event(&self, event: &Event) -> anyhow::Result<()>;
    async fn find_event(&self, id: Uuid) -> anyhow::Result<Option<Event>>;
    async fn set_published(&self, id: Uuid, published: bool) -> anyhow::Result<bool>;
    async fn list_events_by_organizer(&self, organizer_id: Uuid) -> anyhow::Result<Vec<Event>>;
    async fn search_published(&self, query: &str, limit: usize) -> anyhow::Result<Vec<Event>>;
    async fn count_events(&self) -> anyhow::Result<u64>;

    async fn insert_tier(&self, tier: &TicketTier) -> anyhow::Result<()>;
    async fn list_tiers(&self, event_id: Uuid) -> anyhow::Result<Vec<TicketTier>>;

    // Atomically adds `quantity` to the tier (or general admission) sold counter
    // and the event sold counter, only when the result stays within inventory.
    // Returns false and changes nothing when inventory is insufficient.
    async fn reserve_inventory(
        &self,
        event_id: Uuid,
        tier_id: Option<Uuid>,
        quantity: u32,
    ) -> anyhow::Result<bool>;
    async fn release_inventory(
        &self,
        event_id: Uuid,
        tier_id: Option<Uuid>,
        quantity: u32,
    ) -> anyhow::Result<()>;

    async fn ping(&self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn insert_tickets(&self, tickets: &[Ticket]) -> anyhow::Result<()>;
    async fn exists_for_payment(&self, payment_id: &str) -> anyhow::Result<bool>;
    async fn find_ticket(&self, id: Uuid) -> anyhow::Result<Option<Ticket>>;
    async fn list_by_event(&self, event_id: Uuid) -> anyhow::Result<Vec<Ticket>>;
    // Sets `checked_in_at` only when it is still empty.
    async fn mark_checked_in(&self, id: Uuid, at: DateTime<Utc>) -> anyhow::Result<bool>;
    async fn update_status(&self, id: Uuid, status: TicketStatus) -> anyhow::Result<bool>;
    async fn count_tickets(&self) -> anyhow::Result<u64>;
}

#[async_trait]
pub trait PayoutRepository: Send + Sync {
    async fn insert_payout(&self, payout: &Payout) -> anyhow::Result<()>;
    async fn find_payout(&self, id: Uuid) -> anyhow::Result<Option<Payout>>;
    // Persists `payout` only if the stored status still equals `expected`, and
    // appends the audit entry in the same unit of work.
    async fn update_payout(
        &self,
        payout: &Payout,
        expected: PayoutStatus,
        audit: &PayoutAuditEntry,
    ) -> anyhow::Result<bool>;
    async fn list_by_organizer(&self, organizer_id: Uuid) -> anyhow::Result<Vec<Payout>>;
    async fn list_by_status(
        &self,
        status: Option<PayoutStatus>,
        limit: usize,
    ) -> anyhow::Result<Vec<Payout>>;
    async fn list_audit(&self, payout_id: Uuid) -> anyhow::Result<Vec<PayoutAuditEntry>>;
    async fn count_pending(&self) -> anyhow::Result<u64>;
}

#[async_trait]
pub trait PromoCodeRepository: Send + Sync {
    async fn insert_promo_code(&self, promo: &PromoCode) -> anyhow::Result<()>;
    async fn find_promo_code(&self, id: Uuid) -> anyhow::Result<Option<PromoCode>>;
    async fn find_by_code(&self, event_id: Uuid, code: &str) -> anyhow::Result<Option<PromoCode>>;
    async fn list_by_event(&self, event_id: Uuid) -> anyhow::Result<Vec<PromoCode>>;
    async fn set_active(&self, id: Uuid, active: bool) -> anyhow::Result<bool>;
    async fn increment_usage(&self, id: Uuid, by: u32) -> anyhow::Result<()>;
}

#[async_trait]
pub trait PendingTransactionRepository: Send + Sync {
    async fn insert_pending(&self, pending: &PendingTransaction) -> anyhow::Result<()>;
    async fn find_pending(&self, order_id: &str) -> anyhow::Result<Option<PendingTransaction>>;
    async fn set_gateway_token(&self, order_id: &str, token: &str) -> anyhow::Result<()>;
    async fn find_by_gateway_token(&self, token: &str)
        -> anyhow::Result<Option<PendingTransaction>>;
    async fn update_pending_status(
        &self,
        order_id: &str,
        update: &PendingStatusUpdate,
    ) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait SuspiciousActivityRepository: Send + Sync {
    async fn insert_activity(&self, activity: &SuspiciousActivity) -> anyhow::Result<()>;
    async fn list_activities(
        &self,
        reviewed: Option<bool>,
        limit: usize,
    ) -> anyhow::Result<Vec<SuspiciousActivity>>;
    async fn mark_reviewed(&self, id: Uuid, reviewer: Uuid) -> anyhow::Result<bool>;
    async fn count_unreviewed(&self) -> anyhow::Result<u64>;
}

#[async_trait]
pub trait EarningsRepository: Send + Sync {
    async fn credit(&self, organizer_id: Uuid, delta: &EarningsDelta) -> anyhow::Result<()>;
    async fn list_for_organizer(&self, organizer_id: Uuid)
        -> anyhow::Result<Vec<OrganizerEarnings>>;
    async fn replace_for_organizer(
        &self,
        organizer_id: Uuid,
        rows: &[OrganizerEarnings],
    ) -> anyhow::Result<()>;
}

#[async_trait]
pub trait WebhookReceiptRepository: Send + Sync {
    async fn has_receipt(&self, provider: &str, event_id: &str) -> anyhow::Result<bool>;
    async fn record_receipt(&self, provider: &str, event_id: &str) -> anyhow::Result<()>;
    // false when another delivery already holds the payment
    async fn claim_payment(&self, payment_id: &str) -> anyhow::Result<bool>;
    async fn release_payment(&self, payment_id: &str) -> anyhow::Result<()>;
}
