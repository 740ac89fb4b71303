// Payout (withdrawal) entity and admin action payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value_objects::{Currency, PayoutMethod, PayoutStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payout {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub amount: i64,
    pub currency: Currency,
    pub method: PayoutMethod,
    pub destination: String,
    pub status: PayoutStatus,
    pub decline_reason: Option<String>,
    pub failure_reason: Option<String>,
    pub payment_reference: Option<String>,
    pub receipt_url: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutAuditEntry {
    pub payout_id: Uuid,
    pub actor_id: Uuid,
    pub from_status: PayoutStatus,
    pub to_status: PayoutStatus,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct PayoutRequest {
    pub amount: i64,
    pub currency: Currency,
    pub method: PayoutMethod,
    pub destination: String,
    pub scheduled_for: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct PayoutListQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DeclinePayoutRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct FailPayoutRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct MarkPaidRequest {
    pub payment_reference: Option<String>,
    pub receipt_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PayoutDetail {
    pub payout: Payout,
    pub audit: Vec<PayoutAuditEntry>,
}
