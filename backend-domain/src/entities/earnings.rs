// Organizer earnings ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value_objects::Currency;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizerEarnings {
    pub organizer_id: Uuid,
    pub currency: Currency,
    pub gross: i64,
    pub platform_fees: i64,
    pub processing_fees: i64,
    pub net: i64,
    pub tickets_sold: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EarningsDelta {
    pub currency: Currency,
    pub gross: i64,
    pub platform_fees: i64,
    pub processing_fees: i64,
    pub net: i64,
    pub tickets_sold: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EarningsBalance {
    pub currency: Currency,
    pub gross: i64,
    pub platform_fees: i64,
    pub processing_fees: i64,
    pub net: i64,
    pub tickets_sold: i64,
    pub committed_payouts: i64,
    pub available: i64,
}
