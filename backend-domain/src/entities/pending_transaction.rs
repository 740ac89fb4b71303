// Pending mobile-money transaction, persisted before redirecting to the gateway

use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::PurchaseLine;
use crate::value_objects::Currency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    Pending,
    Completed,
    Failed,
    NeedsRefund,
}

impl PendingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingStatus::Pending => "pending",
            PendingStatus::Completed => "completed",
            PendingStatus::Failed => "failed",
            PendingStatus::NeedsRefund => "needs_refund",
        }
    }
}

impl FromStr for PendingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(PendingStatus::Pending),
            "completed" => Ok(PendingStatus::Completed),
            "failed" => Ok(PendingStatus::Failed),
            "needs_refund" => Ok(PendingStatus::NeedsRefund),
            other => Err(anyhow!("unknown pending status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub order_id: String,
    pub event_id: Uuid,
    pub attendee_id: Uuid,
    pub lines: Vec<PurchaseLine>,
    pub promo_code_id: Option<Uuid>,
    pub amount: i64,
    pub currency: Currency,
    pub charged_amount: i64,
    pub fx_rate: Option<Decimal>,
    pub gateway_token: Option<String>,
    pub status: PendingStatus,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingStatusUpdate {
    pub status: PendingStatus,
    pub transaction_id: Option<String>,
}
