// Ticket entity
// price_paid and currency are written once at issuance and never updated.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value_objects::{Currency, PaymentMethod, TicketStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub tier_id: Option<Uuid>,
    pub attendee_id: Uuid,
    pub price_paid: i64,
    pub currency: Currency,
    pub payment_method: PaymentMethod,
    pub payment_id: Option<String>,
    pub status: TicketStatus,
    pub qr_payload: String,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub charged_amount: Option<i64>,
    pub charged_currency: Option<Currency>,
    pub fx_rate: Option<Decimal>,
    pub promo_code_id: Option<Uuid>,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    pub qr_payload: String,
}

#[derive(Debug, Serialize)]
pub struct CheckInResult {
    pub ticket_id: Uuid,
    pub attendee_id: Uuid,
    pub tier_id: Option<Uuid>,
    pub checked_in_at: DateTime<Utc>,
}
