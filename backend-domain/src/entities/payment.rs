// Payment gateway shapes: card webhooks, mobile-money lookups, side-effect payloads

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::PurchaseLine;
use crate::value_objects::{Currency, PaymentMethod, PayoutStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardWebhookKind {
    CheckoutCompleted,
    PaymentSucceeded,
    Ignored(String),
}

#[derive(Debug, Clone)]
pub struct CardWebhookEvent {
    pub id: String,
    pub kind: CardWebhookKind,
    pub payment_id: String,
    pub amount: i64,
    pub currency: Option<Currency>,
    pub paid: bool,
    pub metadata: RawPurchaseMetadata,
}

// Purchase metadata as stored on the processor side. Older checkouts wrote
// camelCase keys, newer ones snake_case; every value arrives as a string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPurchaseMetadata {
    #[serde(default, alias = "eventId")]
    pub event_id: Option<String>,
    #[serde(default, alias = "userId", alias = "attendeeId")]
    pub user_id: Option<String>,
    #[serde(default, alias = "tierId")]
    pub tier_id: Option<String>,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default, alias = "unitPrice")]
    pub unit_price: Option<String>,
    #[serde(default)]
    pub items: Option<String>,
    #[serde(default, alias = "promoCodeId")]
    pub promo_code_id: Option<String>,
    #[serde(default, alias = "fxRate", alias = "exchangeRate")]
    pub fx_rate: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseMetadata {
    pub event_id: Uuid,
    pub attendee_id: Uuid,
    pub lines: Vec<PurchaseLine>,
    pub promo_code_id: Option<Uuid>,
    pub fx_rate: Option<Decimal>,
}

impl RawPurchaseMetadata {
    // `amount_total` is what the processor collected; it is only used to infer a
    // unit price for legacy single-tier checkouts that did not record one.
    pub fn normalize(&self, amount_total: i64) -> Result<PurchaseMetadata> {
        let event_id = parse_required_uuid(self.event_id.as_deref(), "event_id")?;
        let attendee_id = parse_required_uuid(self.user_id.as_deref(), "user_id")?;
        let promo_code_id = parse_optional_uuid(self.promo_code_id.as_deref(), "promo_code_id")?;
        let fx_rate = non_empty(self.fx_rate.as_deref())
            .map(|raw| raw.parse::<Decimal>())
            .transpose()
            .context("invalid fx_rate")?
            .filter(|rate| *rate > Decimal::ZERO);

        let lines = if let Some(items) = non_empty(self.items.as_deref()) {
            let lines: Vec<PurchaseLine> =
                serde_json::from_str(items).context("invalid items metadata")?;
            if lines.is_empty() || lines.iter().any(|line| line.quantity == 0) {
                return Err(anyhow!("items metadata must list positive quantities"));
            }
            lines
        } else {
            let quantity = match non_empty(self.quantity.as_deref()) {
                Some(raw) => raw.parse::<u32>().context("invalid quantity")?,
                None => 1,
            };
            if quantity == 0 {
                return Err(anyhow!("quantity must be positive"));
            }
            let unit_price = match non_empty(self.unit_price.as_deref()) {
                Some(raw) => raw.parse::<i64>().context("invalid unit_price")?,
                None => infer_unit_price(amount_total, quantity, fx_rate),
            };
            vec![PurchaseLine {
                tier_id: parse_optional_uuid(self.tier_id.as_deref(), "tier_id")?,
                quantity,
                unit_price,
            }]
        };

        Ok(PurchaseMetadata {
            event_id,
            attendee_id,
            lines,
            promo_code_id,
            fx_rate,
        })
    }
}

fn infer_unit_price(amount_total: i64, quantity: u32, fx_rate: Option<Decimal>) -> i64 {
    let in_event_currency = match fx_rate {
        Some(rate) => crate::utils::round_to_minor(Decimal::from(amount_total) / rate),
        None => amount_total,
    };
    in_event_currency / i64::from(quantity)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|raw| !raw.is_empty())
}

fn parse_required_uuid(value: Option<&str>, field: &str) -> Result<Uuid> {
    let raw = non_empty(value).ok_or_else(|| anyhow!("metadata field '{}' is missing", field))?;
    Uuid::parse_str(raw).with_context(|| format!("metadata field '{}' is not a uuid", field))
}

fn parse_optional_uuid(value: Option<&str>, field: &str) -> Result<Option<Uuid>> {
    non_empty(value)
        .map(|raw| {
            Uuid::parse_str(raw).with_context(|| format!("metadata field '{}' is not a uuid", field))
        })
        .transpose()
}

#[derive(Debug, Clone)]
pub struct CardCheckoutRequest {
    pub event_title: String,
    pub currency: Currency,
    pub total: i64,
    pub quantity: u32,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: RawPurchaseMetadata,
}

#[derive(Debug, Clone)]
pub struct CardCheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobileMoneyPayment {
    pub transaction_id: String,
    pub order_id: String,
    pub amount: i64,
    pub successful: bool,
    pub payer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MobileMoneyReturnQuery {
    #[serde(default, alias = "transactionId")]
    pub transaction_id: Option<String>,
    #[serde(default, alias = "orderId")]
    pub order_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SaleRecord {
    pub payment_id: String,
    pub event_id: Uuid,
    pub organizer_id: Uuid,
    pub attendee_id: Uuid,
    pub payment_method: PaymentMethod,
    pub currency: Currency,
    pub quantity: u32,
    pub gross: i64,
    pub net: i64,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TicketNotice {
    pub attendee_email: String,
    pub attendee_name: Option<String>,
    pub phone: Option<String>,
    pub push_tokens: Vec<String>,
    pub channels: crate::entities::NotificationPrefs,
    pub event_title: String,
    pub starts_at: DateTime<Utc>,
    pub venue: String,
    pub ticket_ids: Vec<Uuid>,
    pub qr_payloads: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PayoutNotice {
    pub organizer_email: String,
    pub payout_id: Uuid,
    pub amount: i64,
    pub currency: Currency,
    pub status: PayoutStatus,
    pub note: Option<String>,
}
