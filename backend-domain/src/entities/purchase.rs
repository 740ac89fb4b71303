// Cart, priced cart and issuance shapes shared by both payment rails

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value_objects::{Currency, PaymentMethod};

#[derive(Debug, Clone, Deserialize)]
pub struct CartItem {
    pub tier_id: Option<Uuid>,
    pub quantity: u32,
}

// Accepts the single-tier shape (`tier_id` + `quantity`) and the multi-tier
// shape (`items`).
#[derive(Debug, Clone, Deserialize)]
pub struct CartRequest {
    pub event_id: Uuid,
    #[serde(default)]
    pub tier_id: Option<Uuid>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub items: Option<Vec<CartItem>>,
    #[serde(default)]
    pub promo_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub tier_id: Option<Uuid>,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub tier_id: Option<Uuid>,
    pub quantity: u32,
    pub unit_price: i64,
}

impl PurchaseLine {
    pub fn subtotal(&self) -> Option<i64> {
        self.unit_price.checked_mul(i64::from(self.quantity))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PricedCart {
    pub event_id: Uuid,
    pub currency: Currency,
    pub lines: Vec<PurchaseLine>,
    pub promo_code_id: Option<Uuid>,
    pub subtotal: i64,
    pub discount: i64,
    pub total: i64,
}

impl PricedCart {
    pub fn quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRef {
    pub provider: String,
    pub event_id: String,
}

#[derive(Debug, Clone)]
pub struct IssuanceRequest {
    pub payment_id: String,
    pub payment_method: PaymentMethod,
    pub webhook: Option<WebhookRef>,
    pub order_id: Option<String>,
    pub event_id: Uuid,
    pub attendee_id: Uuid,
    pub lines: Vec<PurchaseLine>,
    pub promo_code_id: Option<Uuid>,
    pub charged_amount: Option<i64>,
    pub charged_currency: Option<Currency>,
    pub fx_rate: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum IssuanceOutcome {
    Issued { ticket_ids: Vec<Uuid> },
    AlreadyProcessed,
    SoldOut { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckoutRedirect {
    Redirect {
        url: String,
    },
    FormPost {
        action: String,
        fields: Vec<(String, String)>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct MobileMoneyCheckout {
    pub order_id: String,
    pub amount: i64,
    pub currency: Currency,
    pub charged_amount: i64,
    pub fx_rate: Option<Decimal>,
    pub redirect: CheckoutRedirect,
    #[serde(skip)]
    pub gateway_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CardCheckout {
    Redirect { session_id: String, url: String },
    Issued { ticket_ids: Vec<Uuid> },
}
