// Promo code entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Discount {
    Percentage(i64),
    Fixed(i64),
}

impl Discount {
    pub fn kind(&self) -> &'static str {
        match self {
            Discount::Percentage(_) => "percentage",
            Discount::Fixed(_) => "fixed",
        }
    }

    pub fn value(&self) -> i64 {
        match self {
            Discount::Percentage(value) | Discount::Fixed(value) => *value,
        }
    }

    pub fn from_parts(kind: &str, value: i64) -> Option<Self> {
        match kind.trim().to_lowercase().as_str() {
            "percentage" | "percent" => Some(Discount::Percentage(value)),
            "fixed" | "amount" => Some(Discount::Fixed(value)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoCode {
    pub id: Uuid,
    pub event_id: Uuid,
    pub code: String,
    pub discount: Discount,
    pub max_uses: Option<i32>,
    pub uses: i32,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePromoCodeRequest {
    pub code: String,
    pub discount: Discount,
    pub max_uses: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct PromoCodeToggleRequest {
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct ValidatePromoCodeRequest {
    pub event_id: Uuid,
    pub code: String,
    pub tier_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct PromoCodeValidation {
    pub promo_code_id: Uuid,
    pub code: String,
    pub discount: Discount,
    pub original_price: i64,
    pub discounted_price: i64,
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
