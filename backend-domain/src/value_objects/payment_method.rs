// Payment rail value object

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    MobileMoney,
    Free,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::MobileMoney => "mobile_money",
            PaymentMethod::Free => "free",
        }
    }
}

// Legacy rows recorded the provider name instead of the rail.
impl From<&str> for PaymentMethod {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "card" | "stripe" => PaymentMethod::Card,
            "mobile_money" | "moncash" | "mobilemoney" => PaymentMethod::MobileMoney,
            _ => PaymentMethod::Free,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutMethod {
    Bank,
    MobileMoney,
}

impl PayoutMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutMethod::Bank => "bank",
            PayoutMethod::MobileMoney => "mobile_money",
        }
    }
}

impl From<&str> for PayoutMethod {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "mobile_money" | "moncash" => PayoutMethod::MobileMoney,
            _ => PayoutMethod::Bank,
        }
    }
}
