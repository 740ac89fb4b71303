// Ticket status value object

use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Valid,
    Confirmed,
    Cancelled,
    Refunded,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Valid => "valid",
            TicketStatus::Confirmed => "confirmed",
            TicketStatus::Cancelled => "cancelled",
            TicketStatus::Refunded => "refunded",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, TicketStatus::Valid | TicketStatus::Confirmed)
    }
}

impl FromStr for TicketStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "valid" | "active" => Ok(TicketStatus::Valid),
            "confirmed" => Ok(TicketStatus::Confirmed),
            "cancelled" | "canceled" => Ok(TicketStatus::Cancelled),
            "refunded" => Ok(TicketStatus::Refunded),
            other => Err(anyhow!("unknown ticket status '{}'", other)),
        }
    }
}
