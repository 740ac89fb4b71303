// Payout status value object

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Approved,
    Processing,
    Completed,
    Declined,
    Failed,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Approved => "approved",
            PayoutStatus::Processing => "processing",
            PayoutStatus::Completed => "completed",
            PayoutStatus::Declined => "declined",
            PayoutStatus::Failed => "failed",
        }
    }

    pub fn holds_funds(&self) -> bool {
        !matches!(self, PayoutStatus::Declined | PayoutStatus::Failed)
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayoutStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(PayoutStatus::Pending),
            "approved" => Ok(PayoutStatus::Approved),
            "processing" => Ok(PayoutStatus::Processing),
            "completed" | "paid" => Ok(PayoutStatus::Completed),
            "declined" | "rejected" => Ok(PayoutStatus::Declined),
            "failed" => Ok(PayoutStatus::Failed),
            other => Err(anyhow!("unknown payout status '{}'", other)),
        }
    }
}
