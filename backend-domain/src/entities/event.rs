// Event and ticket tier entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value_objects::Currency;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub currency: Currency,
    pub ticket_price: i64,
    pub total_tickets: i32,
    pub sold_tickets: i32,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn remaining_tickets(&self) -> i32 {
        (self.total_tickets - self.sold_tickets).max(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketTier {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub price: i64,
    pub total_quantity: i32,
    pub sold_quantity: i32,
    pub sales_start: Option<DateTime<Utc>>,
    pub sales_end: Option<DateTime<Utc>>,
}

impl TicketTier {
    pub fn remaining(&self) -> i32 {
        (self.total_quantity - self.sold_quantity).max(0)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub currency: Currency,
    #[serde(default)]
    pub ticket_price: i64,
    #[serde(default)]
    pub total_tickets: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateTierRequest {
    pub name: String,
    pub price: i64,
    pub total_quantity: i32,
    pub sales_start: Option<DateTime<Utc>>,
    pub sales_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct EventSearchQuery {
    pub q: Option<String>,
    pub limit: Option<usize>,
}
