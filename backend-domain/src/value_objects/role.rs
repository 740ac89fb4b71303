// User role value object
// Admin is not a stored role: it is granted by the configured email allowlist.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Attendee,
    Organizer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Attendee => "attendee",
            Role::Organizer => "organizer",
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "organizer" => Role::Organizer,
            _ => Role::Attendee,
        }
    }
}
