// User entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value_objects::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPrefs {
    pub email: bool,
    pub whatsapp: bool,
    pub push: bool,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            email: true,
            whatsapp: false,
            push: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub verified: bool,
    pub notification_prefs: NotificationPrefs,
    #[serde(default)]
    pub push_tokens: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self, admin_emails: &[String]) -> bool {
        let email = self.email.trim().to_lowercase();
        !email.is_empty() && admin_emails.iter().any(|candidate| *candidate == email)
    }

    pub fn is_organizer(&self) -> bool {
        self.role == Role::Organizer
    }
}

#[derive(Debug, Deserialize)]
pub struct RoleUpdateRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct VerificationUpdateRequest {
    pub verified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: None,
            phone: None,
            role: Role::Attendee,
            verified: true,
            notification_prefs: NotificationPrefs::default(),
            push_tokens: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn admin_allowlist_match_ignores_case() {
        let admins = vec!["ops@eventhaiti.com".to_string()];
        assert!(user("Ops@EventHaiti.com").is_admin(&admins));
        assert!(!user("someone@eventhaiti.com").is_admin(&admins));
        assert!(!user("").is_admin(&admins));
    }
}
