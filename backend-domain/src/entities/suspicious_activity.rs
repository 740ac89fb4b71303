// Security review record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value_objects::Severity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousActivity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub severity: Severity,
    pub details: String,
    pub reviewed: bool,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl SuspiciousActivity {
    pub fn new(user_id: Uuid, kind: &str, severity: Severity, details: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind: kind.to_string(),
            severity,
            details,
            reviewed: false,
            reviewed_by: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SuspiciousActivityQuery {
    pub reviewed: Option<bool>,
    pub limit: Option<usize>,
}
