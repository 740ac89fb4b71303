// Severity of a security review record

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

impl From<&str> for Severity {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "LOW" => Severity::Low,
            "HIGH" => Severity::High,
            _ => Severity::Medium,
        }
    }
}
