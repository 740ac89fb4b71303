// Runtime configuration handed to the application layer

use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    pub platform_fee_bps: u32,
    pub card_fee_bps: u32,
    pub card_fee_fixed_minor: i64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            platform_fee_bps: 1000,
            card_fee_bps: 290,
            card_fee_fixed_minor: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub bind_addr: String,
    pub public_base_url: String,
    pub session_secret: String,
    pub qr_secret: String,
    pub admin_emails: Vec<String>,
    pub fees: FeeSchedule,
    pub usd_htg_spread: Decimal,
    pub fallback_usd_htg_rate: Decimal,
    pub order_cookie_max_age_seconds: u64,
    pub max_tickets_per_order: u32,
    pub minimum_payout_minor: i64,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub clickhouse_url: Option<String>,
    pub clickhouse_database: String,
    pub clickhouse_user: Option<String>,
    pub clickhouse_password: Option<String>,
}
