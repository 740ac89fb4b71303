// Read-side use cases

pub mod admin_queries;
pub mod earnings_queries;
pub mod event_queries;
pub mod financial_queries;
pub mod payout_queries;
pub mod promo_code_queries;
