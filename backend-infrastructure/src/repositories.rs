pub mod clickhouse_mirror;
pub mod pg_rows;
pub mod pg_store;

mod earnings_repository;
mod event_repository;
mod payout_repository;
mod pending_transaction_repository;
mod promo_code_repository;
mod suspicious_activity_repository;
mod ticket_repository;
mod user_repository;
mod webhook_receipt_repository;

pub use clickhouse_mirror::*;
pub use pg_store::*;
