pub mod admin_handlers;
pub mod checkout_handlers;
pub mod event_handlers;
pub mod ops_handlers;
pub mod payout_handlers;
pub mod promo_code_handlers;
pub mod webhook_handlers;
