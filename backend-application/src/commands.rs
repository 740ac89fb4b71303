// State-changing use cases

pub mod admin_commands;
pub mod checkout_commands;
pub mod event_commands;
pub mod issuance_commands;
pub mod payout_commands;
pub mod promo_code_commands;
