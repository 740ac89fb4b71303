// Domain entities and request/response shapes

pub mod config;
pub mod earnings;
pub mod event;
pub mod payment;
pub mod payout;
pub mod pending_transaction;
pub mod promo_code;
pub mod purchase;
pub mod suspicious_activity;
pub mod ticket;
pub mod user;

pub use config::*;
pub use earnings::*;
pub use event::*;
pub use payment::*;
pub use payout::*;
pub use pending_transaction::*;
pub use promo_code::*;
pub use purchase::*;
pub use suspicious_activity::*;
pub use ticket::*;
pub use user::*;
