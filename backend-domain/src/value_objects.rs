// Domain value objects
pub mod currency;
pub mod payment_method;
pub mod payout_status;
pub mod role;
pub mod severity;
pub mod ticket_status;

pub use currency::*;
pub use payment_method::*;
pub use payout_status::*;
pub use role::*;
pub use severity::*;
pub use ticket_status::*;
