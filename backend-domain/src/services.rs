// Pure domain services

pub mod financial_export;
pub mod payout_machine;
pub mod pricing;
pub mod qr;
pub mod settlement;

pub use financial_export::*;
pub use payout_machine::*;
pub use pricing::*;
pub use qr::*;
pub use settlement::*;
