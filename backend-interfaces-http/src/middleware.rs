pub mod auth;
pub mod cookies;

pub use auth::*;
pub use cookies::*;
