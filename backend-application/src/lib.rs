// Backend Application Layer

pub mod auth;
pub mod commands;
pub mod error;
pub mod metrics;
pub mod queries;
pub mod state;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use auth::Principal;
pub use error::AppError;
pub use metrics::Metrics;
pub use state::AppState;
