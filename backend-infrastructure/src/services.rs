pub mod fx_rate_service;
pub mod health_service;
pub mod moncash_gateway;
pub mod notification_service;
pub mod stripe_gateway;

pub use fx_rate_service::*;
pub use health_service::*;
pub use moncash_gateway::*;
pub use notification_service::*;
pub use stripe_gateway::*;
