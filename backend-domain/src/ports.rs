// Ports implemented by the infrastructure layer

pub mod repositories;
pub mod services;

pub use repositories::*;
pub use services::*;
