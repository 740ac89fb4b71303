use backend_domain::{PayoutError, PricingError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<PayoutError> for AppError {
    fn from(err: PayoutError) -> Self {
        match err {
            PayoutError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}
