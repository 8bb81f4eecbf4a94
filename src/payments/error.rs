use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Network error: {message}")]
    Network { message: String },

    /// The provider answered with something that is not JSON. The raw body
    /// is kept for diagnostics.
    #[error("Invalid gateway response: {message}")]
    InvalidResponse { message: String, body: String },

    /// The provider answered JSON but reported a non-success status.
    #[error("Gateway rejected request: {message}")]
    Rejected { message: String, body: String },
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Network { .. } => true,
            GatewayError::InvalidResponse { .. } => true,
            GatewayError::Rejected { .. } => false,
        }
    }
}

impl From<GatewayError> for crate::error::AppError {
    fn from(err: GatewayError) -> Self {
        use crate::error::{AppError, AppErrorKind, ExternalError};

        AppError::new(AppErrorKind::External(ExternalError::PaymentGateway {
            message: err.to_string(),
            is_retryable: err.is_retryable(),
        }))
    }
}
