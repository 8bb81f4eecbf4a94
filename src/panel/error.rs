use thiserror::Error;

pub type PanelResult<T> = Result<T, PanelError>;

#[derive(Debug, Clone, Error)]
pub enum PanelError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Panel API error: {message}")]
    Provider {
        message: String,
        status: Option<u16>,
        retryable: bool,
    },

    #[error("Panel configuration error: {message}")]
    Config { message: String },
}

impl PanelError {
    pub fn is_retryable(&self) -> bool {
        match self {
            PanelError::Network { .. } => true,
            PanelError::Provider { retryable, .. } => *retryable,
            PanelError::Config { .. } => false,
        }
    }
}

impl From<PanelError> for crate::error::AppError {
    fn from(err: PanelError) -> Self {
        use crate::error::{AppError, AppErrorKind, ExternalError, InfrastructureError};

        let kind = match &err {
            PanelError::Config { message } => {
                AppErrorKind::Infrastructure(InfrastructureError::Configuration {
                    message: message.clone(),
                })
            }
            _ => AppErrorKind::External(ExternalError::PanelProvider {
                message: err.to_string(),
                is_retryable: err.is_retryable(),
            }),
        };
        AppError::new(kind)
    }
}
