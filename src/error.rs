//! Unified error handling for the storefront backend
//!
//! Component-level errors (panel, gateway, store) are converted into a
//! single `AppError` at the service boundary, with HTTP status mapping,
//! stable error codes for clients, and user-facing messages. Raw transport
//! errors never reach the API layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error codes for programmatic client handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    // Domain errors (4xx)
    #[serde(rename = "TRANSACTION_NOT_FOUND")]
    TransactionNotFound,
    #[serde(rename = "PLAN_NOT_FOUND")]
    PlanNotFound,
    #[serde(rename = "DUPLICATE_TRANSACTION")]
    DuplicateTransaction,
    #[serde(rename = "PAYMENT_EXPIRED")]
    PaymentExpired,
    #[serde(rename = "WARRANTY_NOT_ELIGIBLE")]
    WarrantyNotEligible,
    #[serde(rename = "PROVISION_FAILED")]
    ProvisionFailed,

    // Infrastructure errors (5xx)
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    #[serde(rename = "CONFIGURATION_ERROR")]
    ConfigurationError,

    // External errors (502/503)
    #[serde(rename = "PAYMENT_GATEWAY_ERROR")]
    PaymentGatewayError,
    #[serde(rename = "PANEL_PROVIDER_ERROR")]
    PanelProviderError,

    // Generic
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError,
}

/// Domain-specific business logic errors
#[derive(Debug, Clone)]
pub enum DomainError {
    /// Transaction with the given id doesn't exist
    TransactionNotFound { transaction_id: String },
    /// Plan id (or id+kind+access combination) not present in the catalog
    PlanNotFound { plan_id: String },
    /// Transaction id collision on create
    DuplicateTransaction { transaction_id: String },
    /// Payment intent expired before it was settled
    PaymentExpired { transaction_id: String },
    /// Warranty claim refused (window closed, budget spent, account still
    /// active on the panel, or verification failed)
    WarrantyNotEligible { reason: String },
    /// Provisioning attempt failed; transaction marked failed
    ProvisionFailed { transaction_id: String },
}

/// Infrastructure-level errors
#[derive(Debug, Clone)]
pub enum InfrastructureError {
    Database { message: String, is_retryable: bool },
    Configuration { message: String },
}

/// External collaborator errors
#[derive(Debug, Clone)]
pub enum ExternalError {
    /// QRIS payment gateway unreachable, non-JSON, or reporting failure
    PaymentGateway { message: String, is_retryable: bool },
    /// Panel API unreachable or rejecting the request
    PanelProvider { message: String, is_retryable: bool },
}

/// Input validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    MissingField { field: String },
    InvalidValue { field: String, reason: String },
}

/// Unified application error type
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppErrorKind {
    Domain(DomainError),
    Infrastructure(InfrastructureError),
    External(ExternalError),
    Validation(ValidationError),
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn not_found(transaction_id: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Domain(DomainError::TransactionNotFound {
            transaction_id: transaction_id.into(),
        }))
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }))
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::TransactionNotFound { .. } | DomainError::PlanNotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                DomainError::DuplicateTransaction { .. } => StatusCode::CONFLICT,
                DomainError::PaymentExpired { .. } => StatusCode::GONE,
                DomainError::WarrantyNotEligible { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                DomainError::ProvisionFailed { .. } => StatusCode::BAD_GATEWAY,
            },
            AppErrorKind::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppErrorKind::External(_) => StatusCode::BAD_GATEWAY,
            AppErrorKind::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::TransactionNotFound { .. } => ErrorCode::TransactionNotFound,
                DomainError::PlanNotFound { .. } => ErrorCode::PlanNotFound,
                DomainError::DuplicateTransaction { .. } => ErrorCode::DuplicateTransaction,
                DomainError::PaymentExpired { .. } => ErrorCode::PaymentExpired,
                DomainError::WarrantyNotEligible { .. } => ErrorCode::WarrantyNotEligible,
                DomainError::ProvisionFailed { .. } => ErrorCode::ProvisionFailed,
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => ErrorCode::DatabaseError,
                InfrastructureError::Configuration { .. } => ErrorCode::ConfigurationError,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentGateway { .. } => ErrorCode::PaymentGatewayError,
                ExternalError::PanelProvider { .. } => ErrorCode::PanelProviderError,
            },
            AppErrorKind::Validation(_) => ErrorCode::ValidationError,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::TransactionNotFound { transaction_id } => {
                    format!("Transaksi '{}' tidak ditemukan", transaction_id)
                }
                DomainError::PlanNotFound { plan_id } => {
                    format!("Plan '{}' tidak ditemukan", plan_id)
                }
                DomainError::DuplicateTransaction { transaction_id } => {
                    format!("Transaksi '{}' sudah ada", transaction_id)
                }
                DomainError::PaymentExpired { .. } => {
                    "Pembayaran sudah kedaluwarsa, silakan buat pesanan baru".to_string()
                }
                DomainError::WarrantyNotEligible { reason } => reason.clone(),
                DomainError::ProvisionFailed { .. } => {
                    "Gagal membuat panel, silakan hubungi support".to_string()
                }
            },
            AppErrorKind::Infrastructure(_) => {
                "Service temporarily unavailable. Please try again later".to_string()
            }
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentGateway { .. } => {
                    "Tidak bisa memeriksa status pembayaran sekarang, coba lagi nanti".to_string()
                }
                ExternalError::PanelProvider { .. } => {
                    "Panel provider sedang bermasalah, coba lagi nanti".to_string()
                }
            },
            AppErrorKind::Validation(err) => match err {
                ValidationError::MissingField { field } => {
                    format!("Required field '{}' is missing", field)
                }
                ValidationError::InvalidValue { field, reason } => {
                    format!("Invalid value for '{}': {}", field, reason)
                }
            },
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::Domain(_) => false,
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { is_retryable, .. } => *is_retryable,
                InfrastructureError::Configuration { .. } => false,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentGateway { is_retryable, .. } => *is_retryable,
                ExternalError::PanelProvider { is_retryable, .. } => *is_retryable,
            },
            AppErrorKind::Validation(_) => false,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for AppError {}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::new(AppErrorKind::Infrastructure(
            InfrastructureError::Configuration {
                message: err.to_string(),
            },
        ))
    }
}

/// Standardized error response body returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorCode,
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.error_code(),
            message: self.user_message(),
            timestamp: Utc::now().to_rfc3339(),
            retryable: Some(self.is_retryable()),
        };

        (self.status_code(), Json(body)).into_response()
    }
}

/// Result type for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status_and_code() {
        let error = AppError::not_found("TRX-1");
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(error.error_code(), ErrorCode::TransactionNotFound);
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_gateway_error_is_retryable_and_maps_to_502() {
        let error = AppError::new(AppErrorKind::External(ExternalError::PaymentGateway {
            message: "timeout".to_string(),
            is_retryable: true,
        }));
        assert_eq!(error.status_code(), StatusCode::BAD_GATEWAY);
        assert!(error.is_retryable());
        assert!(error.user_message().contains("coba lagi"));
    }

    #[test]
    fn test_provision_failed_keeps_generic_message() {
        let error = AppError::new(AppErrorKind::Domain(DomainError::ProvisionFailed {
            transaction_id: "TRX-2".to_string(),
        }));
        assert_eq!(error.error_code(), ErrorCode::ProvisionFailed);
        assert!(error.user_message().contains("Gagal membuat panel"));
    }

    #[test]
    fn test_expired_payment_maps_to_410() {
        let error = AppError::new(AppErrorKind::Domain(DomainError::PaymentExpired {
            transaction_id: "TRX-3".to_string(),
        }));
        assert_eq!(error.status_code(), StatusCode::GONE);
        assert!(error.user_message().contains("pesanan baru"));
    }

    #[tokio::test]
    async fn test_error_response_shape() {
        let error = AppError::validation("email", "must not be empty");
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
