use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A created payment intent (QR code) as returned by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub provider_transaction_id: String,
    pub qr_image_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Provider-reported payment state after mapping.
///
/// `Unknown` carries the provider's raw wording so the fail-safe handling
/// (treated as still pending) stays observable in logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayPaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Unknown(String),
}

impl GatewayPaymentStatus {
    /// Map the provider's free-text status. Unrecognized wording is kept as
    /// `Unknown` and handled as pending downstream; a transient rewording on
    /// the provider side must not produce a false terminal transition.
    pub fn from_provider(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "pending" => GatewayPaymentStatus::Pending,
            "berhasil" => GatewayPaymentStatus::Succeeded,
            "gagal" => GatewayPaymentStatus::Failed,
            other => GatewayPaymentStatus::Unknown(other.to_string()),
        }
    }
}

/// One checkout line item sent with intent creation
#[derive(Debug, Clone)]
pub struct LineItem {
    pub name: String,
    pub qty: u32,
    pub price: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_provider_wording_case_insensitively() {
        assert_eq!(
            GatewayPaymentStatus::from_provider("Berhasil"),
            GatewayPaymentStatus::Succeeded
        );
        assert_eq!(
            GatewayPaymentStatus::from_provider("GAGAL"),
            GatewayPaymentStatus::Failed
        );
        assert_eq!(
            GatewayPaymentStatus::from_provider(" pending "),
            GatewayPaymentStatus::Pending
        );
    }

    #[test]
    fn unrecognized_wording_is_preserved() {
        assert_eq!(
            GatewayPaymentStatus::from_provider("diproses"),
            GatewayPaymentStatus::Unknown("diproses".to_string())
        );
    }
}
