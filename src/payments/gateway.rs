use chrono::{DateTime, NaiveDateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::payments::error::{GatewayError, GatewayResult};
use crate::payments::types::{GatewayPaymentStatus, LineItem, PaymentIntent};

type HmacSha256 = Hmac<Sha256>;

const METHOD_QRIS: &str = "QRIS2";
const METHOD_STATUS: &str = "status";

/// Client for the QRIS payment provider (form-encoded API).
pub struct QrisGateway {
    http: Client,
    config: GatewayConfig,
}

#[derive(Debug, Deserialize)]
struct GatewayEnvelope {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

impl QrisGateway {
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Network {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;

        Ok(Self { http, config })
    }

    /// Create a QRIS payment intent for one checkout.
    ///
    /// The request is signed with HMAC-SHA256 over the canonical
    /// concatenation `api_id + method + merchant_ref + amount`.
    pub async fn create_intent(
        &self,
        merchant_ref: &str,
        payer_name: &str,
        payer_email: &str,
        amount_total: u64,
        items: &[LineItem],
    ) -> GatewayResult<PaymentIntent> {
        let signature = sign_request(
            &self.config.api_key,
            &self.config.api_id,
            METHOD_QRIS,
            merchant_ref,
            amount_total,
        );

        let mut form: Vec<(&str, String)> = vec![
            ("api_id", self.config.api_id.clone()),
            ("method", METHOD_QRIS.to_string()),
            ("name", payer_name.to_string()),
            ("email", payer_email.to_string()),
            ("phone", "6280000000000".to_string()),
            ("amount", amount_total.to_string()),
            ("merchant_fee", "1".to_string()),
            ("merchant_ref", merchant_ref.to_string()),
            ("expired", self.config.expiry_hours.to_string()),
        ];
        for item in items {
            form.push(("produk[]", item.name.clone()));
            form.push(("qty[]", item.qty.to_string()));
            form.push(("harga[]", item.price.to_string()));
        }
        form.push(("callback_url", self.config.callback_url.clone()));
        form.push(("return_url", self.config.return_url.clone()));
        form.push(("signature", signature));

        let envelope = self.post_form(&self.config.create_url, &form).await?;
        let entry = envelope
            .data
            .first()
            .ok_or_else(|| GatewayError::InvalidResponse {
                message: "empty data array in create response".to_string(),
                body: format!("{:?}", envelope.data),
            })?;

        let provider_transaction_id = str_field(entry, "trx_id")?;
        let qr_image_url = str_field(entry, "qr")?;
        let expires_at = parse_expiry(&str_field(entry, "expired")?)?;

        info!(
            merchant_ref = %merchant_ref,
            provider_trx = %provider_transaction_id,
            amount = amount_total,
            "payment intent created"
        );

        Ok(PaymentIntent {
            provider_transaction_id,
            qr_image_url,
            expires_at,
        })
    }

    /// Poll the provider for the state of a previously created intent.
    pub async fn poll_status(
        &self,
        provider_transaction_id: &str,
    ) -> GatewayResult<GatewayPaymentStatus> {
        let form: Vec<(&str, String)> = vec![
            ("api_id", self.config.api_id.clone()),
            ("method", METHOD_STATUS.to_string()),
            ("trx_id", provider_transaction_id.to_string()),
        ];

        let envelope = self.post_form(&self.config.status_url, &form).await?;
        let raw_status = envelope
            .data
            .first()
            .and_then(|entry| entry.get("status"))
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let status = GatewayPaymentStatus::from_provider(raw_status);
        if let GatewayPaymentStatus::Unknown(ref wording) = status {
            warn!(
                provider_trx = %provider_transaction_id,
                wording = %wording,
                "unrecognized gateway status, treating as pending"
            );
        }

        Ok(status)
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, String)],
    ) -> GatewayResult<GatewayEnvelope> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            let response = self
                .http
                .post(url)
                .bearer_auth(&self.config.api_key)
                .form(form)
                .send()
                .await
                .map_err(|e| GatewayError::Network {
                    message: format!("gateway request failed: {}", e),
                });

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();

                    if status.is_server_error() && attempt < self.config.max_retries {
                        warn!(
                            status = %status,
                            attempt = attempt + 1,
                            "gateway server error, retrying"
                        );
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        continue;
                    }

                    let envelope: GatewayEnvelope =
                        serde_json::from_str(&text).map_err(|e| GatewayError::InvalidResponse {
                            message: format!("gateway returned non-JSON: {}", e),
                            body: text.clone(),
                        })?;

                    if envelope.status != "200" {
                        return Err(GatewayError::Rejected {
                            message: envelope
                                .message
                                .unwrap_or_else(|| "gateway reported failure".to_string()),
                            body: text,
                        });
                    }

                    return Ok(envelope);
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.config.max_retries {
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        continue;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(GatewayError::Network {
            message: "gateway request failed".to_string(),
        }))
    }
}

/// HMAC-SHA256 hex signature over `api_id + method + merchant_ref + amount`.
fn sign_request(
    api_key: &str,
    api_id: &str,
    method: &str,
    merchant_ref: &str,
    amount: u64,
) -> String {
    let mut mac = HmacSha256::new_from_slice(api_key.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(api_id.as_bytes());
    mac.update(method.as_bytes());
    mac.update(merchant_ref.as_bytes());
    mac.update(amount.to_string().as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn str_field(entry: &serde_json::Value, key: &str) -> GatewayResult<String> {
    entry
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| GatewayError::InvalidResponse {
            message: format!("missing '{}' in gateway data", key),
            body: entry.to_string(),
        })
}

/// Provider expiry timestamps come as either RFC 3339 or a plain
/// `YYYY-MM-DD HH:MM:SS` (provider local time, treated as UTC).
fn parse_expiry(raw: &str) -> GatewayResult<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }

    Err(GatewayError::InvalidResponse {
        message: format!("unparseable expiry '{}'", raw),
        body: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic_hex() {
        let a = sign_request("secret", "API1", METHOD_QRIS, "TRX-1", 15012);
        let b = sign_request("secret", "API1", METHOD_QRIS, "TRX-1", 15012);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn signature_covers_amount() {
        let a = sign_request("secret", "API1", METHOD_QRIS, "TRX-1", 15012);
        let b = sign_request("secret", "API1", METHOD_QRIS, "TRX-1", 15013);
        assert_ne!(a, b);
    }

    #[test]
    fn parses_both_expiry_formats() {
        assert!(parse_expiry("2026-08-06T10:00:00+07:00").is_ok());
        assert!(parse_expiry("2026-08-06 10:00:00").is_ok());
        assert!(parse_expiry("tomorrow").is_err());
    }

    #[test]
    fn envelope_parses_provider_shape() {
        let raw = r#"{
            "status": "200",
            "message": "ok",
            "data": [{"trx_id": "SKR123", "qr": "https://cdn.example/qr.png",
                      "expired": "2026-08-06 10:00:00", "payment_status": "pending"}]
        }"#;
        let envelope: GatewayEnvelope = serde_json::from_str(raw).expect("parses");
        assert_eq!(envelope.status, "200");
        assert_eq!(envelope.data.len(), 1);
        assert_eq!(
            str_field(&envelope.data[0], "trx_id").expect("trx_id present"),
            "SKR123"
        );
    }
}
