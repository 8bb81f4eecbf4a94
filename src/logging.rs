//! Structured logging setup
//!
//! Initializes tracing with an env-filter and either a plain or JSON
//! formatter, plus small helpers for masking customer data in log fields.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured level when set. Safe to call once at
/// startup; later calls are ignored.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_lowercase()));

    match config.format {
        LogFormat::Json => {
            let _ = fmt()
                .json()
                .with_env_filter(filter)
                .with_current_span(false)
                .try_init();
        }
        LogFormat::Plain => {
            let _ = fmt().with_env_filter(filter).try_init();
        }
    }
}

/// Mask an email address for logs and public history views.
///
/// Keeps the first half of the local part (minimum 3 visible characters are
/// not guaranteed for very short names, matching the storefront display).
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            if local.len() <= 3 {
                format!("{}***@{}", local, domain)
            } else {
                let visible = local.len().div_ceil(2);
                format!("{}***@{}", &local[..visible], domain)
            }
        }
        None => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_long_local_part() {
        assert_eq!(mask_email("budisantoso@gmail.com"), "budisa***@gmail.com");
    }

    #[test]
    fn masks_short_local_part() {
        assert_eq!(mask_email("abc@x.id"), "abc***@x.id");
    }

    #[test]
    fn handles_missing_at_sign() {
        assert_eq!(mask_email("not-an-email"), "***");
    }
}
