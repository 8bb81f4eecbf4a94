//! Application configuration module
//! Handles environment variable loading, configuration validation, and application settings

use std::env;

use crate::panel::PanelKind;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub panels: PanelsConfig,
    pub gateway: GatewayConfig,
    pub fees: FeeConfig,
    pub warranty: WarrantyConfig,
    pub notify: NotifyConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64, // seconds
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone)]
pub enum LogFormat {
    Json,
    Plain,
}

/// Credentials and identifiers for one Pterodactyl backend
#[derive(Debug, Clone)]
pub struct PanelBackendConfig {
    pub domain: String,
    pub api_key: String,
    pub nest: String,
    pub egg: String,
    pub location: String,
}

/// The two statically configured panel backends
#[derive(Debug, Clone)]
pub struct PanelsConfig {
    pub private: PanelBackendConfig,
    pub public: PanelBackendConfig,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// QRIS payment gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_id: String,
    pub api_key: String,
    pub create_url: String,
    pub status_url: String,
    pub callback_url: String,
    pub return_url: String,
    pub expiry_hours: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// Checkout surcharge bounds (integer rupiah)
#[derive(Debug, Clone)]
pub struct FeeConfig {
    pub min: u32,
    pub max: u32,
}

/// Warranty window and replacement budget
#[derive(Debug, Clone)]
pub struct WarrantyConfig {
    pub days: i64,
    pub replace_limit: u32,
}

/// Outbound notification settings
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub shop_name: String,
    pub community_group_link: String,
    pub mail: MailConfig,
    pub telegram: TelegramConfig,
}

/// HTTP mail relay used to deliver panel credentials
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub endpoint: String,
    pub api_key: String,
    pub from: String,
}

/// Telegram owner-alert bot
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub owner_chat_id: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenv::dotenv().ok();

        Ok(AppConfig {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
            panels: PanelsConfig::from_env()?,
            gateway: GatewayConfig::from_env()?,
            fees: FeeConfig::from_env()?,
            warranty: WarrantyConfig::from_env()?,
            notify: NotifyConfig::from_env()?,
        })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.logging.validate()?;
        self.panels.validate()?;
        self.gateway.validate()?;
        self.fees.validate()?;
        self.warranty.validate()?;

        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue(
                "SERVER_PORT cannot be 0".to_string(),
            ));
        }
        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SERVER_HOST cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(DatabaseConfig {
            url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::MissingVariable("DATABASE_URL".to_string()))?,
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()))?,
            connection_timeout: env::var("DB_CONNECTION_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_CONNECTION_TIMEOUT".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::InvalidValue("DATABASE_URL".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        Ok(())
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "plain".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }

        Ok(())
    }
}

impl PanelBackendConfig {
    fn from_env_prefixed(prefix: &str) -> Result<Self, ConfigError> {
        let var = |suffix: &str| format!("{}_{}", prefix, suffix);
        Ok(PanelBackendConfig {
            domain: env::var(var("DOMAIN"))
                .map_err(|_| ConfigError::MissingVariable(var("DOMAIN")))?,
            api_key: env::var(var("API_KEY"))
                .map_err(|_| ConfigError::MissingVariable(var("API_KEY")))?,
            nest: env::var(var("NEST")).unwrap_or_else(|_| "5".to_string()),
            egg: env::var(var("EGG")).unwrap_or_else(|_| "15".to_string()),
            location: env::var(var("LOCATION")).unwrap_or_else(|_| "1".to_string()),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.domain.starts_with("http://") && !self.domain.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "panel domain must be a valid URL".to_string(),
            ));
        }
        if self.api_key.is_empty() {
            return Err(ConfigError::InvalidValue(
                "panel api key cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl PanelsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(PanelsConfig {
            private: PanelBackendConfig::from_env_prefixed("PANEL_PRIVATE")?,
            public: PanelBackendConfig::from_env_prefixed("PANEL_PUBLIC")?,
            timeout_secs: env::var("PANEL_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PANEL_TIMEOUT_SECS".to_string()))?,
            max_retries: env::var("PANEL_MAX_RETRIES")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PANEL_MAX_RETRIES".to_string()))?,
        })
    }

    /// Backend configuration for the given panel kind
    pub fn backend(&self, kind: PanelKind) -> &PanelBackendConfig {
        match kind {
            PanelKind::Private => &self.private,
            PanelKind::Public => &self.public,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.private.validate()?;
        self.public.validate()?;
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("PANEL_TIMEOUT_SECS".to_string()));
        }

        Ok(())
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(GatewayConfig {
            api_id: env::var("GATEWAY_API_ID")
                .map_err(|_| ConfigError::MissingVariable("GATEWAY_API_ID".to_string()))?,
            api_key: env::var("GATEWAY_API_KEY")
                .map_err(|_| ConfigError::MissingVariable("GATEWAY_API_KEY".to_string()))?,
            create_url: env::var("GATEWAY_CREATE_URL")
                .unwrap_or_else(|_| "https://sakurupiah.id/api/create.php".to_string()),
            status_url: env::var("GATEWAY_STATUS_URL")
                .unwrap_or_else(|_| "https://sakurupiah.id/api/status-transaction.php".to_string()),
            callback_url: env::var("CHECKOUT_CALLBACK_URL")
                .map_err(|_| ConfigError::MissingVariable("CHECKOUT_CALLBACK_URL".to_string()))?,
            return_url: env::var("CHECKOUT_RETURN_URL")
                .map_err(|_| ConfigError::MissingVariable("CHECKOUT_RETURN_URL".to_string()))?,
            expiry_hours: env::var("GATEWAY_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("GATEWAY_EXPIRY_HOURS".to_string()))?,
            timeout_secs: env::var("GATEWAY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("GATEWAY_TIMEOUT_SECS".to_string()))?,
            max_retries: env::var("GATEWAY_MAX_RETRIES")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("GATEWAY_MAX_RETRIES".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_id.is_empty() || self.api_key.is_empty() {
            return Err(ConfigError::InvalidValue(
                "gateway credentials cannot be empty".to_string(),
            ));
        }
        if self.expiry_hours == 0 {
            return Err(ConfigError::InvalidValue("GATEWAY_EXPIRY_HOURS".to_string()));
        }

        Ok(())
    }
}

impl FeeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(FeeConfig {
            min: env::var("FEE_MIN")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("FEE_MIN".to_string()))?,
            max: env::var("FEE_MAX")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("FEE_MAX".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::InvalidValue(
                "FEE_MIN must be <= FEE_MAX".to_string(),
            ));
        }

        Ok(())
    }
}

impl WarrantyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(WarrantyConfig {
            days: env::var("WARRANTY_DAYS")
                .unwrap_or_else(|_| "12".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("WARRANTY_DAYS".to_string()))?,
            replace_limit: env::var("WARRANTY_REPLACE_LIMIT")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("WARRANTY_REPLACE_LIMIT".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.days <= 0 {
            return Err(ConfigError::InvalidValue("WARRANTY_DAYS".to_string()));
        }
        if self.replace_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "WARRANTY_REPLACE_LIMIT".to_string(),
            ));
        }

        Ok(())
    }
}

impl NotifyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(NotifyConfig {
            shop_name: env::var("SHOP_NAME").unwrap_or_else(|_| "My Panel Shop".to_string()),
            community_group_link: env::var("COMMUNITY_GROUP_LINK").unwrap_or_default(),
            mail: MailConfig {
                endpoint: env::var("MAIL_RELAY_ENDPOINT").unwrap_or_default(),
                api_key: env::var("MAIL_RELAY_API_KEY").unwrap_or_default(),
                from: env::var("MAIL_FROM")
                    .unwrap_or_else(|_| "Panel <no-reply@example.com>".to_string()),
            },
            telegram: TelegramConfig {
                bot_token: env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
                owner_chat_id: env::var("TELEGRAM_OWNER_ID").unwrap_or_default(),
            },
        })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> PanelBackendConfig {
        PanelBackendConfig {
            domain: "https://panel.example.com".to_string(),
            api_key: "ptla_demo".to_string(),
            nest: "5".to_string(),
            egg: "15".to_string(),
            location: "1".to_string(),
        }
    }

    #[test]
    fn test_server_config_validation() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_port_validation() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_panel_backend_requires_url_domain() {
        let mut config = backend();
        assert!(config.validate().is_ok());

        config.domain = "panel.example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_lookup_by_kind() {
        let panels = PanelsConfig {
            private: backend(),
            public: PanelBackendConfig {
                domain: "https://public.example.com".to_string(),
                ..backend()
            },
            timeout_secs: 30,
            max_retries: 2,
        };

        assert_eq!(
            panels.backend(PanelKind::Public).domain,
            "https://public.example.com"
        );
        assert_eq!(
            panels.backend(PanelKind::Private).domain,
            "https://panel.example.com"
        );
    }

    #[test]
    fn test_fee_bounds_validation() {
        let config = FeeConfig { min: 50, max: 10 };
        assert!(config.validate().is_err());

        let config = FeeConfig { min: 10, max: 50 };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_warranty_validation() {
        let config = WarrantyConfig {
            days: 0,
            replace_limit: 3,
        };
        assert!(config.validate().is_err());

        let config = WarrantyConfig {
            days: 12,
            replace_limit: 3,
        };
        assert!(config.validate().is_ok());
    }
}
