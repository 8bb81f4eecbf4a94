//! Pterodactyl panel gateway
//!
//! Typed client over the panel's application API plus the static
//! private/public backend set resolved once at startup.

pub mod client;
pub mod error;
pub mod types;

pub use client::PanelClient;
pub use error::{PanelError, PanelResult};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::PanelsConfig;

/// Which of the two statically configured panel backends a transaction
/// targets. There is exactly one credential set per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelKind {
    Private,
    Public,
}

impl PanelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PanelKind::Private => "private",
            PanelKind::Public => "public",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "private" => Some(PanelKind::Private),
            "public" => Some(PanelKind::Public),
            _ => None,
        }
    }
}

impl std::fmt::Display for PanelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The full set of panel backends, constructed once from configuration and
/// shared across services.
#[derive(Clone)]
pub struct PanelGateways {
    private: Arc<PanelClient>,
    public: Arc<PanelClient>,
}

impl PanelGateways {
    pub fn from_config(config: &PanelsConfig) -> PanelResult<Self> {
        Ok(Self {
            private: Arc::new(PanelClient::new(
                config.backend(PanelKind::Private).clone(),
                config.timeout_secs,
                config.max_retries,
            )?),
            public: Arc::new(PanelClient::new(
                config.backend(PanelKind::Public).clone(),
                config.timeout_secs,
                config.max_retries,
            )?),
        })
    }

    pub fn get(&self, kind: PanelKind) -> &PanelClient {
        match kind {
            PanelKind::Private => &self.private,
            PanelKind::Public => &self.public,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_panel_kind_case_insensitively() {
        assert_eq!(PanelKind::parse("Private"), Some(PanelKind::Private));
        assert_eq!(PanelKind::parse("PUBLIC"), Some(PanelKind::Public));
        assert_eq!(PanelKind::parse("shared"), None);
    }

    #[test]
    fn panel_kind_round_trips_through_str() {
        for kind in [PanelKind::Private, PanelKind::Public] {
            assert_eq!(PanelKind::parse(kind.as_str()), Some(kind));
        }
    }
}
