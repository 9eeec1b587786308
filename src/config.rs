// ABOUTME: Provider configuration loaded from TOML with serde defaults and explicit validation
// ABOUTME: Gateway config keeps providers in declaration order for default-provider fallback

use crate::datatypes::{InterfaceVersion, limits};
use crate::transport::Endpoint;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config for provider '{provider}': {reason}")]
    Invalid { provider: String, reason: String },

    #[error("no providers configured")]
    NoProviders,
}

/// Connection and tuning parameters for one SMSC.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub system_id: String,
    pub password: String,
    #[serde(default)]
    pub system_type: String,
    #[serde(default)]
    pub interface_version: InterfaceVersion,
    /// Heartbeat period.
    #[serde(default = "default_enquire_link_ms")]
    pub enquire_link_ms: u64,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Ceiling on submits per one-second window.
    #[serde(default = "default_max_mps")]
    pub max_mps: u32,
    /// Source address used when a send does not name one.
    #[serde(default)]
    pub default_sender: String,
    #[serde(default = "default_registered_delivery")]
    pub registered_delivery: bool,
}

fn default_port() -> u16 {
    2775
}

fn default_enquire_link_ms() -> u64 {
    30_000
}

fn default_reconnect_delay_ms() -> u64 {
    5_000
}

fn default_max_mps() -> u32 {
    10
}

fn default_registered_delivery() -> bool {
    true
}

impl ProviderConfig {
    /// Config with defaults for everything but the address and credentials.
    pub fn new(
        host: impl Into<String>,
        system_id: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            system_id: system_id.into(),
            password: password.into(),
            system_type: String::new(),
            interface_version: InterfaceVersion::default(),
            enquire_link_ms: default_enquire_link_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_mps: default_max_mps(),
            default_sender: String::new(),
            registered_delivery: default_registered_delivery(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_max_mps(mut self, max_mps: u32) -> Self {
        self.max_mps = max_mps;
        self
    }

    pub fn with_enquire_link_ms(mut self, enquire_link_ms: u64) -> Self {
        self.enquire_link_ms = enquire_link_ms;
        self
    }

    pub fn with_reconnect_delay_ms(mut self, reconnect_delay_ms: u64) -> Self {
        self.reconnect_delay_ms = reconnect_delay_ms;
        self
    }

    pub fn with_default_sender(mut self, sender: impl Into<String>) -> Self {
        self.default_sender = sender.into();
        self
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    /// Never zero, even for a config that skipped [`validate`](Self::validate).
    pub fn enquire_link_interval(&self) -> Duration {
        Duration::from_millis(self.enquire_link_ms.max(1))
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Checks the values the bind PDU and the timers depend on.
    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            provider: name.to_string(),
            reason,
        };

        if self.host.trim().is_empty() {
            return Err(invalid("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(invalid("port must be greater than 0".into()));
        }
        if self.system_id.is_empty() {
            return Err(invalid("system_id must not be empty".into()));
        }
        // The limits include the NUL terminator.
        for (field, value, max) in [
            ("system_id", &self.system_id, limits::SYSTEM_ID),
            ("password", &self.password, limits::PASSWORD),
            ("system_type", &self.system_type, limits::SYSTEM_TYPE),
        ] {
            if value.len() >= max {
                return Err(invalid(format!(
                    "{field} is {} octets, maximum is {}",
                    value.len(),
                    max - 1
                )));
            }
        }
        if self.default_sender.len() >= limits::ADDRESS {
            return Err(invalid(format!(
                "default_sender is longer than {} octets",
                limits::ADDRESS - 1
            )));
        }
        if self.max_mps == 0 {
            return Err(invalid("max_mps must be at least 1".into()));
        }
        if self.enquire_link_ms == 0 {
            return Err(invalid("enquire_link_ms must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamedProviderConfig {
    pub name: String,
    #[serde(flatten)]
    pub config: ProviderConfig,
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub default_provider: Option<String>,
    #[serde(default)]
    pub providers: Vec<NamedProviderConfig>,
}

impl GatewayConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: GatewayConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.providers.is_empty() {
            return Err(ConfigError::NoProviders);
        }
        for provider in &self.providers {
            if provider.name.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    provider: provider.name.clone(),
                    reason: "name must not be empty".into(),
                });
            }
            provider.config.validate(&provider.name)?;
        }
        Ok(())
    }

    /// Providers as `(name, config)` pairs in declaration order.
    pub fn provider_list(&self) -> Vec<(String, ProviderConfig)> {
        self.providers
            .iter()
            .map(|p| (p.name.clone(), p.config.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
default_provider = "backup"

[[providers]]
name = "primary"
host = "smsc.example.net"
system_id = "acme"
password = "secret"
max_mps = 20

[[providers]]
name = "backup"
host = "10.0.0.7"
port = 2776
system_id = "acme2"
password = "pw"
interface_version = 0x33
enquire_link_ms = 15000
default_sender = "ACME"
registered_delivery = false
"#;

    #[test]
    fn parses_providers_in_order_with_defaults() {
        let config = GatewayConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.default_provider.as_deref(), Some("backup"));
        assert_eq!(config.providers.len(), 2);

        let primary = &config.providers[0];
        assert_eq!(primary.name, "primary");
        assert_eq!(primary.config.port, 2775);
        assert_eq!(primary.config.interface_version, InterfaceVersion::SmppV34);
        assert_eq!(primary.config.enquire_link_ms, 30_000);
        assert_eq!(primary.config.reconnect_delay_ms, 5_000);
        assert_eq!(primary.config.max_mps, 20);
        assert!(primary.config.registered_delivery);

        let backup = &config.providers[1];
        assert_eq!(backup.name, "backup");
        assert_eq!(backup.config.endpoint(), Endpoint::new("10.0.0.7", 2776));
        assert_eq!(backup.config.interface_version, InterfaceVersion::SmppV33);
        assert_eq!(backup.config.enquire_link_interval(), Duration::from_secs(15));
        assert_eq!(backup.config.default_sender, "ACME");
        assert!(!backup.config.registered_delivery);
    }

    #[test]
    fn empty_provider_list_is_rejected() {
        assert!(matches!(
            GatewayConfig::from_toml_str("default_provider = \"x\""),
            Err(ConfigError::NoProviders)
        ));
    }

    #[test]
    fn rejects_invalid_values() {
        let zero_mps = ProviderConfig::new("h", "id", "pw").with_max_mps(0);
        assert!(matches!(zero_mps.validate("p"), Err(ConfigError::Invalid { .. })));

        let long_password = ProviderConfig::new("h", "id", "123456789");
        assert!(long_password.validate("p").is_err());

        let max_password = ProviderConfig::new("h", "id", "12345678");
        assert!(max_password.validate("p").is_ok());

        assert!(ProviderConfig::new(" ", "id", "pw").validate("p").is_err());
        assert!(ProviderConfig::new("h", "", "pw").validate("p").is_err());
        assert!(ProviderConfig::new("h", "id", "pw").with_port(0).validate("p").is_err());
    }

    #[test]
    fn zero_heartbeat_is_invalid_but_never_a_zero_period() {
        let config = ProviderConfig::new("h", "id", "pw").with_enquire_link_ms(0);
        assert!(config.validate("p").is_err());
        assert_eq!(config.enquire_link_interval(), Duration::from_millis(1));
    }

    #[test]
    fn unknown_interface_version_fails_to_parse() {
        let source = r#"
[[providers]]
name = "p"
host = "h"
system_id = "id"
password = "pw"
interface_version = 0x99
"#;
        assert!(matches!(
            GatewayConfig::from_toml_str(source),
            Err(ConfigError::Parse(_))
        ));
    }
}
