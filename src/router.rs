// ABOUTME: Multi-provider router holding one session per configured provider
// ABOUTME: Resolves case-insensitive provider keys, falls back to a default, and fans out start/stop

use crate::config::{GatewayConfig, ProviderConfig};
use crate::session::{OutboundSms, Session, SessionError};
use crate::store::MessageStore;
use crate::transport::Connector;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("at least one provider must be configured")]
    NoProviders,

    #[error("provider name '{0}' is empty after normalization")]
    InvalidProviderName(String),

    #[error("provider '{0}' is configured more than once")]
    DuplicateProvider(String),

    #[error("provider '{requested}' not found, available: {}", .available.join(", "))]
    ProviderNotFound {
        requested: String,
        available: Vec<String>,
    },

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl RouterError {
    pub fn code(&self) -> String {
        match self {
            RouterError::NoProviders
            | RouterError::InvalidProviderName(_)
            | RouterError::DuplicateProvider(_) => "CONFIG_ERROR".to_string(),
            RouterError::ProviderNotFound { .. } => "PROVIDER_NOT_FOUND".to_string(),
            RouterError::Session(e) => e.code(),
        }
    }
}

/// A message plus an optional provider key. `None` uses the default provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedSms {
    pub provider: Option<String>,
    pub sms: OutboundSms,
}

impl RoutedSms {
    pub fn new(sms: OutboundSms) -> Self {
        Self {
            provider: None,
            sms,
        }
    }

    pub fn via(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Provider(bool),
    All(BTreeMap<String, bool>),
}

/// Lowercased and trimmed, so `" Primary "` and `"primary"` are one provider.
pub fn normalize_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Fixed set of provider sessions, built once at startup.
pub struct ProviderRouter<C: Connector, S: MessageStore> {
    // Declaration order.
    sessions: Vec<(String, Session<C, S>)>,
    index: HashMap<String, usize>,
    default_key: String,
}

impl<C: Connector + Clone, S: MessageStore> ProviderRouter<C, S> {
    /// Creates one stopped session per provider.
    ///
    /// An unknown or missing `default_provider` falls back to the first
    /// provider in `providers`.
    pub fn new(
        providers: Vec<(String, ProviderConfig)>,
        default_provider: Option<&str>,
        connector: C,
        store: Arc<S>,
    ) -> Result<Self, RouterError> {
        if providers.is_empty() {
            return Err(RouterError::NoProviders);
        }

        let mut sessions = Vec::with_capacity(providers.len());
        let mut index = HashMap::with_capacity(providers.len());
        for (name, config) in providers {
            let key = normalize_key(&name);
            if key.is_empty() {
                return Err(RouterError::InvalidProviderName(name));
            }
            if index.contains_key(&key) {
                return Err(RouterError::DuplicateProvider(key));
            }
            index.insert(key.clone(), sessions.len());
            let session = Session::new(key.clone(), config, connector.clone(), Arc::clone(&store));
            sessions.push((key, session));
        }

        let requested = default_provider.map(normalize_key);
        let default_key = match requested {
            Some(key) if index.contains_key(&key) => key,
            other => {
                let first = sessions[0].0.clone();
                if let Some(missing) = other {
                    warn!(requested = %missing, fallback = %first, "default provider not configured");
                }
                first
            }
        };

        Ok(Self {
            sessions,
            index,
            default_key,
        })
    }

    pub fn from_config(config: &GatewayConfig, connector: C, store: Arc<S>) -> Result<Self, RouterError> {
        Self::new(
            config.provider_list(),
            config.default_provider.as_deref(),
            connector,
            store,
        )
    }
}

impl<C: Connector, S: MessageStore> ProviderRouter<C, S> {
    pub fn start(&self) {
        info!(providers = self.sessions.len(), default = %self.default_key, "starting provider sessions");
        for (_, session) in &self.sessions {
            session.start();
        }
    }

    pub fn stop(&self) {
        for (_, session) in &self.sessions {
            session.stop();
        }
    }

    /// Readiness of one provider, or of all providers when `provider` is `None`.
    /// An unknown provider is simply not ready.
    pub fn is_ready(&self, provider: Option<&str>) -> Readiness {
        match provider {
            Some(name) => Readiness::Provider(
                self.index
                    .get(&normalize_key(name))
                    .is_some_and(|&i| self.sessions[i].1.is_ready()),
            ),
            None => Readiness::All(
                self.sessions
                    .iter()
                    .map(|(key, session)| (key.clone(), session.is_ready()))
                    .collect(),
            ),
        }
    }

    pub async fn send_sms(&self, request: RoutedSms) -> Result<String, RouterError> {
        let session = self.resolve(request.provider.as_deref())?;
        Ok(session.send_sms(request.sms).await?)
    }

    /// Session for `provider`, or the default session for `None`.
    pub fn resolve(&self, provider: Option<&str>) -> Result<&Session<C, S>, RouterError> {
        let key = provider.map_or_else(|| self.default_key.clone(), normalize_key);
        match self.index.get(&key) {
            Some(&i) => Ok(&self.sessions[i].1),
            None => Err(RouterError::ProviderNotFound {
                requested: provider.unwrap_or_default().to_string(),
                available: self.providers(),
            }),
        }
    }

    pub fn session(&self, provider: &str) -> Option<&Session<C, S>> {
        self.index
            .get(&normalize_key(provider))
            .map(|&i| &self.sessions[i].1)
    }

    pub fn default_provider(&self) -> &str {
        &self.default_key
    }

    /// Normalized provider keys in declaration order.
    pub fn providers(&self) -> Vec<String> {
        self.sessions.iter().map(|(key, _)| key.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_key("  Primary\t"), "primary");
    }

    #[test]
    fn not_found_message_lists_providers() {
        let err = RouterError::ProviderNotFound {
            requested: "unknown-provider".into(),
            available: vec!["primary".into(), "backup".into()],
        };
        assert_eq!(err.code(), "PROVIDER_NOT_FOUND");
        assert_eq!(
            err.to_string(),
            "provider 'unknown-provider' not found, available: primary, backup"
        );
        assert_eq!(RouterError::NoProviders.code(), "CONFIG_ERROR");
    }
}
