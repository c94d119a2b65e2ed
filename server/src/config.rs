use std::net::SocketAddr;

use anyhow::{Context, Result};

/// Predeployed chat model on dat1.
pub const DEFAULT_ENDPOINT: &str =
    "https://api.dat1.co/api/v1/collection/open-source-chat/invoke-chat";

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    /// `None` keeps the service up but makes every chat call fail closed.
    pub api_key: Option<String>,
    pub endpoint: String,
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("PORT must be a port number, got {raw:?}"))?,
            None => 3001,
        };

        Ok(Self {
            host: non_empty("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            api_key: non_empty("DAT1_API_KEY"),
            endpoint: non_empty("DAT1_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = ProxyConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_key, None);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.addr().unwrap(), "127.0.0.1:3001".parse().unwrap());
    }

    #[test]
    fn endpoint_override_and_key() {
        let config = ProxyConfig::from_lookup(lookup(&[
            ("DAT1_API_KEY", "secret"),
            ("DAT1_ENDPOINT", "https://custom.example/invoke"),
            ("PORT", "8088"),
        ]))
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.endpoint, "https://custom.example/invoke");
        assert_eq!(config.port, 8088);
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let config = ProxyConfig::from_lookup(lookup(&[("DAT1_API_KEY", "  ")])).unwrap();
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn rejects_bad_port() {
        assert!(ProxyConfig::from_lookup(lookup(&[("PORT", "http")])).is_err());
    }
}
