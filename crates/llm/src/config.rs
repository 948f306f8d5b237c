//! Configuration for a provider backend.
//!
//! The engine treats the provider as a single opaque backend regardless of
//! whether it's reached over HTTP to a hosted API or a local server, so one
//! config shape covers both; callers that need per-vendor defaults set them
//! before constructing the config, not in a separate local/remote type.

use crate::error::{LlmError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the provider endpoint.
    pub base_url: String,

    /// Model name/identifier to request.
    pub model: String,

    /// API key for authentication, if the provider requires one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Maximum retries for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl ProviderConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            timeout: default_timeout(),
            max_retries: default_max_retries(),
        }
    }

    /// Build a config from a provider-specific API key environment variable.
    pub fn from_env(
        api_key_env: &str,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let api_key = std::env::var(api_key_env).map_err(|_| {
            LlmError::ConfigError(format!("environment variable not set: {api_key_env}"))
        })?;

        Ok(Self::new(base_url, model).with_api_key(api_key))
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_retries() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let config = ProviderConfig::new("https://api.example.com", "flagship-1")
            .with_api_key("test-key")
            .with_timeout(Duration::from_secs(30))
            .with_max_retries(5);

        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.model, "flagship-1");
        assert_eq!(config.api_key.as_deref(), Some("test-key"));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 5);
    }

    #[test]
    fn from_env_reads_api_key() {
        std::env::set_var("LLM_TEST_CONFIG_KEY", "from-env-key");
        let config =
            ProviderConfig::from_env("LLM_TEST_CONFIG_KEY", "https://api.example.com", "m1")
                .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("from-env-key"));
        std::env::remove_var("LLM_TEST_CONFIG_KEY");
    }

    #[test]
    fn from_env_missing_var_errors() {
        std::env::remove_var("LLM_TEST_CONFIG_MISSING");
        let err =
            ProviderConfig::from_env("LLM_TEST_CONFIG_MISSING", "https://api.example.com", "m1")
                .unwrap_err();
        assert!(matches!(err, LlmError::ConfigError(_)));
    }
}
