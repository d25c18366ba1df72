//! SDK configuration
//!
//! The backend base URL comes from the `API_BASE` environment variable, read
//! once per process. Every endpoint path is relative to it.

use crate::error::{SdkError, SdkResult};
use once_cell::sync::Lazy;
use std::time::Duration;

/// Environment variable naming the backend base URL
pub const API_BASE_ENV: &str = "API_BASE";

/// Base URL used when `API_BASE` is not set
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

static API_BASE: Lazy<String> = Lazy::new(|| {
    std::env::var(API_BASE_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
});

/// The process-wide backend base URL.
///
/// The environment is consulted on first call only; later changes to
/// `API_BASE` are not observed.
pub fn api_base() -> &'static str {
    &API_BASE
}

/// Configuration for the SDK client
#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// Base URL for the API
    pub base_url: String,

    /// Request timeout
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Enable request/response logging
    pub enable_logging: bool,

    /// Custom headers to add to all requests
    pub custom_headers: Vec<(String, String)>,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("judge-playground-sdk/{}", env!("CARGO_PKG_VERSION")),
            enable_logging: false,
            custom_headers: Vec::new(),
        }
    }
}

impl SdkConfig {
    /// Create a new configuration with the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Create a configuration pointing at [`api_base`]
    pub fn from_env() -> Self {
        Self::new(api_base())
    }

    /// Create a new builder with the given base URL
    pub fn builder(base_url: impl Into<String>) -> SdkConfigBuilder {
        SdkConfigBuilder {
            config: Self::new(base_url),
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Enable request/response logging
    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }

    /// Add a custom header to all requests
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> SdkResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(SdkError::Configuration(
                "Base URL cannot be empty".to_string(),
            ));
        }

        let parsed = url::Url::parse(&self.base_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SdkError::Configuration(format!(
                "Unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }

        if self.timeout.is_zero() {
            return Err(SdkError::Configuration(
                "Timeout cannot be zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for SDK configuration
#[derive(Debug, Default)]
pub struct SdkConfigBuilder {
    config: SdkConfig,
}

impl SdkConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Enable logging
    pub fn logging(mut self, enable: bool) -> Self {
        self.config.enable_logging = enable;
        self
    }

    /// Add a custom header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.custom_headers.push((name.into(), value.into()));
        self
    }

    /// Build the configuration
    pub fn build(self) -> SdkConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SdkConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:8000");
        assert!(!config.enable_logging);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = SdkConfigBuilder::new()
            .base_url("http://judge.internal:9000")
            .timeout(Duration::from_secs(60))
            .header("X-Trace", "1")
            .build();

        assert_eq!(config.base_url, "http://judge.internal:9000");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.custom_headers.len(), 1);
    }

    #[test]
    fn test_invalid_config() {
        assert!(SdkConfig::new("").validate().is_err());
        assert!(SdkConfig::new("not a url").validate().is_err());
        assert!(SdkConfig::new("ftp://example.com").validate().is_err());
        assert!(SdkConfig::new("http://localhost:8000")
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_api_base_is_stable() {
        let first = api_base();
        let second = api_base();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }
}
