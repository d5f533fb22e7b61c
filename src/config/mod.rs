//! Configuration types for the SendGrid client.

use crate::auth::ApiKey;
use crate::errors::{SendGridError, SendGridErrorKind};
use std::time::Duration;
use url::Url;

/// Default SendGrid API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.sendgrid.com";

/// Base URL for accounts homed in the EU region.
pub const EU_BASE_URL: &str = "https://api.eu.sendgrid.com";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default User-Agent header.
pub const DEFAULT_USER_AGENT: &str = "integrations-sendgrid/0.1.0";

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV_VAR: &str = "SENDGRID_API_KEY";

/// SendGrid data residency region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    /// Global endpoint.
    #[default]
    Global,
    /// EU endpoint.
    Eu,
}

impl Region {
    /// Gets the API base URL for the region.
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Global => DEFAULT_BASE_URL,
            Self::Eu => EU_BASE_URL,
        }
    }
}

/// SendGrid client configuration.
#[derive(Debug, Clone)]
pub struct SendGridConfig {
    /// API base URL.
    pub base_url: String,
    /// API key.
    pub auth: Option<ApiKey>,
    /// Request timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// User-Agent header.
    pub user_agent: String,
}

impl Default for SendGridConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            auth: None,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SendGridConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> SendGridConfigBuilder {
        SendGridConfigBuilder::new()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), SendGridError> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            SendGridError::new(
                SendGridErrorKind::InvalidBaseUrl,
                format!("Invalid base URL '{}': {}", self.base_url, e),
            )
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SendGridError::new(
                SendGridErrorKind::InvalidBaseUrl,
                "Base URL must start with http:// or https://",
            ));
        }

        if self.timeout.is_zero() {
            return Err(SendGridError::configuration("Timeout must be greater than zero"));
        }

        Ok(())
    }
}

/// Builder for SendGridConfig.
#[derive(Debug, Default)]
pub struct SendGridConfigBuilder {
    base_url: Option<String>,
    auth: Option<ApiKey>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl SendGridConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL. An empty string selects the default endpoint.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the base URL from a region.
    pub fn region(mut self, region: Region) -> Self {
        self.base_url = Some(region.base_url().to_string());
        self
    }

    /// Sets the API key.
    pub fn api_key(self, key: impl Into<String>) -> Self {
        self.auth(ApiKey::new(key))
    }

    /// Sets the API key from an existing credential.
    pub fn auth(mut self, key: ApiKey) -> Self {
        self.auth = Some(key);
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the User-Agent header.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<SendGridConfig, SendGridError> {
        let base_url = self
            .base_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let config = SendGridConfig {
            base_url,
            auth: self.auth,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            user_agent: self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        };

        config.validate()?;
        Ok(config)
    }
}
