//! API key handling and credential resolution.

use crate::config::API_KEY_ENV_VAR;
use crate::errors::{SendGridError, SendGridResult};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// SendGrid API key used as a bearer token.
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Wraps a raw API key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::new(key.into()))
    }

    /// Wraps an already secret key.
    pub fn from_secret(key: SecretString) -> Self {
        Self(key)
    }

    /// Generates the Authorization header value.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.0.expose_secret())
    }

    /// Returns true if the key is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.expose_secret().trim().is_empty()
    }

    /// Gets a log-safe rendering of the key.
    pub fn redacted(&self) -> &'static str {
        if self.0.expose_secret().starts_with("SG.") {
            "SG.***"
        } else {
            "***"
        }
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.redacted()).finish()
    }
}

/// Credential provider trait for resolving the API key at configure time.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Resolves the API key.
    async fn api_key(&self) -> SendGridResult<ApiKey>;
}

/// Credential provider returning a fixed key.
pub struct StaticCredentialProvider {
    key: ApiKey,
}

impl StaticCredentialProvider {
    /// Creates a new static credential provider.
    pub fn new(key: ApiKey) -> Self {
        Self { key }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn api_key(&self) -> SendGridResult<ApiKey> {
        Ok(self.key.clone())
    }
}

/// Environment variable credential provider.
pub struct EnvCredentialProvider {
    key_var: String,
}

impl EnvCredentialProvider {
    /// Creates a provider reading `SENDGRID_API_KEY`.
    pub fn sendgrid() -> Self {
        Self::from_env_var(API_KEY_ENV_VAR)
    }

    /// Creates a provider from a custom environment variable.
    pub fn from_env_var(var_name: impl Into<String>) -> Self {
        Self {
            key_var: var_name.into(),
        }
    }

    /// Gets the environment variable name.
    pub fn var_name(&self) -> &str {
        &self.key_var
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn api_key(&self) -> SendGridResult<ApiKey> {
        // Re-read on every call so a key exported after startup is picked up.
        match std::env::var(&self.key_var) {
            Ok(value) if !value.trim().is_empty() => Ok(ApiKey::new(value)),
            _ => Err(SendGridError::missing_auth(format!(
                "Environment variable {} not set",
                self.key_var
            ))),
        }
    }
}

/// Tries each provider in order and returns the first key found.
pub struct ChainCredentialProvider {
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl ChainCredentialProvider {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Appends a provider to the chain.
    pub fn with(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

impl Default for ChainCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialProvider for ChainCredentialProvider {
    async fn api_key(&self) -> SendGridResult<ApiKey> {
        let mut last_error = None;
        for provider in &self.providers {
            match provider.api_key().await {
                Ok(key) if !key.is_blank() => return Ok(key),
                Ok(_) => {}
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error
            .unwrap_or_else(|| SendGridError::missing_auth("No credential providers yielded an API key")))
    }
}
