//! SendGrid API client implementation.

use crate::auth::ApiKey;
use crate::config::{SendGridConfig, SendGridConfigBuilder};
use crate::errors::{ApiErrorBody, SendGridError, SendGridErrorKind, SendGridResult};
use reqwest::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
    Client, Method, Response,
};
use serde::{de::DeserializeOwned, Serialize};
use std::borrow::Cow;
use std::time::Duration;
use tracing::{debug, warn};

/// Percent-encodes a natural key so it can be used as a single path segment.
pub fn path_segment(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

/// SendGrid API client.
///
/// Holds only immutable configuration and a pooled HTTP transport, so a
/// single instance can be cloned and shared across concurrent calls.
#[derive(Clone)]
pub struct SendGridClient {
    /// HTTP client.
    http: Client,
    /// Configuration.
    config: SendGridConfig,
    /// API key.
    auth: ApiKey,
}

impl std::fmt::Debug for SendGridClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridClient")
            .field("base_url", &self.config.base_url)
            .field("auth", &self.auth)
            .finish()
    }
}

impl SendGridClient {
    /// Creates a new SendGrid client.
    pub fn new(config: SendGridConfig) -> SendGridResult<Self> {
        config.validate()?;

        let auth = config
            .auth
            .clone()
            .ok_or_else(|| SendGridError::missing_auth("SendGrid API key is required"))?;

        if auth.is_blank() {
            return Err(SendGridError::missing_auth("SendGrid API key is empty"));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| {
                SendGridError::new(
                    SendGridErrorKind::InvalidConfiguration,
                    format!("Failed to create HTTP client: {}", e),
                )
                .with_cause(e)
            })?;

        Ok(Self { http, config, auth })
    }

    /// Creates a client from an API key and base URL. An empty base URL
    /// selects the default endpoint.
    pub fn with_api_key(api_key: impl Into<String>, base_url: impl Into<String>) -> SendGridResult<Self> {
        Self::builder().api_key(api_key).base_url(base_url).build()
    }

    /// Creates a new client builder.
    pub fn builder() -> SendGridClientBuilder {
        SendGridClientBuilder::new()
    }

    /// Gets the base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Gets the request timeout.
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    // HTTP methods

    /// Makes a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> SendGridResult<T> {
        self.request(Method::GET, path, Option::<&()>::None).await
    }

    /// Makes a POST request.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> SendGridResult<T> {
        self.request(Method::POST, path, Some(body)).await
    }

    /// Makes a POST request without a response body.
    pub async fn post_no_response<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> SendGridResult<()> {
        self.request_no_response(Method::POST, path, Some(body)).await
    }

    /// Makes a PUT request.
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> SendGridResult<T> {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// Makes a PUT request without a response body.
    pub async fn put_no_response<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> SendGridResult<()> {
        self.request_no_response(Method::PUT, path, Some(body)).await
    }

    /// Makes a PATCH request.
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> SendGridResult<T> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    /// Makes a PATCH request without a response body.
    pub async fn patch_no_response<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> SendGridResult<()> {
        self.request_no_response(Method::PATCH, path, Some(body)).await
    }

    /// Makes a DELETE request.
    pub async fn delete(&self, path: &str) -> SendGridResult<()> {
        self.request_no_response(Method::DELETE, path, Option::<&()>::None)
            .await
    }

    // Internal methods

    async fn request<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> SendGridResult<T> {
        let url = self.build_url(path);
        let response = self.execute_request(method, &url, body).await?;

        let bytes = response.bytes().await.map_err(|e| {
            SendGridError::new(
                SendGridErrorKind::RequestFailed,
                format!("Failed to read response body: {}", e),
            )
            .with_cause(e)
        })?;

        Self::decode_body(&bytes)
    }

    async fn request_no_response<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> SendGridResult<()> {
        let url = self.build_url(path);
        self.execute_request(method, &url, body).await?;
        Ok(())
    }

    async fn execute_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> SendGridResult<Response> {
        let body_bytes = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| {
                SendGridError::serialization(format!("Failed to serialize request body: {}", e))
                    .with_cause(e)
            })?;

        debug!(method = %method, url = %url, "Sending SendGrid request");

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(AUTHORIZATION, self.auth.authorization_header())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, &self.config.user_agent);

        if let Some(bytes) = body_bytes {
            request = request.body(bytes);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SendGridError::timeout(format!("Request timed out: {}", e))
            } else if e.is_connect() {
                SendGridError::new(
                    SendGridErrorKind::ConnectionFailed,
                    format!("Connection failed: {}", e),
                )
            } else {
                SendGridError::new(
                    SendGridErrorKind::RequestFailed,
                    format!("Request failed: {}", e),
                )
            }
        })?;

        let status = response.status();
        debug!(method = %method, url = %url, status = status.as_u16(), "SendGrid response received");

        if status.as_u16() >= 400 {
            return Err(Self::handle_error_response(response).await);
        }

        Ok(response)
    }

    fn build_url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> SendGridResult<T> {
        // 204 and friends carry no body; decode them as JSON null so unit and
        // optional targets succeed.
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return serde_json::from_value(serde_json::Value::Null).map_err(|e| {
                SendGridError::deserialization(format!("Empty response body: {}", e))
            });
        }

        serde_json::from_slice(bytes).map_err(|e| {
            SendGridError::deserialization(format!("Failed to deserialize response: {}", e))
                .with_cause(e)
        })
    }

    async fn handle_error_response(response: Response) -> SendGridError {
        let status = response.status();
        let status_text = status
            .canonical_reason()
            .map(String::from)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        // Absent or unparseable bodies fall back to the status text.
        let details = match response.bytes().await {
            Ok(bytes) => serde_json::from_slice::<ApiErrorBody>(&bytes)
                .map(|body| body.errors)
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        };

        let error = SendGridError::from_response(status.as_u16(), &status_text, details);
        warn!(status = status.as_u16(), error = %error.message(), "SendGrid API error");
        error
    }
}

/// Builder for SendGridClient.
pub struct SendGridClientBuilder {
    config_builder: SendGridConfigBuilder,
}

impl SendGridClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            config_builder: SendGridConfig::builder(),
        }
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.base_url(url);
        self
    }

    /// Sets the region.
    pub fn region(mut self, region: crate::config::Region) -> Self {
        self.config_builder = self.config_builder.region(region);
        self
    }

    /// Sets the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.api_key(key);
        self
    }

    /// Sets the API key from an existing credential.
    pub fn auth(mut self, key: ApiKey) -> Self {
        self.config_builder = self.config_builder.auth(key);
        self
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Sets the User-Agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.user_agent(ua);
        self
    }

    /// Builds the client.
    pub fn build(self) -> SendGridResult<SendGridClient> {
        let config = self.config_builder.build()?;
        SendGridClient::new(config)
    }
}

impl Default for SendGridClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
