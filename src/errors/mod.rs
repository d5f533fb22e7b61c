//! Error types for the SendGrid provider.

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Result type alias for SendGrid operations.
pub type SendGridResult<T> = Result<T, SendGridError>;

/// Error kinds for categorizing SendGrid errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendGridErrorKind {
    // Configuration errors
    /// No API key could be resolved.
    MissingAuth,
    /// Invalid base URL.
    InvalidBaseUrl,
    /// Invalid configuration.
    InvalidConfiguration,
    /// A resource operation needed a client but the provider was not configured.
    NotConfigured,

    // Argument errors
    /// Resource arguments violate a constraint checked before any request.
    InvalidArgument,

    // Lifecycle errors
    /// The operation cannot be performed for this resource kind.
    UnsupportedOperation,
    /// The API reported success but the response did not match expectations.
    UnexpectedResponse,
    /// No resource kind is registered under the requested token.
    UnknownResource,

    // Remote errors
    /// Bad request (400).
    BadRequest,
    /// Missing or invalid API key (401).
    Unauthorized,
    /// API key lacks the required scope (403).
    Forbidden,
    /// Resource not found (404).
    NotFound,
    /// Method not allowed (405).
    MethodNotAllowed,
    /// Resource conflict (409).
    Conflict,
    /// Payload too large (413).
    PayloadTooLarge,
    /// Unprocessable entity (422).
    UnprocessableEntity,
    /// Too many requests (429).
    RateLimited,
    /// Internal server error (500).
    InternalError,
    /// Bad gateway (502).
    BadGateway,
    /// Service unavailable (503).
    ServiceUnavailable,
    /// Gateway timeout (504).
    GatewayTimeout,

    // Network errors
    /// Connection failed.
    ConnectionFailed,
    /// Request timeout.
    Timeout,
    /// Request could not be sent.
    RequestFailed,

    // Codec errors
    /// Failed to serialize a request or state value.
    SerializationError,
    /// Failed to deserialize a response or state value.
    DeserializationError,

    // Generic
    /// Unknown error.
    Unknown,
}

impl fmt::Display for SendGridErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAuth => write!(f, "missing_auth"),
            Self::InvalidBaseUrl => write!(f, "invalid_base_url"),
            Self::InvalidConfiguration => write!(f, "invalid_configuration"),
            Self::NotConfigured => write!(f, "not_configured"),
            Self::InvalidArgument => write!(f, "invalid_argument"),
            Self::UnsupportedOperation => write!(f, "unsupported_operation"),
            Self::UnexpectedResponse => write!(f, "unexpected_response"),
            Self::UnknownResource => write!(f, "unknown_resource"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound => write!(f, "not_found"),
            Self::MethodNotAllowed => write!(f, "method_not_allowed"),
            Self::Conflict => write!(f, "conflict"),
            Self::PayloadTooLarge => write!(f, "payload_too_large"),
            Self::UnprocessableEntity => write!(f, "unprocessable_entity"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::InternalError => write!(f, "internal_error"),
            Self::BadGateway => write!(f, "bad_gateway"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::GatewayTimeout => write!(f, "gateway_timeout"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::RequestFailed => write!(f, "request_failed"),
            Self::SerializationError => write!(f, "serialization_error"),
            Self::DeserializationError => write!(f, "deserialization_error"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// One entry of the `errors` array in a SendGrid error body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiErrorDetail {
    /// Human readable message.
    #[serde(default)]
    pub message: String,
    /// Offending request field, when the API names one.
    #[serde(default)]
    pub field: Option<String>,
    /// Link or hint for resolving the error.
    #[serde(default)]
    pub help: Option<String>,
}

/// SendGrid error body: `{"errors": [{"message": ..., "field": ..., "help": ...}]}`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

/// SendGrid provider error with detailed information.
#[derive(Error, Debug)]
pub struct SendGridError {
    /// Error kind.
    kind: SendGridErrorKind,
    /// Error message, including any context prefixes.
    message: String,
    /// HTTP status code.
    status_code: Option<u16>,
    /// Structured details decoded from the error body.
    details: Vec<ApiErrorDetail>,
    /// Underlying cause.
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for SendGridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(code) = self.status_code {
            write!(f, " (HTTP {})", code)?;
        }
        Ok(())
    }
}

impl SendGridError {
    /// Creates a new SendGrid error.
    pub fn new(kind: SendGridErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            details: Vec::new(),
            cause: None,
        }
    }

    /// Sets the HTTP status code.
    pub fn with_status(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Attaches the structured details from the error body.
    pub fn with_details(mut self, details: Vec<ApiErrorDetail>) -> Self {
        self.details = details;
        self
    }

    /// Sets the underlying cause.
    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Prefixes the message with the operation that failed.
    ///
    /// Kind, status code and details are untouched, so callers can still
    /// branch on [`is_not_found`](Self::is_not_found) after wrapping.
    pub fn with_context(mut self, context: impl fmt::Display) -> Self {
        self.message = format!("{}: {}", context, self.message);
        self
    }

    /// Gets the error kind.
    pub fn kind(&self) -> SendGridErrorKind {
        self.kind
    }

    /// Gets the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Gets the HTTP status code.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Gets the structured error details.
    pub fn details(&self) -> &[ApiErrorDetail] {
        &self.details
    }

    /// Returns true when the API answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }

    /// Returns true if a caller could reasonably retry this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            SendGridErrorKind::RateLimited
                | SendGridErrorKind::ConnectionFailed
                | SendGridErrorKind::Timeout
                | SendGridErrorKind::InternalError
                | SendGridErrorKind::BadGateway
                | SendGridErrorKind::ServiceUnavailable
                | SendGridErrorKind::GatewayTimeout
        )
    }

    /// Creates an error from an HTTP status code and decoded error body.
    ///
    /// The message is the first detail's message, falling back to the
    /// status text when the body carried none.
    pub fn from_response(status: u16, status_text: &str, details: Vec<ApiErrorDetail>) -> Self {
        let message = details
            .iter()
            .map(|d| d.message.as_str())
            .find(|m| !m.is_empty())
            .unwrap_or(status_text)
            .to_string();

        Self::new(Self::kind_from_status(status), message)
            .with_status(status)
            .with_details(details)
    }

    /// Maps HTTP status code to error kind.
    fn kind_from_status(status: u16) -> SendGridErrorKind {
        match status {
            400 => SendGridErrorKind::BadRequest,
            401 => SendGridErrorKind::Unauthorized,
            403 => SendGridErrorKind::Forbidden,
            404 => SendGridErrorKind::NotFound,
            405 => SendGridErrorKind::MethodNotAllowed,
            409 => SendGridErrorKind::Conflict,
            413 => SendGridErrorKind::PayloadTooLarge,
            422 => SendGridErrorKind::UnprocessableEntity,
            429 => SendGridErrorKind::RateLimited,
            500 => SendGridErrorKind::InternalError,
            502 => SendGridErrorKind::BadGateway,
            503 => SendGridErrorKind::ServiceUnavailable,
            504 => SendGridErrorKind::GatewayTimeout,
            _ => SendGridErrorKind::Unknown,
        }
    }

    // Convenience constructors

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(SendGridErrorKind::InvalidConfiguration, message)
    }

    /// Creates a missing credential error.
    pub fn missing_auth(message: impl Into<String>) -> Self {
        Self::new(SendGridErrorKind::MissingAuth, message)
    }

    /// Creates an error for a resource call made before the provider was configured.
    pub fn not_configured() -> Self {
        Self::new(
            SendGridErrorKind::NotConfigured,
            "SendGrid client not configured - ensure apiKey is set in provider configuration",
        )
    }

    /// Creates an argument validation error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(SendGridErrorKind::InvalidArgument, message)
    }

    /// Creates an unsupported operation error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(SendGridErrorKind::UnsupportedOperation, message)
    }

    /// Creates an error for a successful response that did not contain what was asked for.
    pub fn unexpected_response(message: impl Into<String>) -> Self {
        Self::new(SendGridErrorKind::UnexpectedResponse, message)
    }

    /// Creates an unknown resource token error.
    pub fn unknown_resource(token: &str) -> Self {
        Self::new(
            SendGridErrorKind::UnknownResource,
            format!("unknown resource type: {}", token),
        )
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(SendGridErrorKind::NotFound, message).with_status(404)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(SendGridErrorKind::Timeout, message)
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(SendGridErrorKind::SerializationError, message)
    }

    /// Creates a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::new(SendGridErrorKind::DeserializationError, message)
    }
}

impl From<serde_json::Error> for SendGridError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON conversion failed: {}", err)).with_cause(err)
    }
}
