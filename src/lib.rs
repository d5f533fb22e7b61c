//! # SendGrid Provider Library
//!
//! Declarative lifecycle management for SendGrid account resources:
//! - Thin v3 REST transport with bearer auth and structured API errors
//! - Typed Create/Read/Update/Delete controllers for 13 resource kinds
//! - Dry-run previews that never touch the network
//! - Token-based JSON dispatch for infrastructure orchestrators
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use integrations_sendgrid::resources::{IpPool, IpPoolArgs, Resource};
//! use integrations_sendgrid::SendGridClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SendGridClient::with_api_key("SG.xxxxxxxx", "")?;
//!
//!     let args = IpPoolArgs {
//!         name: "transactional".to_string(),
//!     };
//!     let created = IpPool.create(Some(&client), &args, false).await?;
//!     println!("created pool {}", created.id);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;

// Authentication
pub mod auth;

// HTTP client and transport
pub mod client;

// Resource controllers
pub mod resources;

// Orchestrator-facing provider
pub mod provider;

// Re-exports for convenience
pub use auth::{ChainCredentialProvider, CredentialProvider, EnvCredentialProvider, StaticCredentialProvider};
pub use client::{SendGridClient, SendGridClientBuilder};
pub use config::{Region, SendGridConfig, SendGridConfigBuilder};
pub use errors::{ApiErrorDetail, SendGridError, SendGridErrorKind, SendGridResult};
pub use provider::{CreateResponse, ProviderConfig, ReadResponse, SendGridProvider, PROVIDER_NAME};
pub use resources::{Created, Observed, Resource, ResourceKind};
