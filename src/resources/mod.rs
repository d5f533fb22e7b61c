//! Resource controllers.
//!
//! Every SendGrid resource kind implements [`Resource`]: a stateless
//! controller translating typed `Args`/`State` values to and from the v3 REST
//! API. State is always passed in and returned; nothing is cached between
//! calls.
//!
//! Shared rules:
//! - A dry run never touches the network and never needs a client.
//! - A 404 on read means the resource is gone; a 404 on delete is success.
//! - Fields the API never echoes back are carried forward from prior state.

mod alert;
mod api_key;
mod domain_authentication;
mod event_webhook;
mod global_suppression;
mod ip_pool;
mod link_branding;
mod subuser;
mod teammate;
mod template;
mod template_version;
mod unsubscribe_group;
mod verified_sender;

pub use alert::*;
pub use api_key::*;
pub use domain_authentication::*;
pub use event_webhook::*;
pub use global_suppression::*;
pub use ip_pool::*;
pub use link_branding::*;
pub use subuser::*;
pub use teammate::*;
pub use template::*;
pub use template_version::*;
pub use unsubscribe_group::*;
pub use verified_sender::*;

use crate::client::SendGridClient;
use crate::errors::{SendGridError, SendGridResult};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize, Serializer};
use std::fmt;
use tracing::debug;

/// Id returned by a dry-run create.
pub const PREVIEW_ID: &str = "[preview]";

/// Placeholder for computed string attributes during a dry run.
pub const COMPUTED: &str = "[computed]";

/// Token namespace shared by every resource kind.
pub const TOKEN_PREFIX: &str = "sendgrid:index:";

/// The closed set of resource kinds managed by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// API key.
    ApiKey,
    /// Transactional template.
    Template,
    /// Version of a transactional template.
    TemplateVersion,
    /// Verified single sender identity.
    VerifiedSender,
    /// Authenticated sending domain.
    DomainAuthentication,
    /// Branded link domain.
    LinkBranding,
    /// Dedicated IP pool.
    IpPool,
    /// Suppression (unsubscribe) group.
    UnsubscribeGroup,
    /// Global suppression entry.
    GlobalSuppression,
    /// Event webhook.
    EventWebhook,
    /// Subuser account.
    Subuser,
    /// Teammate or pending teammate invitation.
    Teammate,
    /// Usage or stats alert.
    Alert,
}

impl ResourceKind {
    /// Every kind, in registration order.
    pub const ALL: [ResourceKind; 13] = [
        Self::ApiKey,
        Self::Template,
        Self::TemplateVersion,
        Self::VerifiedSender,
        Self::DomainAuthentication,
        Self::LinkBranding,
        Self::IpPool,
        Self::UnsubscribeGroup,
        Self::GlobalSuppression,
        Self::EventWebhook,
        Self::Subuser,
        Self::Teammate,
        Self::Alert,
    ];

    /// Gets the bare kind name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ApiKey => "ApiKey",
            Self::Template => "Template",
            Self::TemplateVersion => "TemplateVersion",
            Self::VerifiedSender => "VerifiedSender",
            Self::DomainAuthentication => "DomainAuthentication",
            Self::LinkBranding => "LinkBranding",
            Self::IpPool => "IpPool",
            Self::UnsubscribeGroup => "UnsubscribeGroup",
            Self::GlobalSuppression => "GlobalSuppression",
            Self::EventWebhook => "EventWebhook",
            Self::Subuser => "Subuser",
            Self::Teammate => "Teammate",
            Self::Alert => "Alert",
        }
    }

    /// Gets the fully qualified token, e.g. `sendgrid:index:ApiKey`.
    pub fn token(&self) -> String {
        format!("{}{}", TOKEN_PREFIX, self.name())
    }

    /// Resolves a kind from a full token or a bare kind name.
    pub fn from_token(token: &str) -> Option<Self> {
        let name = token.strip_prefix(TOKEN_PREFIX).unwrap_or(token);
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Result of a create.
#[derive(Debug, Clone)]
pub struct Created<S> {
    /// Id the orchestrator uses to address the resource from now on.
    pub id: String,
    /// Resulting state.
    pub state: S,
}

/// Result of a read that found the resource.
#[derive(Debug, Clone)]
pub struct Observed<A, S> {
    /// Resource id.
    pub id: String,
    /// Arguments reconstructed from the observed state.
    pub args: A,
    /// Observed state.
    pub state: S,
}

/// Lifecycle contract shared by every resource controller.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Kind implemented by this controller.
    const KIND: ResourceKind;

    /// Declarative input.
    type Args: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync;

    /// Observed output; embeds `Args`.
    type State: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync;

    /// Creates the resource, or synthesizes a placeholder state on a dry run.
    async fn create(
        &self,
        client: Option<&SendGridClient>,
        args: &Self::Args,
        dry_run: bool,
    ) -> SendGridResult<Created<Self::State>>;

    /// Reads the resource. `Ok(None)` means it no longer exists.
    async fn read(
        &self,
        client: &SendGridClient,
        id: &str,
        prior: &Self::State,
    ) -> SendGridResult<Option<Observed<Self::Args, Self::State>>>;

    /// Updates the resource, or overlays `args` onto `prior` on a dry run.
    async fn update(
        &self,
        client: Option<&SendGridClient>,
        id: &str,
        prior: &Self::State,
        args: &Self::Args,
        dry_run: bool,
    ) -> SendGridResult<Self::State>;

    /// Deletes the resource. Deleting something already gone succeeds.
    async fn delete(&self, client: &SendGridClient, id: &str, state: &Self::State) -> SendGridResult<()>;
}

// Shared helpers

pub(crate) fn require_client(client: Option<&SendGridClient>) -> SendGridResult<&SendGridClient> {
    client.ok_or_else(SendGridError::not_configured)
}

/// Maps a 404 to `None`, wrapping any other error with `context`.
pub(crate) fn absent_on_not_found<T>(result: SendGridResult<T>, context: &str) -> SendGridResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => {
            debug!("Resource not found on read");
            Ok(None)
        }
        Err(e) => Err(e.with_context(context)),
    }
}

/// Treats a 404 as success, wrapping any other error with `context`.
pub(crate) fn ok_on_not_found(result: SendGridResult<()>, context: &str) -> SendGridResult<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => {
            debug!("Resource already deleted");
            Ok(())
        }
        Err(e) => Err(e.with_context(context)),
    }
}

pub(crate) fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

pub(crate) fn non_empty_vec<T>(values: Vec<T>) -> Option<Vec<T>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

pub(crate) fn true_or_none(value: bool) -> Option<bool> {
    value.then_some(true)
}

pub(crate) fn expose_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

pub(crate) fn expose_optional_secret<S: Serializer>(
    secret: &Option<SecretString>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(value) => serializer.serialize_some(value.expose_secret()),
        None => serializer.serialize_none(),
    }
}
