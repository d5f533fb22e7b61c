//! Provider surface: configuration and token-based dispatch.
//!
//! An orchestrator talks to the provider in resource tokens
//! (`sendgrid:index:<Kind>`) and camelCase JSON. [`SendGridProvider`]
//! resolves the token to a controller, decodes the JSON into that
//! controller's typed `Args`/`State`, and encodes the result back.

use crate::auth::{ApiKey, CredentialProvider, EnvCredentialProvider};
use crate::client::SendGridClient;
use crate::errors::{SendGridError, SendGridResult};
use crate::resources::{self, Created, Observed, Resource, ResourceKind};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

/// Package name the provider registers under.
pub const PROVIDER_NAME: &str = "sendgrid";

const MISSING_KEY_MESSAGE: &str = "SendGrid API key is required. Set it via the 'apiKey' provider config or SENDGRID_API_KEY environment variable";

/// Calls `$op` with the controller for `$kind` followed by `$args`.
macro_rules! dispatch {
    ($kind:expr, $op:ident($($arg:expr),*)) => {
        match $kind {
            ResourceKind::ApiKey => $op(resources::ApiKey, $($arg),*).await,
            ResourceKind::Template => $op(resources::Template, $($arg),*).await,
            ResourceKind::TemplateVersion => $op(resources::TemplateVersion, $($arg),*).await,
            ResourceKind::VerifiedSender => $op(resources::VerifiedSender, $($arg),*).await,
            ResourceKind::DomainAuthentication => $op(resources::DomainAuthentication, $($arg),*).await,
            ResourceKind::LinkBranding => $op(resources::LinkBranding, $($arg),*).await,
            ResourceKind::IpPool => $op(resources::IpPool, $($arg),*).await,
            ResourceKind::UnsubscribeGroup => $op(resources::UnsubscribeGroup, $($arg),*).await,
            ResourceKind::GlobalSuppression => $op(resources::GlobalSuppression, $($arg),*).await,
            ResourceKind::EventWebhook => $op(resources::EventWebhook, $($arg),*).await,
            ResourceKind::Subuser => $op(resources::Subuser, $($arg),*).await,
            ResourceKind::Teammate => $op(resources::Teammate, $($arg),*).await,
            ResourceKind::Alert => $op(resources::Alert, $($arg),*).await,
        }
    };
}

/// Provider-level configuration as sent by the orchestrator.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// API key. Falls back to `SENDGRID_API_KEY` when absent or empty.
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// API base URL. Defaults to `https://api.sendgrid.com`.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ProviderConfig {
    fn configured_key(&self) -> Option<ApiKey> {
        self.api_key
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .map(|key| ApiKey::from_secret(key.clone()))
    }
}

/// Result of a dispatched create.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateResponse {
    /// Resource id.
    pub id: String,
    /// Encoded state.
    pub state: Value,
}

/// Result of a dispatched read that found the resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadResponse {
    /// Resource id.
    pub id: String,
    /// Encoded arguments reconstructed from the observed state.
    pub inputs: Value,
    /// Encoded state.
    pub state: Value,
}

/// SendGrid resource provider.
///
/// Starts unconfigured. Dry-run creates and updates work without
/// configuration; everything else needs [`SendGridProvider::configure`]
/// first.
#[derive(Debug, Default)]
pub struct SendGridProvider {
    client: Option<SendGridClient>,
}

impl SendGridProvider {
    /// Creates an unconfigured provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider around an existing client.
    pub fn with_client(client: SendGridClient) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Configures the provider, reading the key from `config` or the
    /// `SENDGRID_API_KEY` environment variable.
    pub async fn configure(&mut self, config: ProviderConfig) -> SendGridResult<()> {
        self.configure_with(config, &EnvCredentialProvider::sendgrid())
            .await
    }

    /// Configures the provider, consulting `fallback` when `config` has no key.
    pub async fn configure_with(
        &mut self,
        config: ProviderConfig,
        fallback: &dyn CredentialProvider,
    ) -> SendGridResult<()> {
        let key = match config.configured_key() {
            Some(key) => key,
            None => fallback
                .api_key()
                .await
                .ok()
                .filter(|key| !key.is_blank())
                .ok_or_else(|| SendGridError::missing_auth(MISSING_KEY_MESSAGE))?,
        };

        let client = SendGridClient::builder()
            .auth(key.clone())
            .base_url(config.base_url.unwrap_or_default())
            .build()?;

        info!(base_url = %client.base_url(), api_key = key.redacted(), "Configured SendGrid provider");
        self.client = Some(client);
        Ok(())
    }

    /// Gets the configured client, if any.
    pub fn client(&self) -> Option<&SendGridClient> {
        self.client.as_ref()
    }

    /// Returns true once `configure` has succeeded.
    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    fn require_client(&self) -> SendGridResult<&SendGridClient> {
        self.client.as_ref().ok_or_else(SendGridError::not_configured)
    }

    /// Creates a resource of kind `token` from camelCase `args`.
    #[instrument(skip(self, args))]
    pub async fn create(&self, token: &str, args: Value, dry_run: bool) -> SendGridResult<CreateResponse> {
        let kind = resolve(token)?;
        let client = self.client();
        dispatch!(kind, create_as(client, args, dry_run))
    }

    /// Reads a resource. `Ok(None)` means it no longer exists.
    #[instrument(skip(self, prior))]
    pub async fn read(&self, token: &str, id: &str, prior: Value) -> SendGridResult<Option<ReadResponse>> {
        let kind = resolve(token)?;
        let client = self.require_client()?;
        dispatch!(kind, read_as(client, id, prior))
    }

    /// Updates a resource from `prior` state towards `args`.
    #[instrument(skip(self, prior, args))]
    pub async fn update(
        &self,
        token: &str,
        id: &str,
        prior: Value,
        args: Value,
        dry_run: bool,
    ) -> SendGridResult<Value> {
        let kind = resolve(token)?;
        let client = self.client();
        dispatch!(kind, update_as(client, id, prior, args, dry_run))
    }

    /// Deletes a resource. Deleting something already gone succeeds.
    #[instrument(skip(self, state))]
    pub async fn delete(&self, token: &str, id: &str, state: Value) -> SendGridResult<()> {
        let kind = resolve(token)?;
        let client = self.require_client()?;
        dispatch!(kind, delete_as(client, id, state))
    }
}

fn resolve(token: &str) -> SendGridResult<ResourceKind> {
    ResourceKind::from_token(token).ok_or_else(|| SendGridError::unknown_resource(token))
}

fn decode<T: DeserializeOwned>(kind: ResourceKind, what: &str, value: Value) -> SendGridResult<T> {
    serde_json::from_value(value)
        .map_err(|e| SendGridError::invalid_argument(format!("invalid {} {}: {}", kind, what, e)))
}

async fn create_as<R: Resource>(
    resource: R,
    client: Option<&SendGridClient>,
    args: Value,
    dry_run: bool,
) -> SendGridResult<CreateResponse> {
    let args: R::Args = decode(R::KIND, "inputs", args)?;
    let Created { id, state } = resource.create(client, &args, dry_run).await?;
    debug!(kind = %R::KIND, id = %id, dry_run, "Dispatched create");
    Ok(CreateResponse {
        id,
        state: serde_json::to_value(&state)?,
    })
}

async fn read_as<R: Resource>(
    resource: R,
    client: &SendGridClient,
    id: &str,
    prior: Value,
) -> SendGridResult<Option<ReadResponse>> {
    let prior: R::State = decode(R::KIND, "state", prior)?;
    let Some(Observed { id, args, state }) = resource.read(client, id, &prior).await? else {
        debug!(kind = %R::KIND, "Resource no longer exists");
        return Ok(None);
    };
    Ok(Some(ReadResponse {
        id,
        inputs: serde_json::to_value(&args)?,
        state: serde_json::to_value(&state)?,
    }))
}

async fn update_as<R: Resource>(
    resource: R,
    client: Option<&SendGridClient>,
    id: &str,
    prior: Value,
    args: Value,
    dry_run: bool,
) -> SendGridResult<Value> {
    let prior: R::State = decode(R::KIND, "state", prior)?;
    let args: R::Args = decode(R::KIND, "inputs", args)?;
    let state = resource.update(client, id, &prior, &args, dry_run).await?;
    Ok(serde_json::to_value(&state)?)
}

async fn delete_as<R: Resource>(resource: R, client: &SendGridClient, id: &str, state: Value) -> SendGridResult<()> {
    let state: R::State = decode(R::KIND, "state", state)?;
    resource.delete(client, id, &state).await
}
