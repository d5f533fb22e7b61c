//! API keys.
//!
//! The key value is returned exactly once, by the create call. Reads and
//! updates carry it forward from prior state.

use super::{
    absent_on_not_found, expose_optional_secret, non_empty_vec, ok_on_not_found,
    require_client, Created, Observed, Resource, ResourceKind, COMPUTED, PREVIEW_ID,
};
use crate::client::SendGridClient;
use crate::errors::SendGridResult;
use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Desired state of an API key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyArgs {
    /// Display name.
    pub name: String,
    /// Permission scopes. Absent means full access.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
}

/// Observed state of an API key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyState {
    /// Arguments as last observed.
    #[serde(flatten)]
    pub args: ApiKeyArgs,
    /// API key id.
    pub api_key_id: String,
    /// Secret key value, only known from the create response.
    #[serde(
        default,
        serialize_with = "expose_optional_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<SecretString>,
}

#[derive(Debug, Serialize)]
struct CreateApiKeyRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    scopes: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
struct UpdateApiKeyRequest<'a> {
    name: &'a str,
    scopes: &'a [String],
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiKeyResponse {
    api_key: Option<String>,
    api_key_id: String,
    name: String,
    scopes: Option<Vec<String>>,
}

impl ApiKeyResponse {
    fn into_args(self) -> (ApiKeyArgs, String, Option<String>) {
        let args = ApiKeyArgs {
            name: self.name,
            scopes: self.scopes.and_then(non_empty_vec),
        };
        (args, self.api_key_id, self.api_key)
    }
}

/// Controller for `sendgrid:index:ApiKey`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiKey;

#[async_trait]
impl Resource for ApiKey {
    const KIND: ResourceKind = ResourceKind::ApiKey;
    type Args = ApiKeyArgs;
    type State = ApiKeyState;

    async fn create(
        &self,
        client: Option<&SendGridClient>,
        args: &ApiKeyArgs,
        dry_run: bool,
    ) -> SendGridResult<Created<ApiKeyState>> {
        if dry_run {
            return Ok(Created {
                id: PREVIEW_ID.to_string(),
                state: ApiKeyState {
                    args: args.clone(),
                    api_key_id: COMPUTED.to_string(),
                    api_key: Some(SecretString::new(COMPUTED.to_string())),
                },
            });
        }

        let client = require_client(client)?;
        let request = CreateApiKeyRequest {
            name: &args.name,
            scopes: args.scopes.as_deref().filter(|s| !s.is_empty()),
        };

        let response: ApiKeyResponse = client
            .post("/v3/api_keys", &request)
            .await
            .map_err(|e| e.with_context("failed to create API key"))?;

        let (args, api_key_id, secret) = response.into_args();
        info!(api_key_id = %api_key_id, "Created API key");

        Ok(Created {
            id: api_key_id.clone(),
            state: ApiKeyState {
                args,
                api_key_id,
                api_key: secret.map(SecretString::new),
            },
        })
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn read(
        &self,
        client: &SendGridClient,
        id: &str,
        prior: &ApiKeyState,
    ) -> SendGridResult<Option<Observed<ApiKeyArgs, ApiKeyState>>> {
        let result = client.get::<ApiKeyResponse>(&format!("/v3/api_keys/{}", id)).await;
        let Some(response) = absent_on_not_found(result, "failed to read API key")? else {
            return Ok(None);
        };

        let (args, api_key_id, _) = response.into_args();
        Ok(Some(Observed {
            id: id.to_string(),
            args: args.clone(),
            state: ApiKeyState {
                args,
                api_key_id,
                api_key: prior.api_key.clone(),
            },
        }))
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn update(
        &self,
        client: Option<&SendGridClient>,
        id: &str,
        prior: &ApiKeyState,
        args: &ApiKeyArgs,
        dry_run: bool,
    ) -> SendGridResult<ApiKeyState> {
        if dry_run {
            return Ok(ApiKeyState {
                args: args.clone(),
                ..prior.clone()
            });
        }

        let client = require_client(client)?;
        // PUT replaces the scope list, so an absent list is sent as empty.
        let request = UpdateApiKeyRequest {
            name: &args.name,
            scopes: args.scopes.as_deref().unwrap_or(&[]),
        };

        let response: ApiKeyResponse = client
            .put(&format!("/v3/api_keys/{}", id), &request)
            .await
            .map_err(|e| e.with_context("failed to update API key"))?;

        let (args, api_key_id, _) = response.into_args();
        info!("Updated API key");

        Ok(ApiKeyState {
            args,
            api_key_id,
            api_key: prior.api_key.clone(),
        })
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn delete(&self, client: &SendGridClient, id: &str, _state: &ApiKeyState) -> SendGridResult<()> {
        let result = client.delete(&format!("/v3/api_keys/{}", id)).await;
        ok_on_not_found(result, "failed to delete API key")?;
        info!("Deleted API key");
        Ok(())
    }
}
