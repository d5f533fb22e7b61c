//! Subuser accounts.
//!
//! Subusers are addressed by username. The password is write-only: it is
//! sent once at creation and afterwards only carried in state. Changing
//! `disabled` or `ips` takes separate calls, made in that order.

use super::{
    absent_on_not_found, expose_secret, non_empty, non_empty_vec, ok_on_not_found, require_client,
    Created, Observed, Resource, ResourceKind, PREVIEW_ID,
};
use crate::client::{path_segment, SendGridClient};
use crate::errors::{SendGridError, SendGridResult};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Desired state of a subuser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubuserArgs {
    /// Login name. Immutable.
    pub username: String,
    /// Contact email. Immutable.
    pub email: String,
    /// Initial password.
    #[serde(serialize_with = "expose_secret")]
    pub password: SecretString,
    /// Dedicated IPs assigned to the subuser.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ips: Option<Vec<String>>,
    /// Data residency region. Only honoured at creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Whether the account is disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

/// Observed state of a subuser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubuserState {
    /// Arguments as last observed.
    #[serde(flatten)]
    pub args: SubuserArgs,
    /// Numeric user id.
    pub user_id: i64,
}

impl SubuserState {
    fn is_disabled(&self) -> bool {
        self.args.disabled.unwrap_or(false)
    }
}

#[derive(Serialize)]
struct CreateSubuserRequest<'a> {
    username: &'a str,
    email: &'a str,
    #[serde(serialize_with = "expose_secret")]
    password: &'a SecretString,
    #[serde(skip_serializing_if = "Option::is_none")]
    ips: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_region: Option<bool>,
}

#[derive(Debug, Serialize)]
struct DisabledRequest {
    disabled: bool,
}

#[derive(Debug, Serialize)]
struct IpsRequest<'a> {
    ips: &'a [String],
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreateSubuserResponse {
    user_id: i64,
    username: String,
    email: String,
    ips: Option<Vec<String>>,
    region: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SubuserResponse {
    id: i64,
    username: String,
    email: String,
    disabled: bool,
}

fn subuser_path(username: &str) -> String {
    format!("/v3/subusers/{}", path_segment(username))
}

async fn set_disabled(client: &SendGridClient, username: &str, disabled: bool) -> SendGridResult<()> {
    client
        .patch_no_response(&subuser_path(username), &DisabledRequest { disabled })
        .await
}

/// Username and email are fixed once the subuser exists.
fn reject_identity_change(prior: &SubuserState, args: &SubuserArgs) -> SendGridResult<()> {
    if prior.args.username != args.username || prior.args.email != args.email {
        return Err(SendGridError::unsupported(
            "subuser username and email cannot be changed - replace the subuser instead",
        ));
    }
    Ok(())
}

/// Controller for `sendgrid:index:Subuser`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Subuser;

#[async_trait]
impl Resource for Subuser {
    const KIND: ResourceKind = ResourceKind::Subuser;
    type Args = SubuserArgs;
    type State = SubuserState;

    async fn create(
        &self,
        client: Option<&SendGridClient>,
        args: &SubuserArgs,
        dry_run: bool,
    ) -> SendGridResult<Created<SubuserState>> {
        if dry_run {
            return Ok(Created {
                id: PREVIEW_ID.to_string(),
                state: SubuserState {
                    args: SubuserArgs {
                        disabled: Some(args.disabled.unwrap_or(false)),
                        ..args.clone()
                    },
                    user_id: 0,
                },
            });
        }

        let client = require_client(client)?;
        let request = CreateSubuserRequest {
            username: &args.username,
            email: &args.email,
            password: &args.password,
            ips: args.ips.as_deref().filter(|ips| !ips.is_empty()),
            region: args.region.as_deref(),
            include_region: args.region.as_ref().map(|_| true),
        };

        let response: CreateSubuserResponse = client
            .post("/v3/subusers", &request)
            .await
            .map_err(|e| e.with_context("failed to create subuser"))?;

        // New subusers start enabled.
        let disabled = args.disabled == Some(true);
        if disabled {
            set_disabled(client, &args.username, true)
                .await
                .map_err(|e| e.with_context("subuser created but failed to disable"))?;
        }

        info!(username = %args.username, user_id = response.user_id, "Created subuser");

        Ok(Created {
            id: args.username.clone(),
            state: SubuserState {
                args: SubuserArgs {
                    username: response.username,
                    email: response.email,
                    password: args.password.clone(),
                    ips: response.ips.and_then(non_empty_vec),
                    region: response.region.and_then(non_empty),
                    disabled: Some(disabled),
                },
                user_id: response.user_id,
            },
        })
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn read(
        &self,
        client: &SendGridClient,
        id: &str,
        prior: &SubuserState,
    ) -> SendGridResult<Option<Observed<SubuserArgs, SubuserState>>> {
        let result = client.get::<SubuserResponse>(&subuser_path(id)).await;
        let Some(response) = absent_on_not_found(result, "failed to read subuser")? else {
            return Ok(None);
        };

        // The API does not report IPs, region or the password.
        let args = SubuserArgs {
            username: response.username,
            email: response.email,
            password: prior.args.password.clone(),
            ips: prior.args.ips.clone(),
            region: prior.args.region.clone(),
            disabled: Some(response.disabled),
        };

        Ok(Some(Observed {
            id: id.to_string(),
            args: args.clone(),
            state: SubuserState {
                args,
                user_id: response.id,
            },
        }))
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn update(
        &self,
        client: Option<&SendGridClient>,
        id: &str,
        prior: &SubuserState,
        args: &SubuserArgs,
        dry_run: bool,
    ) -> SendGridResult<SubuserState> {
        reject_identity_change(prior, args)?;

        let disabled = args.disabled.unwrap_or_else(|| prior.is_disabled());
        let next = SubuserState {
            args: SubuserArgs {
                username: prior.args.username.clone(),
                email: prior.args.email.clone(),
                password: args.password.clone(),
                ips: args.ips.clone(),
                region: args.region.clone(),
                disabled: Some(disabled),
            },
            user_id: prior.user_id,
        };

        if dry_run {
            return Ok(next);
        }

        let client = require_client(client)?;

        if let Some(wanted) = args.disabled.filter(|d| *d != prior.is_disabled()) {
            debug!(disabled = wanted, "Changing subuser status");
            set_disabled(client, id, wanted)
                .await
                .map_err(|e| e.with_context("failed to update subuser disabled status"))?;
        }

        if let Some(ips) = args.ips.as_deref().filter(|ips| !ips.is_empty()) {
            if prior.args.ips.as_deref() != Some(ips) {
                debug!(count = ips.len(), "Replacing subuser IPs");
                client
                    .put_no_response(&format!("{}/ips", subuser_path(id)), &IpsRequest { ips })
                    .await
                    .map_err(|e| e.with_context("failed to update subuser IPs"))?;
            }
        }

        info!("Updated subuser");
        Ok(next)
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn delete(&self, client: &SendGridClient, id: &str, _state: &SubuserState) -> SendGridResult<()> {
        let result = client.delete(&subuser_path(id)).await;
        ok_on_not_found(result, "failed to delete subuser")?;
        info!("Deleted subuser");
        Ok(())
    }
}
