//! Teammates and teammate invitations.
//!
//! Creating a teammate sends an invitation. Until it is accepted the
//! teammate only exists as a pending invite, addressed by its token; once
//! accepted it gets a username. The resource id is always the email.

use super::{
    absent_on_not_found, non_empty, non_empty_vec, ok_on_not_found, require_client, Created,
    Observed, Resource, ResourceKind, COMPUTED, PREVIEW_ID,
};
use crate::client::{path_segment, SendGridClient};
use crate::errors::{SendGridError, SendGridResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Desired state of a teammate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeammateArgs {
    /// Invitee email. Immutable.
    pub email: String,
    /// Permission scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    /// Grant full admin access.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

/// Observed state of a teammate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeammateState {
    /// Arguments as last observed.
    #[serde(flatten)]
    pub args: TeammateArgs,
    /// Username, once the invite is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// First name, once the invite is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Last name, once the invite is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// `admin`, `owner` or `teammate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    /// Invitation token while the invite is pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl TeammateState {
    fn is_pending(&self) -> bool {
        self.username.is_none()
    }
}

#[derive(Debug, Serialize)]
struct InviteRequest<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    scopes: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_admin: Option<bool>,
}

#[derive(Debug, Serialize)]
struct UpdateTeammateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    scopes: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_admin: Option<bool>,
}

/// Covers both invitations and accepted teammates; each fills a subset.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TeammateResponse {
    email: String,
    scopes: Option<Vec<String>>,
    is_admin: bool,
    token: Option<String>,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    user_type: Option<String>,
}

impl TeammateResponse {
    fn into_state(self) -> TeammateState {
        TeammateState {
            args: TeammateArgs {
                email: self.email,
                scopes: self.scopes.and_then(non_empty_vec),
                is_admin: Some(self.is_admin),
            },
            username: self.username.and_then(non_empty),
            first_name: self.first_name.and_then(non_empty),
            last_name: self.last_name.and_then(non_empty),
            user_type: self.user_type.and_then(non_empty),
            token: self.token.and_then(non_empty),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TeammateList {
    result: Vec<TeammateResponse>,
}

fn teammate_path(username: &str) -> String {
    format!("/v3/teammates/{}", path_segment(username))
}

fn find_by_email(list: TeammateList, email: &str) -> Option<TeammateState> {
    list.result
        .into_iter()
        .find(|t| t.email == email)
        .map(TeammateResponse::into_state)
}

async fn lookup(client: &SendGridClient, id: &str, prior: &TeammateState) -> SendGridResult<Option<TeammateState>> {
    if let Some(username) = &prior.username {
        let result = client.get::<TeammateResponse>(&teammate_path(username)).await;
        let found = absent_on_not_found(result, "failed to read teammate")?;
        return Ok(found.map(TeammateResponse::into_state));
    }

    let pending: TeammateList = client
        .get("/v3/teammates/pending")
        .await
        .map_err(|e| e.with_context("failed to read pending teammates"))?;
    if let Some(state) = find_by_email(pending, id) {
        debug!("Teammate invite still pending");
        return Ok(Some(state));
    }

    let accepted: TeammateList = client
        .get("/v3/teammates")
        .await
        .map_err(|e| e.with_context("failed to list teammates"))?;
    Ok(find_by_email(accepted, id))
}

fn permissions_changed(prior: &TeammateArgs, args: &TeammateArgs) -> bool {
    let scopes = |a: &TeammateArgs| a.scopes.clone().and_then(non_empty_vec);
    let admin_changed = args
        .is_admin
        .is_some_and(|wanted| wanted != prior.is_admin.unwrap_or(false));
    scopes(prior) != scopes(args) || admin_changed
}

/// The email is the teammate's identity, and a pending invite cannot be
/// edited until it is accepted.
fn reject_unsupported_change(prior: &TeammateState, args: &TeammateArgs) -> SendGridResult<()> {
    if prior.args.email != args.email {
        return Err(SendGridError::unsupported(
            "teammate email cannot be changed - replace the teammate instead",
        ));
    }
    if prior.is_pending() && permissions_changed(&prior.args, args) {
        return Err(SendGridError::unsupported(
            "pending teammate invitations cannot be updated - wait for acceptance or replace the invitation",
        ));
    }
    Ok(())
}

/// Controller for `sendgrid:index:Teammate`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Teammate;

#[async_trait]
impl Resource for Teammate {
    const KIND: ResourceKind = ResourceKind::Teammate;
    type Args = TeammateArgs;
    type State = TeammateState;

    async fn create(
        &self,
        client: Option<&SendGridClient>,
        args: &TeammateArgs,
        dry_run: bool,
    ) -> SendGridResult<Created<TeammateState>> {
        if dry_run {
            return Ok(Created {
                id: PREVIEW_ID.to_string(),
                state: TeammateState {
                    args: TeammateArgs {
                        is_admin: Some(args.is_admin.unwrap_or(false)),
                        ..args.clone()
                    },
                    token: Some(COMPUTED.to_string()),
                    ..Default::default()
                },
            });
        }

        let client = require_client(client)?;
        let request = InviteRequest {
            email: &args.email,
            scopes: args.scopes.as_deref().filter(|s| !s.is_empty()),
            is_admin: args.is_admin,
        };

        let response: TeammateResponse = client
            .post("/v3/teammates", &request)
            .await
            .map_err(|e| e.with_context("failed to invite teammate"))?;

        info!("Invited teammate");
        Ok(Created {
            id: args.email.clone(),
            state: response.into_state(),
        })
    }

    #[instrument(skip_all)]
    async fn read(
        &self,
        client: &SendGridClient,
        id: &str,
        prior: &TeammateState,
    ) -> SendGridResult<Option<Observed<TeammateArgs, TeammateState>>> {
        let Some(state) = lookup(client, id, prior).await? else {
            return Ok(None);
        };

        Ok(Some(Observed {
            id: id.to_string(),
            args: state.args.clone(),
            state,
        }))
    }

    #[instrument(skip_all)]
    async fn update(
        &self,
        client: Option<&SendGridClient>,
        _id: &str,
        prior: &TeammateState,
        args: &TeammateArgs,
        dry_run: bool,
    ) -> SendGridResult<TeammateState> {
        reject_unsupported_change(prior, args)?;

        if dry_run {
            return Ok(TeammateState {
                args: TeammateArgs {
                    email: prior.args.email.clone(),
                    scopes: args.scopes.clone(),
                    is_admin: args.is_admin.or(prior.args.is_admin),
                },
                ..prior.clone()
            });
        }

        let client = require_client(client)?;

        let Some(username) = prior.username.as_deref() else {
            debug!("Teammate invite still pending and unchanged");
            return Ok(prior.clone());
        };

        let request = UpdateTeammateRequest {
            scopes: args.scopes.as_deref().filter(|s| !s.is_empty()),
            is_admin: args.is_admin,
        };

        let response: TeammateResponse = client
            .patch(&teammate_path(username), &request)
            .await
            .map_err(|e| e.with_context("failed to update teammate"))?;

        info!("Updated teammate");
        Ok(response.into_state())
    }

    #[instrument(skip_all)]
    async fn delete(&self, client: &SendGridClient, _id: &str, state: &TeammateState) -> SendGridResult<()> {
        if let Some(username) = &state.username {
            let result = client.delete(&teammate_path(username)).await;
            ok_on_not_found(result, "failed to delete teammate")?;
            info!("Deleted teammate");
        } else if let Some(token) = &state.token {
            let result = client
                .delete(&format!("/v3/teammates/pending/{}", path_segment(token)))
                .await;
            ok_on_not_found(result, "failed to delete pending teammate invitation")?;
            info!("Revoked teammate invitation");
        } else {
            debug!("No username or invite token, nothing to delete");
        }
        Ok(())
    }
}
