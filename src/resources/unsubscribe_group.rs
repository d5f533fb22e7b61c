//! Unsubscribe (suppression) groups.

use super::{
    absent_on_not_found, non_empty, ok_on_not_found, require_client, Created, Observed, Resource,
    ResourceKind, PREVIEW_ID,
};
use crate::client::SendGridClient;
use crate::errors::SendGridResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Desired state of an unsubscribe group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeGroupArgs {
    /// Group name shown to recipients.
    pub name: String,
    /// Group description shown to recipients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Apply this group to mail sent without an explicit group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

/// Observed state of an unsubscribe group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeGroupState {
    /// Arguments as last observed.
    #[serde(flatten)]
    pub args: UnsubscribeGroupArgs,
    /// Group id.
    pub group_id: i64,
    /// Number of recipients unsubscribed from the group.
    #[serde(default)]
    pub unsubscribes: i64,
}

#[derive(Debug, Serialize)]
struct CreateGroupRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_default: Option<bool>,
}

#[derive(Debug, Serialize)]
struct UpdateGroupRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GroupResponse {
    id: i64,
    name: String,
    description: Option<String>,
    is_default: Option<bool>,
    unsubscribes: i64,
}

impl GroupResponse {
    /// `is_default` falls back to `known` when the response leaves it out.
    fn into_state(self, known: Option<bool>) -> UnsubscribeGroupState {
        UnsubscribeGroupState {
            args: UnsubscribeGroupArgs {
                name: self.name,
                description: self.description.and_then(non_empty),
                is_default: Some(self.is_default.or(known).unwrap_or(false)),
            },
            group_id: self.id,
            unsubscribes: self.unsubscribes,
        }
    }
}

/// Controller for `sendgrid:index:UnsubscribeGroup`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsubscribeGroup;

#[async_trait]
impl Resource for UnsubscribeGroup {
    const KIND: ResourceKind = ResourceKind::UnsubscribeGroup;
    type Args = UnsubscribeGroupArgs;
    type State = UnsubscribeGroupState;

    async fn create(
        &self,
        client: Option<&SendGridClient>,
        args: &UnsubscribeGroupArgs,
        dry_run: bool,
    ) -> SendGridResult<Created<UnsubscribeGroupState>> {
        if dry_run {
            return Ok(Created {
                id: PREVIEW_ID.to_string(),
                state: UnsubscribeGroupState {
                    args: UnsubscribeGroupArgs {
                        is_default: Some(args.is_default.unwrap_or(false)),
                        ..args.clone()
                    },
                    group_id: 0,
                    unsubscribes: 0,
                },
            });
        }

        let client = require_client(client)?;
        let request = CreateGroupRequest {
            name: &args.name,
            description: args.description.as_deref(),
            is_default: args.is_default,
        };

        let response: GroupResponse = client
            .post("/v3/asm/groups", &request)
            .await
            .map_err(|e| e.with_context("failed to create unsubscribe group"))?;

        let state = response.into_state(args.is_default);
        info!(group_id = state.group_id, "Created unsubscribe group");

        Ok(Created {
            id: state.group_id.to_string(),
            state,
        })
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn read(
        &self,
        client: &SendGridClient,
        id: &str,
        prior: &UnsubscribeGroupState,
    ) -> SendGridResult<Option<Observed<UnsubscribeGroupArgs, UnsubscribeGroupState>>> {
        let result = client.get::<GroupResponse>(&format!("/v3/asm/groups/{}", id)).await;
        let Some(response) = absent_on_not_found(result, "failed to read unsubscribe group")? else {
            return Ok(None);
        };

        let state = response.into_state(prior.args.is_default);
        Ok(Some(Observed {
            id: id.to_string(),
            args: state.args.clone(),
            state,
        }))
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn update(
        &self,
        client: Option<&SendGridClient>,
        id: &str,
        prior: &UnsubscribeGroupState,
        args: &UnsubscribeGroupArgs,
        dry_run: bool,
    ) -> SendGridResult<UnsubscribeGroupState> {
        if dry_run {
            return Ok(UnsubscribeGroupState {
                args: UnsubscribeGroupArgs {
                    is_default: prior.args.is_default,
                    ..args.clone()
                },
                ..prior.clone()
            });
        }

        let client = require_client(client)?;
        let request = UpdateGroupRequest {
            name: &args.name,
            description: args.description.as_deref(),
        };

        let response: GroupResponse = client
            .patch(&format!("/v3/asm/groups/{}", id), &request)
            .await
            .map_err(|e| e.with_context("failed to update unsubscribe group"))?;

        // PATCH does not accept is_default; the remote value stands.
        let state = response.into_state(prior.args.is_default);

        info!("Updated unsubscribe group");
        Ok(state)
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn delete(&self, client: &SendGridClient, id: &str, _state: &UnsubscribeGroupState) -> SendGridResult<()> {
        let result = client.delete(&format!("/v3/asm/groups/{}", id)).await;
        ok_on_not_found(result, "failed to delete unsubscribe group")?;
        info!("Deleted unsubscribe group");
        Ok(())
    }
}
