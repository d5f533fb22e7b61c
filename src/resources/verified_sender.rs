//! Verified single senders.
//!
//! The API has no get-by-id endpoint for senders, so reads list every sender
//! and scan for the id.

use super::{
    non_empty, ok_on_not_found, require_client, Created, Observed, Resource, ResourceKind,
    PREVIEW_ID,
};
use crate::client::SendGridClient;
use crate::errors::{SendGridError, SendGridResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Desired state of a verified sender.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedSenderArgs {
    /// Label for the sender.
    pub nickname: String,
    /// From address.
    pub from_email: String,
    /// From display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
    /// Reply-to address.
    pub reply_to: String,
    /// Reply-to display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_name: Option<String>,
    /// Street address.
    pub address: String,
    /// Second address line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    /// City.
    pub city: String,
    /// State or province.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Postal code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    /// Country.
    pub country: String,
}

/// Observed state of a verified sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedSenderState {
    /// Arguments as last observed.
    #[serde(flatten)]
    pub args: VerifiedSenderArgs,
    /// Sender id.
    pub sender_id: i64,
    /// Whether the sender confirmed the verification email.
    pub verified: bool,
    /// Whether the sender is locked against edits.
    pub locked: bool,
}

#[derive(Debug, Serialize)]
struct VerifiedSenderRequest<'a> {
    nickname: &'a str,
    from_email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    from_name: Option<&'a str>,
    reply_to: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_name: Option<&'a str>,
    address: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    address2: Option<&'a str>,
    city: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    zip: Option<&'a str>,
    country: &'a str,
}

impl<'a> VerifiedSenderRequest<'a> {
    fn create(args: &'a VerifiedSenderArgs) -> Self {
        Self {
            nickname: &args.nickname,
            from_email: &args.from_email,
            from_name: args.from_name.as_deref(),
            reply_to: &args.reply_to,
            reply_to_name: args.reply_to_name.as_deref(),
            address: &args.address,
            address2: args.address2.as_deref(),
            city: &args.city,
            state: args.state.as_deref(),
            zip: args.zip.as_deref(),
            country: &args.country,
        }
    }

    /// PATCH keeps fields it is not sent, so absent optionals are sent empty
    /// to clear them.
    fn update(args: &'a VerifiedSenderArgs) -> Self {
        let cleared = |value: &'a Option<String>| Some(value.as_deref().unwrap_or(""));
        Self {
            from_name: cleared(&args.from_name),
            reply_to_name: cleared(&args.reply_to_name),
            address2: cleared(&args.address2),
            state: cleared(&args.state),
            zip: cleared(&args.zip),
            ..Self::create(args)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VerifiedSenderResponse {
    id: i64,
    nickname: String,
    from_email: String,
    from_name: Option<String>,
    reply_to: String,
    reply_to_name: Option<String>,
    address: String,
    address2: Option<String>,
    city: String,
    state: Option<String>,
    zip: Option<String>,
    country: String,
    verified: bool,
    locked: bool,
}

impl VerifiedSenderResponse {
    fn into_state(self) -> VerifiedSenderState {
        VerifiedSenderState {
            args: VerifiedSenderArgs {
                nickname: self.nickname,
                from_email: self.from_email,
                from_name: self.from_name.and_then(non_empty),
                reply_to: self.reply_to,
                reply_to_name: self.reply_to_name.and_then(non_empty),
                address: self.address,
                address2: self.address2.and_then(non_empty),
                city: self.city,
                state: self.state.and_then(non_empty),
                zip: self.zip.and_then(non_empty),
                country: self.country,
            },
            sender_id: self.id,
            verified: self.verified,
            locked: self.locked,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VerifiedSenderList {
    results: Vec<VerifiedSenderResponse>,
}

fn parse_sender_id(id: &str) -> SendGridResult<i64> {
    id.parse::<i64>()
        .map_err(|e| SendGridError::invalid_argument(format!("invalid sender ID: {}", e)))
}

/// Controller for `sendgrid:index:VerifiedSender`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerifiedSender;

#[async_trait]
impl Resource for VerifiedSender {
    const KIND: ResourceKind = ResourceKind::VerifiedSender;
    type Args = VerifiedSenderArgs;
    type State = VerifiedSenderState;

    async fn create(
        &self,
        client: Option<&SendGridClient>,
        args: &VerifiedSenderArgs,
        dry_run: bool,
    ) -> SendGridResult<Created<VerifiedSenderState>> {
        if dry_run {
            return Ok(Created {
                id: PREVIEW_ID.to_string(),
                state: VerifiedSenderState {
                    args: args.clone(),
                    sender_id: 0,
                    verified: false,
                    locked: false,
                },
            });
        }

        let client = require_client(client)?;
        let response: VerifiedSenderResponse = client
            .post("/v3/verified_senders", &VerifiedSenderRequest::create(args))
            .await
            .map_err(|e| e.with_context("failed to create verified sender"))?;

        let state = response.into_state();
        info!(sender_id = state.sender_id, "Created verified sender");

        Ok(Created {
            id: state.sender_id.to_string(),
            state,
        })
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn read(
        &self,
        client: &SendGridClient,
        id: &str,
        _prior: &VerifiedSenderState,
    ) -> SendGridResult<Option<Observed<VerifiedSenderArgs, VerifiedSenderState>>> {
        let sender_id = parse_sender_id(id)?;

        let list: VerifiedSenderList = client
            .get("/v3/verified_senders")
            .await
            .map_err(|e| e.with_context("failed to list verified senders"))?;

        let Some(found) = list.results.into_iter().find(|s| s.id == sender_id) else {
            debug!("Verified sender no longer listed");
            return Ok(None);
        };

        let state = found.into_state();
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
        prior: &VerifiedSenderState,
        args: &VerifiedSenderArgs,
        dry_run: bool,
    ) -> SendGridResult<VerifiedSenderState> {
        if dry_run {
            return Ok(VerifiedSenderState {
                args: args.clone(),
                ..prior.clone()
            });
        }

        let client = require_client(client)?;
        let response: VerifiedSenderResponse = client
            .patch(
                &format!("/v3/verified_senders/{}", id),
                &VerifiedSenderRequest::update(args),
            )
            .await
            .map_err(|e| e.with_context("failed to update verified sender"))?;

        info!("Updated verified sender");
        Ok(response.into_state())
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn delete(
        &self,
        client: &SendGridClient,
        id: &str,
        _state: &VerifiedSenderState,
    ) -> SendGridResult<()> {
        let result = client.delete(&format!("/v3/verified_senders/{}", id)).await;
        ok_on_not_found(result, "failed to delete verified sender")?;
        info!("Deleted verified sender");
        Ok(())
    }
}
