//! Event webhooks: HTTP callbacks for delivery and engagement events.

use super::{
    absent_on_not_found, non_empty, ok_on_not_found, require_client, Created, Observed, Resource,
    ResourceKind, COMPUTED, PREVIEW_ID,
};
use crate::client::SendGridClient;
use crate::errors::SendGridResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Desired state of an event webhook.
///
/// Each event flag selects whether that event type is posted to `url`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWebhookArgs {
    /// Receiving endpoint.
    pub url: String,
    /// Whether the webhook posts at all. Defaults to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    /// Receiving server rejected the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounce: Option<bool>,
    /// Recipient clicked a tracked link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click: Option<bool>,
    /// Receiving server temporarily rejected the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deferred: Option<bool>,
    /// Message was accepted by the receiving server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered: Option<bool>,
    /// Message was dropped before sending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropped: Option<bool>,
    /// Recipient opened the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<bool>,
    /// Message was accepted for sending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed: Option<bool>,
    /// Recipient marked the message as spam.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spam_report: Option<bool>,
    /// Recipient unsubscribed from all mail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsubscribe: Option<bool>,
    /// Recipient resubscribed to an unsubscribe group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_resubscribe: Option<bool>,
    /// Recipient unsubscribed from an unsubscribe group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_unsubscribe: Option<bool>,
}

/// Observed state of an event webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWebhookState {
    /// Arguments as last observed.
    #[serde(flatten)]
    pub args: EventWebhookArgs,
    /// Webhook id.
    pub webhook_id: String,
}

/// Wire body for both create and update.
#[derive(Debug, Serialize)]
struct WebhookRequest<'a> {
    url: &'a str,
    enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    friendly_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bounce: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    click: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deferred: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    delivered: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dropped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    open: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    processed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    spam_report: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unsubscribe: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_resubscribe: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_unsubscribe: Option<bool>,
}

impl<'a> From<&'a EventWebhookArgs> for WebhookRequest<'a> {
    fn from(args: &'a EventWebhookArgs) -> Self {
        Self {
            url: &args.url,
            enabled: args.enabled.unwrap_or(true),
            friendly_name: args.friendly_name.as_deref(),
            bounce: args.bounce,
            click: args.click,
            deferred: args.deferred,
            delivered: args.delivered,
            dropped: args.dropped,
            open: args.open,
            processed: args.processed,
            spam_report: args.spam_report,
            unsubscribe: args.unsubscribe,
            group_resubscribe: args.group_resubscribe,
            group_unsubscribe: args.group_unsubscribe,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebhookResponse {
    id: String,
    url: String,
    enabled: bool,
    friendly_name: Option<String>,
    bounce: bool,
    click: bool,
    deferred: bool,
    delivered: bool,
    dropped: bool,
    open: bool,
    processed: bool,
    spam_report: bool,
    unsubscribe: bool,
    group_resubscribe: bool,
    group_unsubscribe: bool,
}

impl WebhookResponse {
    fn into_state(self) -> EventWebhookState {
        EventWebhookState {
            args: EventWebhookArgs {
                url: self.url,
                enabled: Some(self.enabled),
                friendly_name: self.friendly_name.and_then(non_empty),
                bounce: Some(self.bounce),
                click: Some(self.click),
                deferred: Some(self.deferred),
                delivered: Some(self.delivered),
                dropped: Some(self.dropped),
                open: Some(self.open),
                processed: Some(self.processed),
                spam_report: Some(self.spam_report),
                unsubscribe: Some(self.unsubscribe),
                group_resubscribe: Some(self.group_resubscribe),
                group_unsubscribe: Some(self.group_unsubscribe),
            },
            webhook_id: self.id,
        }
    }
}

const SETTINGS_PATH: &str = "/v3/user/webhooks/event/settings";

/// Controller for `sendgrid:index:EventWebhook`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventWebhook;

#[async_trait]
impl Resource for EventWebhook {
    const KIND: ResourceKind = ResourceKind::EventWebhook;
    type Args = EventWebhookArgs;
    type State = EventWebhookState;

    async fn create(
        &self,
        client: Option<&SendGridClient>,
        args: &EventWebhookArgs,
        dry_run: bool,
    ) -> SendGridResult<Created<EventWebhookState>> {
        if dry_run {
            return Ok(Created {
                id: PREVIEW_ID.to_string(),
                state: EventWebhookState {
                    args: EventWebhookArgs {
                        enabled: Some(args.enabled.unwrap_or(true)),
                        ..args.clone()
                    },
                    webhook_id: COMPUTED.to_string(),
                },
            });
        }

        let client = require_client(client)?;
        let response: WebhookResponse = client
            .post(SETTINGS_PATH, &WebhookRequest::from(args))
            .await
            .map_err(|e| e.with_context("failed to create event webhook"))?;

        let state = response.into_state();
        info!(webhook_id = %state.webhook_id, "Created event webhook");

        Ok(Created {
            id: state.webhook_id.clone(),
            state,
        })
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn read(
        &self,
        client: &SendGridClient,
        id: &str,
        _prior: &EventWebhookState,
    ) -> SendGridResult<Option<Observed<EventWebhookArgs, EventWebhookState>>> {
        let result = client
            .get::<WebhookResponse>(&format!("{}/{}", SETTINGS_PATH, id))
            .await;
        let Some(response) = absent_on_not_found(result, "failed to read event webhook")? else {
            return Ok(None);
        };

        let state = response.into_state();
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
        prior: &EventWebhookState,
        args: &EventWebhookArgs,
        dry_run: bool,
    ) -> SendGridResult<EventWebhookState> {
        if dry_run {
            return Ok(EventWebhookState {
                args: args.clone(),
                webhook_id: prior.webhook_id.clone(),
            });
        }

        let client = require_client(client)?;
        let response: WebhookResponse = client
            .patch(&format!("{}/{}", SETTINGS_PATH, id), &WebhookRequest::from(args))
            .await
            .map_err(|e| e.with_context("failed to update event webhook"))?;

        info!("Updated event webhook");
        Ok(response.into_state())
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn delete(&self, client: &SendGridClient, id: &str, _state: &EventWebhookState) -> SendGridResult<()> {
        let result = client.delete(&format!("{}/{}", SETTINGS_PATH, id)).await;
        ok_on_not_found(result, "failed to delete event webhook")?;
        info!("Deleted event webhook");
        Ok(())
    }
}
