//! Account alerts: usage limit warnings and periodic stats emails.

use super::{
    absent_on_not_found, non_empty, ok_on_not_found, require_client, Created, Observed, Resource,
    ResourceKind, PREVIEW_ID,
};
use crate::client::SendGridClient;
use crate::errors::{SendGridError, SendGridResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, instrument};

/// Alert type. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Fires when usage crosses `percentage` of the plan limit.
    UsageLimit,
    /// Sends stats every `frequency`.
    StatsNotification,
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UsageLimit => write!(f, "usage_limit"),
            Self::StatsNotification => write!(f, "stats_notification"),
        }
    }
}

/// Desired state of an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertArgs {
    /// Alert type.
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    /// Recipient address.
    pub email_to: String,
    /// Usage threshold, required for `usage_limit`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<i64>,
    /// `daily`, `weekly` or `monthly`, required for `stats_notification`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
}

impl AlertArgs {
    fn validate(&self) -> SendGridResult<()> {
        match self.alert_type {
            AlertType::UsageLimit if self.percentage.is_none() => Err(SendGridError::invalid_argument(
                "percentage is required for usage_limit alerts",
            )),
            AlertType::StatsNotification if self.frequency.is_none() => Err(
                SendGridError::invalid_argument("frequency is required for stats_notification alerts"),
            ),
            _ => Ok(()),
        }
    }
}

/// Observed state of an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertState {
    /// Arguments as last observed.
    #[serde(flatten)]
    pub args: AlertArgs,
    /// Alert id.
    pub alert_id: i64,
    /// Creation time, unix seconds.
    #[serde(default)]
    pub created_at: i64,
    /// Last update time, unix seconds.
    #[serde(default)]
    pub updated_at: i64,
}

#[derive(Debug, Serialize)]
struct CreateAlertRequest<'a> {
    #[serde(rename = "type")]
    alert_type: AlertType,
    email_to: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    percentage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct UpdateAlertRequest<'a> {
    email_to: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    percentage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AlertResponse {
    id: i64,
    #[serde(rename = "type")]
    alert_type: Option<AlertType>,
    email_to: String,
    percentage: i64,
    frequency: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl AlertResponse {
    /// Falls back to `alert_type` when the API omits it.
    fn into_state(self, alert_type: AlertType) -> AlertState {
        AlertState {
            args: AlertArgs {
                alert_type: self.alert_type.unwrap_or(alert_type),
                email_to: self.email_to,
                percentage: (self.percentage > 0).then_some(self.percentage),
                frequency: self.frequency.and_then(non_empty),
            },
            alert_id: self.id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Controller for `sendgrid:index:Alert`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Alert;

#[async_trait]
impl Resource for Alert {
    const KIND: ResourceKind = ResourceKind::Alert;
    type Args = AlertArgs;
    type State = AlertState;

    async fn create(
        &self,
        client: Option<&SendGridClient>,
        args: &AlertArgs,
        dry_run: bool,
    ) -> SendGridResult<Created<AlertState>> {
        args.validate()?;

        if dry_run {
            return Ok(Created {
                id: PREVIEW_ID.to_string(),
                state: AlertState {
                    args: args.clone(),
                    alert_id: 0,
                    created_at: 0,
                    updated_at: 0,
                },
            });
        }

        let client = require_client(client)?;
        let request = CreateAlertRequest {
            alert_type: args.alert_type,
            email_to: &args.email_to,
            percentage: args.percentage,
            frequency: args.frequency.as_deref(),
        };

        let response: AlertResponse = client
            .post("/v3/alerts", &request)
            .await
            .map_err(|e| e.with_context("failed to create alert"))?;

        let state = response.into_state(args.alert_type);
        info!(alert_id = state.alert_id, alert_type = %state.args.alert_type, "Created alert");

        Ok(Created {
            id: state.alert_id.to_string(),
            state,
        })
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn read(
        &self,
        client: &SendGridClient,
        id: &str,
        prior: &AlertState,
    ) -> SendGridResult<Option<Observed<AlertArgs, AlertState>>> {
        let result = client.get::<AlertResponse>(&format!("/v3/alerts/{}", id)).await;
        let Some(response) = absent_on_not_found(result, "failed to read alert")? else {
            return Ok(None);
        };

        let state = response.into_state(prior.args.alert_type);
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
        prior: &AlertState,
        args: &AlertArgs,
        dry_run: bool,
    ) -> SendGridResult<AlertState> {
        args.validate()?;

        if dry_run {
            return Ok(AlertState {
                args: args.clone(),
                ..prior.clone()
            });
        }

        let client = require_client(client)?;
        let request = UpdateAlertRequest {
            email_to: &args.email_to,
            percentage: args.percentage,
            frequency: args.frequency.as_deref(),
        };

        let response: AlertResponse = client
            .patch(&format!("/v3/alerts/{}", id), &request)
            .await
            .map_err(|e| e.with_context("failed to update alert"))?;

        info!("Updated alert");
        Ok(response.into_state(args.alert_type))
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn delete(&self, client: &SendGridClient, id: &str, _state: &AlertState) -> SendGridResult<()> {
        let result = client.delete(&format!("/v3/alerts/{}", id)).await;
        ok_on_not_found(result, "failed to delete alert")?;
        info!("Deleted alert");
        Ok(())
    }
}
