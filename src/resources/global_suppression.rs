//! Global suppressions: addresses that never receive mail.
//!
//! The suppression is addressed by its email, which is percent-encoded into
//! the path. There is nothing to update; a different email is a different
//! suppression.

use super::{absent_on_not_found, ok_on_not_found, require_client, Created, Observed, Resource, ResourceKind, PREVIEW_ID};
use crate::client::{path_segment, SendGridClient};
use crate::errors::{SendGridError, SendGridResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Desired state of a global suppression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSuppressionArgs {
    /// Suppressed address.
    pub email: String,
}

/// Observed state of a global suppression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSuppressionState {
    /// Arguments as last observed.
    #[serde(flatten)]
    pub args: GlobalSuppressionArgs,
    /// Always 0; the API does not report when the suppression was added.
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Serialize)]
struct AddSuppressionsRequest<'a> {
    recipient_emails: [&'a str; 1],
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AddSuppressionsResponse {
    recipient_emails: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SuppressionResponse {
    recipient_email: String,
}

fn suppression_path(email: &str) -> String {
    format!("/v3/asm/suppressions/global/{}", path_segment(email))
}

/// Controller for `sendgrid:index:GlobalSuppression`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalSuppression;

#[async_trait]
impl Resource for GlobalSuppression {
    const KIND: ResourceKind = ResourceKind::GlobalSuppression;
    type Args = GlobalSuppressionArgs;
    type State = GlobalSuppressionState;

    async fn create(
        &self,
        client: Option<&SendGridClient>,
        args: &GlobalSuppressionArgs,
        dry_run: bool,
    ) -> SendGridResult<Created<GlobalSuppressionState>> {
        let state = GlobalSuppressionState {
            args: args.clone(),
            created_at: 0,
        };

        if dry_run {
            return Ok(Created {
                id: PREVIEW_ID.to_string(),
                state,
            });
        }

        let client = require_client(client)?;
        let request = AddSuppressionsRequest {
            recipient_emails: [args.email.as_str()],
        };

        let response: AddSuppressionsResponse = client
            .post("/v3/asm/suppressions/global", &request)
            .await
            .map_err(|e| e.with_context("failed to add email to global suppression"))?;

        if !response.recipient_emails.iter().any(|e| e == &args.email) {
            return Err(SendGridError::unexpected_response(
                "email was not added to global suppression list",
            ));
        }

        info!("Added global suppression");
        Ok(Created {
            id: args.email.clone(),
            state,
        })
    }

    #[instrument(skip_all)]
    async fn read(
        &self,
        client: &SendGridClient,
        id: &str,
        prior: &GlobalSuppressionState,
    ) -> SendGridResult<Option<Observed<GlobalSuppressionArgs, GlobalSuppressionState>>> {
        let result = client.get::<SuppressionResponse>(&suppression_path(id)).await;
        let Some(response) = absent_on_not_found(result, "failed to read global suppression")? else {
            return Ok(None);
        };

        // An unsuppressed address comes back as an empty object.
        if response.recipient_email.is_empty() {
            debug!("Address is no longer suppressed");
            return Ok(None);
        }

        let args = GlobalSuppressionArgs {
            email: id.to_string(),
        };
        Ok(Some(Observed {
            id: id.to_string(),
            args: args.clone(),
            state: GlobalSuppressionState {
                args,
                created_at: prior.created_at,
            },
        }))
    }

    async fn update(
        &self,
        _client: Option<&SendGridClient>,
        _id: &str,
        _prior: &GlobalSuppressionState,
        _args: &GlobalSuppressionArgs,
        _dry_run: bool,
    ) -> SendGridResult<GlobalSuppressionState> {
        Err(SendGridError::unsupported(
            "global suppressions cannot be updated - email changes require replacement",
        ))
    }

    #[instrument(skip_all)]
    async fn delete(&self, client: &SendGridClient, id: &str, _state: &GlobalSuppressionState) -> SendGridResult<()> {
        let result = client.delete(&suppression_path(id)).await;
        ok_on_not_found(result, "failed to delete global suppression")?;
        info!("Removed global suppression");
        Ok(())
    }
}
