//! Transactional templates.

use super::{
    absent_on_not_found, non_empty, ok_on_not_found, require_client, Created, Observed, Resource,
    ResourceKind, COMPUTED, PREVIEW_ID,
};
use crate::client::SendGridClient;
use crate::errors::{SendGridError, SendGridResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Template generation. Fixed at creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateGeneration {
    /// Plain text and HTML content.
    Legacy,
    /// Handlebars content.
    #[default]
    Dynamic,
}

/// Desired state of a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateArgs {
    /// Template name.
    pub name: String,
    /// Template generation.
    #[serde(default)]
    pub generation: TemplateGeneration,
}

/// Read-only summary of a template version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVersionSummary {
    /// Version id.
    pub id: String,
    /// Parent template id.
    pub template_id: String,
    /// Version name.
    pub name: String,
    /// Whether this is the active version.
    pub active: bool,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Observed state of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateState {
    /// Arguments as last observed.
    #[serde(flatten)]
    pub args: TemplateArgs,
    /// Template id.
    pub template_id: String,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Versions attached to the template.
    #[serde(default)]
    pub versions: Vec<TemplateVersionSummary>,
}

#[derive(Debug, Serialize)]
struct CreateTemplateRequest<'a> {
    name: &'a str,
    generation: TemplateGeneration,
}

#[derive(Debug, Serialize)]
struct UpdateTemplateRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TemplateVersionResponse {
    id: String,
    template_id: String,
    name: String,
    active: i64,
    updated_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TemplateResponse {
    id: String,
    name: String,
    generation: Option<TemplateGeneration>,
    updated_at: Option<String>,
    versions: Vec<TemplateVersionResponse>,
}

impl TemplateResponse {
    /// Falls back to `generation` when the API omits it.
    fn into_state(self, generation: TemplateGeneration) -> TemplateState {
        let versions = self
            .versions
            .into_iter()
            .map(|v| TemplateVersionSummary {
                id: v.id,
                template_id: v.template_id,
                name: v.name,
                active: v.active == 1,
                updated_at: v.updated_at.and_then(non_empty),
            })
            .collect();

        TemplateState {
            args: TemplateArgs {
                name: self.name,
                generation: self.generation.unwrap_or(generation),
            },
            template_id: self.id,
            updated_at: self.updated_at.and_then(non_empty),
            versions,
        }
    }
}

fn reject_generation_change(prior: &TemplateState, args: &TemplateArgs) -> SendGridResult<()> {
    if prior.args.generation != args.generation {
        return Err(SendGridError::unsupported(
            "template generation cannot be changed after creation - replace the template instead",
        ));
    }
    Ok(())
}

/// Controller for `sendgrid:index:Template`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Template;

#[async_trait]
impl Resource for Template {
    const KIND: ResourceKind = ResourceKind::Template;
    type Args = TemplateArgs;
    type State = TemplateState;

    async fn create(
        &self,
        client: Option<&SendGridClient>,
        args: &TemplateArgs,
        dry_run: bool,
    ) -> SendGridResult<Created<TemplateState>> {
        if dry_run {
            return Ok(Created {
                id: PREVIEW_ID.to_string(),
                state: TemplateState {
                    args: args.clone(),
                    template_id: COMPUTED.to_string(),
                    updated_at: Some(COMPUTED.to_string()),
                    versions: Vec::new(),
                },
            });
        }

        let client = require_client(client)?;
        let request = CreateTemplateRequest {
            name: &args.name,
            generation: args.generation,
        };

        let response: TemplateResponse = client
            .post("/v3/templates", &request)
            .await
            .map_err(|e| e.with_context("failed to create template"))?;

        let state = response.into_state(args.generation);
        info!(template_id = %state.template_id, "Created template");

        Ok(Created {
            id: state.template_id.clone(),
            state,
        })
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn read(
        &self,
        client: &SendGridClient,
        id: &str,
        prior: &TemplateState,
    ) -> SendGridResult<Option<Observed<TemplateArgs, TemplateState>>> {
        let result = client.get::<TemplateResponse>(&format!("/v3/templates/{}", id)).await;
        let Some(response) = absent_on_not_found(result, "failed to read template")? else {
            return Ok(None);
        };

        let state = response.into_state(prior.args.generation);
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
        prior: &TemplateState,
        args: &TemplateArgs,
        dry_run: bool,
    ) -> SendGridResult<TemplateState> {
        reject_generation_change(prior, args)?;

        if dry_run {
            return Ok(TemplateState {
                args: args.clone(),
                ..prior.clone()
            });
        }

        let client = require_client(client)?;
        let request = UpdateTemplateRequest { name: &args.name };

        let response: TemplateResponse = client
            .patch(&format!("/v3/templates/{}", id), &request)
            .await
            .map_err(|e| e.with_context("failed to update template"))?;

        info!("Updated template");
        Ok(response.into_state(prior.args.generation))
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn delete(&self, client: &SendGridClient, id: &str, _state: &TemplateState) -> SendGridResult<()> {
        let result = client.delete(&format!("/v3/templates/{}", id)).await;
        ok_on_not_found(result, "failed to delete template")?;
        info!("Deleted template");
        Ok(())
    }
}
