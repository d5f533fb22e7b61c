//! Template versions: the subject and body content of a template.

use super::{
    absent_on_not_found, non_empty, ok_on_not_found, require_client, Created, Observed, Resource,
    ResourceKind, COMPUTED, PREVIEW_ID,
};
use crate::client::SendGridClient;
use crate::errors::{SendGridError, SendGridResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Editor used to author a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateVersionEditor {
    /// Code editor.
    Code,
    /// Drag-and-drop design editor.
    Design,
}

impl TemplateVersionEditor {
    fn from_wire(value: &str) -> Option<Self> {
        match value {
            "code" => Some(Self::Code),
            "design" => Some(Self::Design),
            _ => None,
        }
    }
}

/// Desired state of a template version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVersionArgs {
    /// Parent template id.
    pub template_id: String,
    /// Version name.
    pub name: String,
    /// Subject line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// HTML body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_content: Option<String>,
    /// Plain text body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain_content: Option<String>,
    /// 1 to make this the active version, 0 otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<i64>,
    /// Editor. Only honoured at creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<TemplateVersionEditor>,
    /// Derive the plain text body from the HTML body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_plain_content: Option<bool>,
    /// JSON test data for previews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_data: Option<String>,
}

/// Observed state of a template version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVersionState {
    /// Arguments as last observed.
    #[serde(flatten)]
    pub args: TemplateVersionArgs,
    /// Version id.
    pub version_id: String,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Thumbnail URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct TemplateVersionRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    html_content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plain_content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    active: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    editor: Option<TemplateVersionEditor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generate_plain_content: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    test_data: Option<&'a str>,
}

impl<'a> TemplateVersionRequest<'a> {
    fn create(args: &'a TemplateVersionArgs) -> Self {
        Self {
            name: &args.name,
            subject: args.subject.as_deref(),
            html_content: args.html_content.as_deref(),
            plain_content: args.plain_content.as_deref(),
            active: args.active,
            editor: args.editor,
            generate_plain_content: args.generate_plain_content,
            test_data: args.test_data.as_deref(),
        }
    }

    /// The editor cannot be switched on an existing version.
    fn update(args: &'a TemplateVersionArgs) -> Self {
        Self {
            editor: None,
            ..Self::create(args)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TemplateVersionResponse {
    id: String,
    template_id: String,
    name: String,
    subject: Option<String>,
    html_content: Option<String>,
    plain_content: Option<String>,
    active: i64,
    editor: Option<String>,
    generate_plain_content: bool,
    test_data: Option<String>,
    updated_at: Option<String>,
    thumbnail_url: Option<String>,
}

impl TemplateVersionResponse {
    fn into_state(self, template_id: &str) -> TemplateVersionState {
        let template_id = if self.template_id.is_empty() {
            template_id.to_string()
        } else {
            self.template_id
        };

        TemplateVersionState {
            args: TemplateVersionArgs {
                template_id,
                name: self.name,
                subject: self.subject.and_then(non_empty),
                html_content: self.html_content.and_then(non_empty),
                plain_content: self.plain_content.and_then(non_empty),
                active: Some(self.active),
                editor: self
                    .editor
                    .as_deref()
                    .and_then(TemplateVersionEditor::from_wire),
                generate_plain_content: Some(self.generate_plain_content),
                test_data: self.test_data.and_then(non_empty),
            },
            version_id: self.id,
            updated_at: self.updated_at.and_then(non_empty),
            thumbnail_url: self.thumbnail_url.and_then(non_empty),
        }
    }
}

fn version_path(template_id: &str, version_id: &str) -> String {
    format!("/v3/templates/{}/versions/{}", template_id, version_id)
}

fn reject_template_change(prior: &TemplateVersionState, args: &TemplateVersionArgs) -> SendGridResult<()> {
    if prior.args.template_id != args.template_id {
        return Err(SendGridError::unsupported(
            "template version cannot be moved to another template - replace the version instead",
        ));
    }
    Ok(())
}

/// Controller for `sendgrid:index:TemplateVersion`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateVersion;

#[async_trait]
impl Resource for TemplateVersion {
    const KIND: ResourceKind = ResourceKind::TemplateVersion;
    type Args = TemplateVersionArgs;
    type State = TemplateVersionState;

    async fn create(
        &self,
        client: Option<&SendGridClient>,
        args: &TemplateVersionArgs,
        dry_run: bool,
    ) -> SendGridResult<Created<TemplateVersionState>> {
        if dry_run {
            return Ok(Created {
                id: PREVIEW_ID.to_string(),
                state: TemplateVersionState {
                    args: args.clone(),
                    version_id: COMPUTED.to_string(),
                    updated_at: Some(COMPUTED.to_string()),
                    thumbnail_url: None,
                },
            });
        }

        let client = require_client(client)?;
        let path = format!("/v3/templates/{}/versions", args.template_id);

        let response: TemplateVersionResponse = client
            .post(&path, &TemplateVersionRequest::create(args))
            .await
            .map_err(|e| e.with_context("failed to create template version"))?;

        let state = response.into_state(&args.template_id);
        info!(
            template_id = %state.args.template_id,
            version_id = %state.version_id,
            "Created template version"
        );

        Ok(Created {
            id: state.version_id.clone(),
            state,
        })
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn read(
        &self,
        client: &SendGridClient,
        id: &str,
        prior: &TemplateVersionState,
    ) -> SendGridResult<Option<Observed<TemplateVersionArgs, TemplateVersionState>>> {
        let result = client
            .get::<TemplateVersionResponse>(&version_path(&prior.args.template_id, id))
            .await;
        let Some(response) = absent_on_not_found(result, "failed to read template version")? else {
            return Ok(None);
        };

        let state = response.into_state(&prior.args.template_id);
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
        prior: &TemplateVersionState,
        args: &TemplateVersionArgs,
        dry_run: bool,
    ) -> SendGridResult<TemplateVersionState> {
        reject_template_change(prior, args)?;

        if dry_run {
            return Ok(TemplateVersionState {
                args: args.clone(),
                ..prior.clone()
            });
        }

        let client = require_client(client)?;
        let response: TemplateVersionResponse = client
            .patch(
                &version_path(&args.template_id, id),
                &TemplateVersionRequest::update(args),
            )
            .await
            .map_err(|e| e.with_context("failed to update template version"))?;

        info!("Updated template version");
        Ok(response.into_state(&args.template_id))
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn delete(
        &self,
        client: &SendGridClient,
        id: &str,
        state: &TemplateVersionState,
    ) -> SendGridResult<()> {
        let result = client
            .delete(&version_path(&state.args.template_id, id))
            .await;
        ok_on_not_found(result, "failed to delete template version")?;
        info!("Deleted template version");
        Ok(())
    }
}
