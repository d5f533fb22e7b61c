//! Link branding: serving tracked links from the customer's own domain.

use super::{
    absent_on_not_found, non_empty, ok_on_not_found, require_client, true_or_none, Created,
    DnsRecord, Observed, Resource, ResourceKind, PREVIEW_ID,
};
use crate::client::SendGridClient;
use crate::errors::SendGridResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Desired state of a branded link domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkBrandingArgs {
    /// Root domain.
    pub domain: String,
    /// Subdomain for links. Generated by SendGrid when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    /// Use as the default link branding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,
    /// `global` or `eu`. Only honoured at creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Observed state of a branded link domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkBrandingState {
    /// Arguments as last observed.
    #[serde(flatten)]
    pub args: LinkBrandingArgs,
    /// Link branding id.
    pub link_id: i64,
    /// Owning user id.
    pub user_id: i64,
    /// Owning username.
    #[serde(default)]
    pub username: String,
    /// Whether the DNS records validated.
    pub valid: bool,
    /// Whether this is a legacy whitelabel.
    pub legacy: bool,
    /// Ownership verification CNAME.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_cname: Option<DnsRecord>,
    /// Branding CNAME.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_cname: Option<DnsRecord>,
}

#[derive(Debug, Serialize)]
struct CreateLinkRequest<'a> {
    domain: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    subdomain: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct UpdateLinkRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LinkDnsResponse {
    owner_cname: Option<DnsRecord>,
    brand_cname: Option<DnsRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LinkResponse {
    id: i64,
    user_id: i64,
    domain: String,
    subdomain: Option<String>,
    username: Option<String>,
    default: bool,
    valid: bool,
    legacy: bool,
    dns: LinkDnsResponse,
}

impl LinkResponse {
    fn into_state(self, region: Option<String>) -> LinkBrandingState {
        LinkBrandingState {
            args: LinkBrandingArgs {
                domain: self.domain,
                subdomain: self.subdomain.and_then(non_empty),
                default: true_or_none(self.default),
                region,
            },
            link_id: self.id,
            user_id: self.user_id,
            username: self.username.unwrap_or_default(),
            valid: self.valid,
            legacy: self.legacy,
            owner_cname: DnsRecord::issued(self.dns.owner_cname),
            brand_cname: DnsRecord::issued(self.dns.brand_cname),
        }
    }
}

/// Controller for `sendgrid:index:LinkBranding`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkBranding;

#[async_trait]
impl Resource for LinkBranding {
    const KIND: ResourceKind = ResourceKind::LinkBranding;
    type Args = LinkBrandingArgs;
    type State = LinkBrandingState;

    async fn create(
        &self,
        client: Option<&SendGridClient>,
        args: &LinkBrandingArgs,
        dry_run: bool,
    ) -> SendGridResult<Created<LinkBrandingState>> {
        if dry_run {
            return Ok(Created {
                id: PREVIEW_ID.to_string(),
                state: LinkBrandingState {
                    args: args.clone(),
                    link_id: 0,
                    user_id: 0,
                    username: String::new(),
                    valid: false,
                    legacy: false,
                    owner_cname: None,
                    brand_cname: None,
                },
            });
        }

        let client = require_client(client)?;
        let request = CreateLinkRequest {
            domain: &args.domain,
            subdomain: args.subdomain.as_deref(),
            default: args.default,
            region: args.region.as_deref(),
        };

        let response: LinkResponse = client
            .post("/v3/whitelabel/links", &request)
            .await
            .map_err(|e| e.with_context("failed to create link branding"))?;

        let state = response.into_state(args.region.clone());
        info!(link_id = state.link_id, "Created link branding");

        Ok(Created {
            id: state.link_id.to_string(),
            state,
        })
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn read(
        &self,
        client: &SendGridClient,
        id: &str,
        prior: &LinkBrandingState,
    ) -> SendGridResult<Option<Observed<LinkBrandingArgs, LinkBrandingState>>> {
        let result = client
            .get::<LinkResponse>(&format!("/v3/whitelabel/links/{}", id))
            .await;
        let Some(response) = absent_on_not_found(result, "failed to read link branding")? else {
            return Ok(None);
        };

        let state = response.into_state(prior.args.region.clone());
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
        prior: &LinkBrandingState,
        args: &LinkBrandingArgs,
        dry_run: bool,
    ) -> SendGridResult<LinkBrandingState> {
        if dry_run {
            return Ok(LinkBrandingState {
                args: args.clone(),
                ..prior.clone()
            });
        }

        let client = require_client(client)?;
        // Only the default flag is mutable.
        let request = UpdateLinkRequest {
            default: args.default,
        };

        let response: LinkResponse = client
            .patch(&format!("/v3/whitelabel/links/{}", id), &request)
            .await
            .map_err(|e| e.with_context("failed to update link branding"))?;

        info!("Updated link branding");
        Ok(response.into_state(prior.args.region.clone()))
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn delete(&self, client: &SendGridClient, id: &str, _state: &LinkBrandingState) -> SendGridResult<()> {
        let result = client.delete(&format!("/v3/whitelabel/links/{}", id)).await;
        ok_on_not_found(result, "failed to delete link branding")?;
        info!("Deleted link branding");
        Ok(())
    }
}
