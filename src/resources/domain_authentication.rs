//! Domain authentication (SPF/DKIM whitelabel domains).

use super::{
    absent_on_not_found, non_empty, non_empty_vec, ok_on_not_found, require_client, true_or_none,
    Created, Observed, Resource, ResourceKind, PREVIEW_ID,
};
use crate::client::SendGridClient;
use crate::errors::SendGridResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// A DNS record the account owner must publish.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsRecord {
    /// Whether SendGrid has seen the record.
    pub valid: bool,
    /// Record type, e.g. `cname`.
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record host.
    pub host: String,
    /// Record value.
    pub data: String,
}

impl DnsRecord {
    /// Records without a host were not issued.
    pub(crate) fn issued(record: Option<DnsRecord>) -> Option<DnsRecord> {
        record.filter(|r| !r.host.is_empty())
    }
}

/// Desired state of an authenticated domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainAuthenticationArgs {
    /// Domain to authenticate.
    pub domain: String,
    /// Subdomain used for the return path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    /// Dedicated IPs to include in the SPF record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ips: Option<Vec<String>>,
    /// Manage SPF manually.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_spf: Option<bool>,
    /// Use as the default sending domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,
    /// Let SendGrid manage the SPF and DKIM records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automatic_security: Option<bool>,
    /// Custom DKIM selector. Only honoured at creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_dkim_selector: Option<String>,
    /// Data residency region. Only honoured at creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Observed state of an authenticated domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainAuthenticationState {
    /// Arguments as last observed.
    #[serde(flatten)]
    pub args: DomainAuthenticationArgs,
    /// Domain id.
    pub domain_id: i64,
    /// Owning user id.
    pub user_id: i64,
    /// Owning username.
    #[serde(default)]
    pub username: String,
    /// Whether all DNS records validated.
    pub valid: bool,
    /// Whether this is a legacy whitelabel.
    pub legacy: bool,
    /// Mail CNAME record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail_cname: Option<DnsRecord>,
    /// First DKIM record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dkim1: Option<DnsRecord>,
    /// Second DKIM record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dkim2: Option<DnsRecord>,
}

#[derive(Debug, Serialize)]
struct CreateDomainRequest<'a> {
    domain: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    subdomain: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ips: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_spf: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    automatic_security: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_dkim_selector: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<&'a str>,
}

/// Only `default` and `custom_spf` can change after creation.
#[derive(Debug, Serialize)]
struct UpdateDomainRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_spf: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DomainDnsResponse {
    mail_cname: Option<DnsRecord>,
    dkim1: Option<DnsRecord>,
    dkim2: Option<DnsRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DomainResponse {
    id: i64,
    user_id: i64,
    domain: String,
    subdomain: Option<String>,
    username: Option<String>,
    ips: Option<Vec<String>>,
    custom_spf: bool,
    default: bool,
    automatic_security: bool,
    valid: bool,
    legacy: bool,
    dns: DomainDnsResponse,
}

impl DomainResponse {
    /// `custom_dkim_selector` and `region` are never echoed, so they come
    /// from `carried`.
    fn into_state(self, carried: &DomainAuthenticationArgs) -> DomainAuthenticationState {
        DomainAuthenticationState {
            args: DomainAuthenticationArgs {
                domain: self.domain,
                subdomain: self.subdomain.and_then(non_empty),
                ips: self.ips.and_then(non_empty_vec),
                custom_spf: true_or_none(self.custom_spf),
                default: true_or_none(self.default),
                automatic_security: true_or_none(self.automatic_security),
                custom_dkim_selector: carried.custom_dkim_selector.clone(),
                region: carried.region.clone(),
            },
            domain_id: self.id,
            user_id: self.user_id,
            username: self.username.unwrap_or_default(),
            valid: self.valid,
            legacy: self.legacy,
            mail_cname: DnsRecord::issued(self.dns.mail_cname),
            dkim1: DnsRecord::issued(self.dns.dkim1),
            dkim2: DnsRecord::issued(self.dns.dkim2),
        }
    }
}

/// Controller for `sendgrid:index:DomainAuthentication`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainAuthentication;

#[async_trait]
impl Resource for DomainAuthentication {
    const KIND: ResourceKind = ResourceKind::DomainAuthentication;
    type Args = DomainAuthenticationArgs;
    type State = DomainAuthenticationState;

    async fn create(
        &self,
        client: Option<&SendGridClient>,
        args: &DomainAuthenticationArgs,
        dry_run: bool,
    ) -> SendGridResult<Created<DomainAuthenticationState>> {
        if dry_run {
            return Ok(Created {
                id: PREVIEW_ID.to_string(),
                state: DomainAuthenticationState {
                    args: args.clone(),
                    domain_id: 0,
                    user_id: 0,
                    username: String::new(),
                    valid: false,
                    legacy: false,
                    mail_cname: None,
                    dkim1: None,
                    dkim2: None,
                },
            });
        }

        let client = require_client(client)?;
        let request = CreateDomainRequest {
            domain: &args.domain,
            subdomain: args.subdomain.as_deref(),
            ips: args.ips.as_deref().filter(|ips| !ips.is_empty()),
            custom_spf: args.custom_spf,
            default: args.default,
            automatic_security: args.automatic_security,
            custom_dkim_selector: args.custom_dkim_selector.as_deref(),
            region: args.region.as_deref(),
        };

        let response: DomainResponse = client
            .post("/v3/whitelabel/domains", &request)
            .await
            .map_err(|e| e.with_context("failed to create domain authentication"))?;

        let state = response.into_state(args);
        info!(domain_id = state.domain_id, domain = %state.args.domain, "Created domain authentication");

        Ok(Created {
            id: state.domain_id.to_string(),
            state,
        })
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn read(
        &self,
        client: &SendGridClient,
        id: &str,
        prior: &DomainAuthenticationState,
    ) -> SendGridResult<Option<Observed<DomainAuthenticationArgs, DomainAuthenticationState>>> {
        let result = client
            .get::<DomainResponse>(&format!("/v3/whitelabel/domains/{}", id))
            .await;
        let Some(response) = absent_on_not_found(result, "failed to read domain authentication")? else {
            return Ok(None);
        };

        let state = response.into_state(&prior.args);
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
        prior: &DomainAuthenticationState,
        args: &DomainAuthenticationArgs,
        dry_run: bool,
    ) -> SendGridResult<DomainAuthenticationState> {
        if dry_run {
            return Ok(DomainAuthenticationState {
                args: args.clone(),
                ..prior.clone()
            });
        }

        let client = require_client(client)?;
        let request = UpdateDomainRequest {
            default: args.default,
            custom_spf: args.custom_spf,
        };

        let response: DomainResponse = client
            .patch(&format!("/v3/whitelabel/domains/{}", id), &request)
            .await
            .map_err(|e| e.with_context("failed to update domain authentication"))?;

        info!("Updated domain authentication");
        Ok(response.into_state(&prior.args))
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn delete(
        &self,
        client: &SendGridClient,
        id: &str,
        _state: &DomainAuthenticationState,
    ) -> SendGridResult<()> {
        let result = client
            .delete(&format!("/v3/whitelabel/domains/{}", id))
            .await;
        ok_on_not_found(result, "failed to delete domain authentication")?;
        info!("Deleted domain authentication");
        Ok(())
    }
}
