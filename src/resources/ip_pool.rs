//! Dedicated IP pools. Pools are addressed by name.

use super::{absent_on_not_found, ok_on_not_found, require_client, Created, Observed, Resource, ResourceKind, PREVIEW_ID};
use crate::client::{path_segment, SendGridClient};
use crate::errors::SendGridResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Desired state of an IP pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpPoolArgs {
    /// Pool name.
    pub name: String,
}

/// Observed state of an IP pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpPoolState {
    /// Arguments as last observed.
    #[serde(flatten)]
    pub args: IpPoolArgs,
    /// Pool name as known to SendGrid.
    pub pool_name: String,
    /// IPs assigned to the pool.
    #[serde(default)]
    pub ips: Vec<String>,
}

#[derive(Debug, Serialize)]
struct IpPoolRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IpPoolResponse {
    pool_name: String,
    name: String,
    ips: Option<Vec<String>>,
}

impl IpPoolResponse {
    /// `requested` is used when the response names neither field; `ips`
    /// when the response leaves them out.
    fn into_state(self, requested: &str, ips: &[String]) -> IpPoolState {
        let name = [self.pool_name, self.name]
            .into_iter()
            .find(|n| !n.is_empty())
            .unwrap_or_else(|| requested.to_string());

        IpPoolState {
            args: IpPoolArgs { name: name.clone() },
            pool_name: name,
            ips: self.ips.unwrap_or_else(|| ips.to_vec()),
        }
    }
}

fn pool_path(id: &str) -> String {
    format!("/v3/ips/pools/{}", path_segment(id))
}

/// Renames keep the orchestrator id, so the last known pool name wins.
fn current_name<'a>(id: &'a str, state: &'a IpPoolState) -> &'a str {
    if state.pool_name.is_empty() {
        id
    } else {
        &state.pool_name
    }
}

/// Controller for `sendgrid:index:IpPool`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IpPool;

#[async_trait]
impl Resource for IpPool {
    const KIND: ResourceKind = ResourceKind::IpPool;
    type Args = IpPoolArgs;
    type State = IpPoolState;

    async fn create(
        &self,
        client: Option<&SendGridClient>,
        args: &IpPoolArgs,
        dry_run: bool,
    ) -> SendGridResult<Created<IpPoolState>> {
        if dry_run {
            return Ok(Created {
                id: PREVIEW_ID.to_string(),
                state: IpPoolState {
                    args: args.clone(),
                    pool_name: args.name.clone(),
                    ips: Vec::new(),
                },
            });
        }

        let client = require_client(client)?;
        let response: IpPoolResponse = client
            .post("/v3/ips/pools", &IpPoolRequest { name: &args.name })
            .await
            .map_err(|e| e.with_context("failed to create IP pool"))?;

        let state = response.into_state(&args.name, &[]);
        info!(pool_name = %state.pool_name, "Created IP pool");

        Ok(Created {
            id: state.pool_name.clone(),
            state,
        })
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn read(
        &self,
        client: &SendGridClient,
        id: &str,
        prior: &IpPoolState,
    ) -> SendGridResult<Option<Observed<IpPoolArgs, IpPoolState>>> {
        let name = current_name(id, prior);
        let result = client.get::<IpPoolResponse>(&pool_path(name)).await;
        let Some(response) = absent_on_not_found(result, "failed to read IP pool")? else {
            return Ok(None);
        };

        let state = response.into_state(name, &prior.ips);
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
        prior: &IpPoolState,
        args: &IpPoolArgs,
        dry_run: bool,
    ) -> SendGridResult<IpPoolState> {
        if dry_run {
            return Ok(IpPoolState {
                args: args.clone(),
                pool_name: args.name.clone(),
                ips: prior.ips.clone(),
            });
        }

        let client = require_client(client)?;
        let response: IpPoolResponse = client
            .put(&pool_path(current_name(id, prior)), &IpPoolRequest { name: &args.name })
            .await
            .map_err(|e| e.with_context("failed to update IP pool"))?;

        info!(new_name = %args.name, "Renamed IP pool");
        Ok(response.into_state(&args.name, &prior.ips))
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn delete(&self, client: &SendGridClient, id: &str, state: &IpPoolState) -> SendGridResult<()> {
        let result = client.delete(&pool_path(current_name(id, state))).await;
        ok_on_not_found(result, "failed to delete IP pool")?;
        info!("Deleted IP pool");
        Ok(())
    }
}
