//! Org and space name to GUID resolution against the platform v2 API.

use alerts_common::error::{AlertError, ResourceKind};
use alerts_common::types::ResourceList;

use crate::http::{CF_API, RetryHttpClient, join_url};
use crate::token::AuthToken;

pub const ORGANIZATIONS_PATH: &str = "/v2/organizations";

#[derive(Debug, Clone)]
pub struct ResourceResolver {
    http: RetryHttpClient,
    api_url: String,
}

impl ResourceResolver {
    pub fn new(http: RetryHttpClient, api_url: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into(),
        }
    }

    /// Look up the GUID of the `kind` resource named `filter_name` under
    /// `query_path`. No match is a terminal not-found error.
    pub async fn resolve_guid(
        &self,
        token: &AuthToken,
        query_path: &str,
        filter_name: &str,
        kind: ResourceKind,
    ) -> Result<String, AlertError> {
        let url = join_url(&self.api_url, query_path, Some(&format!("name:{filter_name}")))?;

        let list: ResourceList = self
            .http
            .send_json(CF_API, |client| {
                client.get(url.clone()).bearer_auth(token.as_str())
            })
            .await?;

        let not_found = || AlertError::ResourceNotFound {
            kind,
            name: filter_name.to_string(),
        };

        if list.total_results == 0 {
            return Err(not_found());
        }

        let guid = list
            .resources
            .into_iter()
            .next()
            .map(|resource| resource.metadata.guid)
            .ok_or_else(not_found)?;

        tracing::debug!(%kind, name = filter_name, %guid, "Resolved platform resource");
        Ok(guid)
    }

    /// Resolve `org`, then `space` within it. The space query is only issued
    /// once the org GUID is known.
    pub async fn resolve_space_guid(
        &self,
        token: &AuthToken,
        org: &str,
        space: &str,
    ) -> Result<String, AlertError> {
        let org_guid = self
            .resolve_guid(token, ORGANIZATIONS_PATH, org, ResourceKind::Org)
            .await?;

        let spaces_path = format!("{ORGANIZATIONS_PATH}/{org_guid}/spaces");
        self.resolve_guid(token, &spaces_path, space, ResourceKind::Space)
            .await
    }
}
