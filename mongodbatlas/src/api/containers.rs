//! Network peering container API implementation

use super::common::{segment, ApiQueryParams, Paginated};
use super::{ApiError, Client};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Container {
    pub id: Option<String>,
    pub provider_name: Option<String>,
    /// AWS region
    pub region_name: Option<String>,
    /// Azure region
    pub region: Option<String>,
    pub atlas_cidr_block: Option<String>,
}

/// Containers API
pub struct ContainersApi<'a> {
    client: &'a Client,
}

impl<'a> ContainersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/atlas/v1.0/groups/{groupId}/containers?providerName={provider}
    pub async fn list(
        &self,
        project_id: &str,
        provider_name: &str,
    ) -> Result<Vec<Container>, ApiError> {
        let query = ApiQueryParams::new().add("providerName", provider_name);
        let path = format!(
            "/api/atlas/v1.0/groups/{}/containers{}",
            segment(project_id),
            query.to_query_string()
        );
        let page: Paginated<Container> = self.client.get(&path).await?;
        Ok(page.results)
    }
}
