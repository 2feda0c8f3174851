//! Atlas Stream Processing API implementation

use super::common::{segment, ApiQueryParams};
use super::{ApiError, Client};
use serde::Deserialize;

/// API version of the versioned v2 streams endpoints
pub const STREAMS_API_VERSION: &str = "2025-03-12";

/// Cloud account details used to peer with Atlas stream processing
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountDetails {
    pub aws_account_id: Option<String>,
    pub azure_subscription_id: Option<String>,
    pub cidr_block: Option<String>,
    pub cloud_provider: Option<String>,
    pub virtual_network_name: Option<String>,
    pub vpc_id: Option<String>,
}

/// Streams API
pub struct StreamsApi<'a> {
    client: &'a Client,
}

impl<'a> StreamsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/atlas/v2/groups/{groupId}/streams/accountDetails
    pub async fn account_details(
        &self,
        project_id: &str,
        cloud_provider: &str,
        region_name: &str,
    ) -> Result<AccountDetails, ApiError> {
        let query = ApiQueryParams::new()
            .add("cloudProvider", cloud_provider)
            .add("regionName", region_name);
        let path = format!(
            "/api/atlas/v2/groups/{}/streams/accountDetails{}",
            segment(project_id),
            query.to_query_string()
        );
        self.client
            .get_versioned(&path, STREAMS_API_VERSION)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Credentials;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn account_details_use_versioned_media_type() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/atlas/v2/groups/p1/streams/accountDetails")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("cloudProvider".into(), "aws".into()),
                Matcher::UrlEncoded("regionName".into(), "US_EAST_1".into()),
            ]))
            .match_header("accept", "application/vnd.atlas.2025-03-12+json")
            .with_body(r#"{"awsAccountId":"123456789012","cidrBlock":"192.168.0.0/22","cloudProvider":"aws","vpcId":"vpc-1"}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), Credentials::AccessToken("t".into())).unwrap();
        let details = client
            .streams()
            .account_details("p1", "aws", "US_EAST_1")
            .await
            .unwrap();
        assert_eq!(details.aws_account_id.as_deref(), Some("123456789012"));
        assert!(details.azure_subscription_id.is_none());
        mock.assert_async().await;
    }
}
