//! Stream account details data source implementation

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::api::streams::AccountDetails;
use crate::api;
use crate::conversion::string_null_if_empty;
use crate::provider_data::{not_configured, MongoDbAtlasProviderData};

pub const TYPE_NAME: &str = "mongodbatlas_stream_account_details";

#[derive(Debug, Clone, PartialEq)]
pub struct StreamAccountDetailsModel {
    pub project_id: String,
    pub cloud_provider: String,
    pub region_name: String,
    pub details: AccountDetails,
}

impl StreamAccountDetailsModel {
    pub fn to_state(&self) -> DynamicValue {
        let d = &self.details;
        DynamicValue::new(Dynamic::object([
            (
                "id",
                Dynamic::from(format!(
                    "{}-{}-{}",
                    self.project_id, self.cloud_provider, self.region_name
                )),
            ),
            ("project_id", Dynamic::from(self.project_id.as_str())),
            ("cloud_provider", Dynamic::from(self.cloud_provider.as_str())),
            ("region_name", Dynamic::from(self.region_name.as_str())),
            ("aws_account_id", string_null_if_empty(d.aws_account_id.as_ref())),
            ("azure_subscription_id", string_null_if_empty(d.azure_subscription_id.as_ref())),
            ("cidr_block", string_null_if_empty(d.cidr_block.as_ref())),
            ("virtual_network_name", string_null_if_empty(d.virtual_network_name.as_ref())),
            ("vpc_id", string_null_if_empty(d.vpc_id.as_ref())),
        ]))
    }
}

#[derive(Default)]
pub struct StreamAccountDetailsDataSource {
    provider_data: Option<MongoDbAtlasProviderData>,
}

impl StreamAccountDetailsDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for StreamAccountDetailsDataSource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Returns the cloud account details Atlas Stream Processing uses in a region")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Atlas project ID")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cloud_provider", AttributeType::String)
                    .description("Cloud provider, such as aws or azure")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("region_name", AttributeType::String)
                    .description("Atlas region name, such as US_EAST_1")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("aws_account_id", AttributeType::String)
                    .description("AWS account ID (AWS only)")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("azure_subscription_id", AttributeType::String)
                    .description("Azure subscription ID (Azure only)")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cidr_block", AttributeType::String)
                    .description("VPC or virtual network CIDR block")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("virtual_network_name", AttributeType::String)
                    .description("Azure virtual network name (Azure only)")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("vpc_id", AttributeType::String)
                    .description("AWS VPC ID (AWS only)")
                    .computed()
                    .build(),
            )
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let fail = |diagnostic: Diagnostic| ReadDataSourceResponse {
            state: None,
            diagnostics: vec![diagnostic],
        };

        let client = match &self.provider_data {
            Some(data) => data.client.clone(),
            None => return fail(not_configured()),
        };

        let get = |name: &str| request.config.get_string(&AttributePath::new(name));
        let (project_id, cloud_provider, region_name) =
            match (get("project_id"), get("cloud_provider"), get("region_name")) {
                (Ok(p), Ok(c), Ok(r)) => (p, c, r),
                (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                    return fail(Diagnostic::error("Invalid configuration", e.to_string()))
                }
            };

        let result = api::cancellable(
            &ctx,
            client
                .streams()
                .account_details(&project_id, &cloud_provider, &region_name),
        )
        .await;

        match result {
            Ok(details) => ReadDataSourceResponse {
                state: Some(
                    StreamAccountDetailsModel {
                        project_id,
                        cloud_provider,
                        region_name,
                        details,
                    }
                    .to_state(),
                ),
                diagnostics: vec![],
            },
            Err(e) => fail(Diagnostic::error(
                "error fetching stream account details",
                e.to_string(),
            )),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for StreamAccountDetailsDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        match MongoDbAtlasProviderData::from_any(request.provider_data) {
            Ok(data) => {
                self.provider_data = data;
                ConfigureDataSourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(diag) => ConfigureDataSourceResponse {
                diagnostics: vec![diag],
            },
        }
    }
}
