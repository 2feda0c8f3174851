//! Cluster data source implementation

use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::StringLength;

use crate::api::cloud_backup::SnapshotSchedule;
use crate::api::clusters::{Cluster, ConnectionStrings, ProcessArgs, ReplicationSpec};
use crate::api::{self, ApiError};
use crate::conversion::{
    container_id_for, int_or_null, labels_to_dynamic, remove_default_label, string_null_if_empty,
    ProviderSettingsModel,
};
use crate::provider_data::{not_configured, MongoDbAtlasProviderData};

pub const TYPE_NAME: &str = "mongodbatlas_cluster";

fn computed(name: &str, r#type: AttributeType) -> Attribute {
    AttributeBuilder::new(name, r#type).computed().build()
}

fn object(fields: &[(&str, AttributeType)]) -> AttributeType {
    AttributeType::Object(
        fields
            .iter()
            .map(|(name, t)| (name.to_string(), t.clone()))
            .collect(),
    )
}

fn list_of(fields: &[(&str, AttributeType)]) -> AttributeType {
    AttributeType::List(Box::new(object(fields)))
}

fn set_of(fields: &[(&str, AttributeType)]) -> AttributeType {
    AttributeType::Set(Box::new(object(fields)))
}

fn key_value_type() -> AttributeType {
    set_of(&[("key", AttributeType::String), ("value", AttributeType::String)])
}

fn advanced_configuration_type() -> AttributeType {
    list_of(&[
        ("default_read_concern", AttributeType::String),
        ("default_write_concern", AttributeType::String),
        ("fail_index_key_too_long", AttributeType::Bool),
        ("javascript_enabled", AttributeType::Bool),
        ("minimum_enabled_tls_protocol", AttributeType::String),
        ("no_table_scan", AttributeType::Bool),
        ("oplog_size_mb", AttributeType::Number),
        ("oplog_min_retention_hours", AttributeType::Number),
        ("sample_size_bi_connector", AttributeType::Number),
        ("sample_refresh_interval_bi_connector", AttributeType::Number),
        ("transaction_lifetime_limit_seconds", AttributeType::Number),
    ])
}

fn connection_strings_type() -> AttributeType {
    let endpoints = list_of(&[
        ("endpoint_id", AttributeType::String),
        ("provider_name", AttributeType::String),
        ("region", AttributeType::String),
    ]);
    let private_endpoint = list_of(&[
        ("connection_string", AttributeType::String),
        ("endpoints", endpoints),
        ("srv_connection_string", AttributeType::String),
        ("srv_shard_optimized_connection_string", AttributeType::String),
        ("type", AttributeType::String),
    ]);
    list_of(&[
        ("standard", AttributeType::String),
        ("standard_srv", AttributeType::String),
        ("aws_private_link", AttributeType::Map(Box::new(AttributeType::String))),
        ("aws_private_link_srv", AttributeType::Map(Box::new(AttributeType::String))),
        ("private", AttributeType::String),
        ("private_srv", AttributeType::String),
        ("private_endpoint", private_endpoint),
    ])
}

fn replication_specs_type() -> AttributeType {
    let regions_config = set_of(&[
        ("region_name", AttributeType::String),
        ("electable_nodes", AttributeType::Number),
        ("priority", AttributeType::Number),
        ("read_only_nodes", AttributeType::Number),
        ("analytics_nodes", AttributeType::Number),
    ]);
    list_of(&[
        ("id", AttributeType::String),
        ("num_shards", AttributeType::Number),
        ("regions_config", regions_config),
        ("zone_name", AttributeType::String),
    ])
}

fn snapshot_backup_policy_type() -> AttributeType {
    let policy_item = list_of(&[
        ("id", AttributeType::String),
        ("frequency_interval", AttributeType::Number),
        ("frequency_type", AttributeType::String),
        ("retention_unit", AttributeType::String),
        ("retention_value", AttributeType::Number),
    ]);
    let policies = list_of(&[("id", AttributeType::String), ("policy_item", policy_item)]);
    list_of(&[
        ("cluster_id", AttributeType::String),
        ("cluster_name", AttributeType::String),
        ("next_snapshot", AttributeType::String),
        ("reference_hour_of_day", AttributeType::Number),
        ("reference_minute_of_hour", AttributeType::Number),
        ("restore_window_days", AttributeType::Number),
        ("update_snapshots", AttributeType::Bool),
        ("policies", policies),
    ])
}

/// Everything the data source learns about one cluster
#[derive(Debug, Clone)]
pub struct ClusterModel {
    pub project_id: String,
    pub name: String,
    pub cluster: Cluster,
    pub provider_settings: ProviderSettingsModel,
    pub process_args: ProcessArgs,
    pub backup_schedule: Option<SnapshotSchedule>,
    pub container_id: Option<String>,
}

impl ClusterModel {
    pub fn to_state(&self) -> DynamicValue {
        let cluster = &self.cluster;
        let auto_scaling = cluster.auto_scaling.clone().unwrap_or_default();
        let compute = auto_scaling.compute.unwrap_or_default();

        let mut fields: Vec<(&str, Dynamic)> = vec![
            ("id", string_null_if_empty(cluster.id.as_ref())),
            ("project_id", Dynamic::from(self.project_id.as_str())),
            ("name", Dynamic::from(self.name.as_str())),
            ("advanced_configuration", advanced_configuration(&self.process_args)),
            ("auto_scaling_disk_gb_enabled", Dynamic::from(auto_scaling.disk_gb_enabled)),
            ("auto_scaling_compute_enabled", Dynamic::from(compute.enabled)),
            (
                "auto_scaling_compute_scale_down_enabled",
                Dynamic::from(compute.scale_down_enabled),
            ),
            ("backup_enabled", Dynamic::from(cluster.backup_enabled)),
            (
                "bi_connector_config",
                Dynamic::List(
                    cluster
                        .bi_connector
                        .iter()
                        .map(|bi| {
                            Dynamic::object([
                                ("enabled", Dynamic::from(bi.enabled)),
                                (
                                    "read_preference",
                                    string_null_if_empty(bi.read_preference.as_ref()),
                                ),
                            ])
                        })
                        .collect(),
                ),
            ),
            ("cluster_type", string_null_if_empty(cluster.cluster_type.as_ref())),
            (
                "connection_strings",
                Dynamic::List(cluster.connection_strings.iter().map(connection_strings).collect()),
            ),
            ("disk_size_gb", Dynamic::from(cluster.disk_size_gb)),
            (
                "encryption_at_rest_provider",
                string_null_if_empty(cluster.encryption_at_rest_provider.as_ref()),
            ),
            (
                "mongo_db_major_version",
                string_null_if_empty(cluster.mongo_db_major_version.as_ref()),
            ),
            ("mongo_db_version", string_null_if_empty(cluster.mongo_db_version.as_ref())),
            ("mongo_uri", string_null_if_empty(cluster.mongo_uri.as_ref())),
            ("mongo_uri_updated", string_null_if_empty(cluster.mongo_uri_updated.as_ref())),
            (
                "mongo_uri_with_options",
                string_null_if_empty(cluster.mongo_uri_with_options.as_ref()),
            ),
            ("num_shards", int_or_null(cluster.num_shards)),
            ("paused", Dynamic::from(cluster.paused)),
            ("pit_enabled", Dynamic::from(cluster.pit_enabled)),
            ("provider_backup_enabled", Dynamic::from(cluster.provider_backup_enabled)),
            ("replication_factor", int_or_null(cluster.replication_factor)),
            (
                "replication_specs",
                Dynamic::List(cluster.replication_specs.iter().map(replication_spec).collect()),
            ),
            ("srv_address", string_null_if_empty(cluster.srv_address.as_ref())),
            ("state_name", string_null_if_empty(cluster.state_name.as_ref())),
            ("labels", labels_to_dynamic(&remove_default_label(cluster.labels.clone()))),
            ("tags", labels_to_dynamic(&cluster.tags)),
            (
                "snapshot_backup_policy",
                Dynamic::List(self.backup_schedule.iter().map(snapshot_backup_policy).collect()),
            ),
            (
                "termination_protection_enabled",
                Dynamic::from(cluster.termination_protection_enabled),
            ),
            ("container_id", string_null_if_empty(self.container_id.as_ref())),
            (
                "version_release_system",
                string_null_if_empty(cluster.version_release_system.as_ref()),
            ),
        ];
        fields.extend(self.provider_settings.attributes());

        DynamicValue::new(Dynamic::object(fields))
    }
}

fn advanced_configuration(args: &ProcessArgs) -> Dynamic {
    Dynamic::List(vec![Dynamic::object([
        ("default_read_concern", string_null_if_empty(args.default_read_concern.as_ref())),
        ("default_write_concern", string_null_if_empty(args.default_write_concern.as_ref())),
        ("fail_index_key_too_long", Dynamic::from(args.fail_index_key_too_long)),
        ("javascript_enabled", Dynamic::from(args.javascript_enabled)),
        (
            "minimum_enabled_tls_protocol",
            string_null_if_empty(args.minimum_enabled_tls_protocol.as_ref()),
        ),
        ("no_table_scan", Dynamic::from(args.no_table_scan)),
        ("oplog_size_mb", int_or_null(args.oplog_size_mb)),
        ("oplog_min_retention_hours", Dynamic::from(args.oplog_min_retention_hours)),
        ("sample_size_bi_connector", int_or_null(args.sample_size_bi_connector)),
        (
            "sample_refresh_interval_bi_connector",
            int_or_null(args.sample_refresh_interval_bi_connector),
        ),
        (
            "transaction_lifetime_limit_seconds",
            int_or_null(args.transaction_lifetime_limit_seconds),
        ),
    ])])
}

fn string_map(map: &HashMap<String, String>) -> Dynamic {
    Dynamic::Map(
        map.iter()
            .map(|(k, v)| (k.clone(), Dynamic::from(v.as_str())))
            .collect(),
    )
}

fn connection_strings(cs: &ConnectionStrings) -> Dynamic {
    let private_endpoint = cs
        .private_endpoint
        .iter()
        .map(|pe| {
            let endpoints = pe
                .endpoints
                .iter()
                .map(|e| {
                    Dynamic::object([
                        ("endpoint_id", string_null_if_empty(e.endpoint_id.as_ref())),
                        ("provider_name", string_null_if_empty(e.provider_name.as_ref())),
                        ("region", string_null_if_empty(e.region.as_ref())),
                    ])
                })
                .collect();
            Dynamic::object([
                ("connection_string", string_null_if_empty(pe.connection_string.as_ref())),
                ("endpoints", Dynamic::List(endpoints)),
                ("srv_connection_string", string_null_if_empty(pe.srv_connection_string.as_ref())),
                (
                    "srv_shard_optimized_connection_string",
                    string_null_if_empty(pe.srv_shard_optimized_connection_string.as_ref()),
                ),
                ("type", string_null_if_empty(pe.endpoint_type.as_ref())),
            ])
        })
        .collect();

    Dynamic::object([
        ("standard", string_null_if_empty(cs.standard.as_ref())),
        ("standard_srv", string_null_if_empty(cs.standard_srv.as_ref())),
        ("aws_private_link", string_map(&cs.aws_private_link)),
        ("aws_private_link_srv", string_map(&cs.aws_private_link_srv)),
        ("private", string_null_if_empty(cs.private.as_ref())),
        ("private_srv", string_null_if_empty(cs.private_srv.as_ref())),
        ("private_endpoint", Dynamic::List(private_endpoint)),
    ])
}

fn replication_spec(spec: &ReplicationSpec) -> Dynamic {
    let mut regions: Vec<_> = spec.regions_config.iter().collect();
    regions.sort_by(|a, b| a.0.cmp(b.0));
    let regions_config = regions
        .into_iter()
        .map(|(region, config)| {
            Dynamic::object([
                ("region_name", Dynamic::from(region.as_str())),
                ("electable_nodes", int_or_null(config.electable_nodes)),
                ("priority", int_or_null(config.priority)),
                ("read_only_nodes", int_or_null(config.read_only_nodes)),
                ("analytics_nodes", int_or_null(config.analytics_nodes)),
            ])
        })
        .collect();

    Dynamic::object([
        ("id", string_null_if_empty(spec.id.as_ref())),
        ("num_shards", int_or_null(spec.num_shards)),
        ("regions_config", Dynamic::List(regions_config)),
        ("zone_name", string_null_if_empty(spec.zone_name.as_ref())),
    ])
}

fn snapshot_backup_policy(schedule: &SnapshotSchedule) -> Dynamic {
    let policies = schedule
        .policies
        .iter()
        .map(|policy| {
            let items = policy
                .policy_items
                .iter()
                .map(|item| {
                    Dynamic::object([
                        ("id", string_null_if_empty(item.id.as_ref())),
                        ("frequency_interval", int_or_null(item.frequency_interval)),
                        ("frequency_type", string_null_if_empty(item.frequency_type.as_ref())),
                        ("retention_unit", string_null_if_empty(item.retention_unit.as_ref())),
                        ("retention_value", int_or_null(item.retention_value)),
                    ])
                })
                .collect();
            Dynamic::object([
                ("id", string_null_if_empty(policy.id.as_ref())),
                ("policy_item", Dynamic::List(items)),
            ])
        })
        .collect();

    Dynamic::object([
        ("cluster_id", string_null_if_empty(schedule.cluster_id.as_ref())),
        ("cluster_name", string_null_if_empty(schedule.cluster_name.as_ref())),
        ("next_snapshot", string_null_if_empty(schedule.next_snapshot.as_ref())),
        ("reference_hour_of_day", int_or_null(schedule.reference_hour_of_day)),
        ("reference_minute_of_hour", int_or_null(schedule.reference_minute_of_hour)),
        ("restore_window_days", int_or_null(schedule.restore_window_days)),
        ("update_snapshots", Dynamic::from(schedule.update_snapshots)),
        ("policies", Dynamic::List(policies)),
    ])
}

fn read_error(name: &str, err: &ApiError) -> Diagnostic {
    let detail = format!("error reading cluster ({}): {}", name, err);
    if err.is_not_found() {
        Diagnostic::error("cluster not found in Atlas", detail)
    } else {
        Diagnostic::error("error in getting cluster details from Atlas", detail)
    }
}

#[derive(Default)]
pub struct ClusterDataSource {
    provider_data: Option<MongoDbAtlasProviderData>,
}

impl ClusterDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the cluster and the sub-resources the data source flattens into it
    async fn fetch(
        &self,
        ctx: &Context,
        client: &api::Client,
        project_id: &str,
        name: &str,
    ) -> Result<ClusterModel, ApiError> {
        let cluster = api::cancellable(ctx, client.clusters().get(project_id, name)).await?;

        let settings = cluster.provider_settings.clone().unwrap_or_default();
        let provider_settings = ProviderSettingsModel::from_api(&settings);

        let container_id = match (&cluster.provider_settings, settings.provider_name.as_deref()) {
            (Some(_), Some(provider)) if !provider_settings.is_tenant() && !provider.is_empty() => {
                let containers =
                    api::cancellable(ctx, client.containers().list(project_id, provider)).await?;
                let region = settings.region_name.as_deref().unwrap_or_default();
                container_id_for(provider, region, &containers)
            }
            _ => None,
        };

        let process_args =
            api::cancellable(ctx, client.clusters().process_args(project_id, name)).await?;
        let backup_schedule =
            api::cancellable(ctx, client.cloud_backup().schedule(project_id, name)).await?;

        Ok(ClusterModel {
            project_id: project_id.to_string(),
            name: name.to_string(),
            cluster,
            provider_settings,
            process_args,
            backup_schedule,
            container_id,
        })
    }
}

#[async_trait]
impl DataSource for ClusterDataSource {
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
            .description("Describes a MongoDB Atlas cluster")
            .attribute(computed("id", AttributeType::String))
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Atlas project containing the cluster")
                    .required()
                    .validator(StringLength::create(Some(1), None))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the cluster")
                    .required()
                    .validator(StringLength::create(Some(1), Some(64)))
                    .build(),
            )
            .attribute(computed("advanced_configuration", advanced_configuration_type()))
            .attribute(computed("auto_scaling_disk_gb_enabled", AttributeType::Bool))
            .attribute(computed("auto_scaling_compute_enabled", AttributeType::Bool))
            .attribute(computed("auto_scaling_compute_scale_down_enabled", AttributeType::Bool))
            .attribute(computed("backup_enabled", AttributeType::Bool))
            .attribute(computed(
                "bi_connector_config",
                list_of(&[
                    ("enabled", AttributeType::Bool),
                    ("read_preference", AttributeType::String),
                ]),
            ))
            .attribute(computed("cluster_type", AttributeType::String))
            .attribute(computed("connection_strings", connection_strings_type()))
            .attribute(computed("disk_size_gb", AttributeType::Number))
            .attribute(computed("encryption_at_rest_provider", AttributeType::String))
            .attribute(computed("mongo_db_major_version", AttributeType::String))
            .attribute(computed("num_shards", AttributeType::Number))
            .attribute(computed("pit_enabled", AttributeType::Bool))
            .attribute(computed("provider_backup_enabled", AttributeType::Bool))
            .attribute(computed("provider_instance_size_name", AttributeType::String))
            .attribute(computed("provider_name", AttributeType::String))
            .attribute(computed("backing_provider_name", AttributeType::String))
            .attribute(computed("provider_disk_iops", AttributeType::Number))
            .attribute(computed("provider_disk_type_name", AttributeType::String))
            .attribute(computed("provider_encrypt_ebs_volume", AttributeType::Bool))
            .attribute(computed("provider_encrypt_ebs_volume_flag", AttributeType::Bool))
            .attribute(computed("provider_region_name", AttributeType::String))
            .attribute(computed("provider_volume_type", AttributeType::String))
            .attribute(computed(
                "provider_auto_scaling_compute_max_instance_size",
                AttributeType::String,
            ))
            .attribute(computed(
                "provider_auto_scaling_compute_min_instance_size",
                AttributeType::String,
            ))
            .attribute(computed("replication_factor", AttributeType::Number))
            .attribute(computed("replication_specs", replication_specs_type()))
            .attribute(computed("mongo_db_version", AttributeType::String))
            .attribute(computed("mongo_uri", AttributeType::String))
            .attribute(computed("mongo_uri_updated", AttributeType::String))
            .attribute(computed("mongo_uri_with_options", AttributeType::String))
            .attribute(computed("paused", AttributeType::Bool))
            .attribute(computed("srv_address", AttributeType::String))
            .attribute(computed("state_name", AttributeType::String))
            .attribute(
                AttributeBuilder::new("labels", key_value_type())
                    .computed()
                    .deprecated("This parameter is deprecated. Please transition to tags.")
                    .build(),
            )
            .attribute(computed("tags", key_value_type()))
            .attribute(computed("snapshot_backup_policy", snapshot_backup_policy_type()))
            .attribute(computed("termination_protection_enabled", AttributeType::Bool))
            .attribute(computed("container_id", AttributeType::String))
            .attribute(computed("version_release_system", AttributeType::String))
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
        let (project_id, name) = match (
            request.config.get_string(&AttributePath::new("project_id")),
            request.config.get_string(&AttributePath::new("name")),
        ) {
            (Ok(project_id), Ok(name)) => (project_id, name),
            (Err(e), _) | (_, Err(e)) => {
                return fail(Diagnostic::error("Invalid configuration", e.to_string()))
            }
        };

        tracing::debug!("Reading cluster {} in project {}", name, project_id);
        match self.fetch(&ctx, &client, &project_id, &name).await {
            Ok(model) => ReadDataSourceResponse {
                state: Some(model.to_state()),
                diagnostics: vec![],
            },
            Err(e) => fail(read_error(&name, &e)),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for ClusterDataSource {
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
