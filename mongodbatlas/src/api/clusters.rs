//! Cluster API implementation

use super::common::{segment, Label};
use super::{ApiError, Client};
use serde::Deserialize;
use std::collections::HashMap;

/// Cluster description returned by GET /groups/{groupId}/clusters/{clusterName}
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cluster {
    pub id: Option<String>,
    pub group_id: Option<String>,
    pub name: Option<String>,
    pub auto_scaling: Option<AutoScaling>,
    pub backup_enabled: Option<bool>,
    pub bi_connector: Option<BiConnector>,
    pub cluster_type: Option<String>,
    #[serde(rename = "diskSizeGB")]
    pub disk_size_gb: Option<f64>,
    pub encryption_at_rest_provider: Option<String>,
    pub labels: Vec<Label>,
    pub tags: Vec<Label>,
    #[serde(rename = "mongoDBMajorVersion")]
    pub mongo_db_major_version: Option<String>,
    #[serde(rename = "mongoDBVersion")]
    pub mongo_db_version: Option<String>,
    #[serde(rename = "mongoURI")]
    pub mongo_uri: Option<String>,
    #[serde(rename = "mongoURIUpdated")]
    pub mongo_uri_updated: Option<String>,
    #[serde(rename = "mongoURIWithOptions")]
    pub mongo_uri_with_options: Option<String>,
    pub connection_strings: Option<ConnectionStrings>,
    /// Absent for global clusters
    pub num_shards: Option<i64>,
    pub paused: Option<bool>,
    pub pit_enabled: Option<bool>,
    pub provider_backup_enabled: Option<bool>,
    pub provider_settings: Option<ProviderSettings>,
    pub replication_factor: Option<i64>,
    pub replication_specs: Vec<ReplicationSpec>,
    pub srv_address: Option<String>,
    pub state_name: Option<String>,
    pub termination_protection_enabled: Option<bool>,
    pub version_release_system: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoScaling {
    pub compute: Option<ComputeAutoScaling>,
    #[serde(rename = "diskGBEnabled")]
    pub disk_gb_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComputeAutoScaling {
    pub enabled: Option<bool>,
    pub scale_down_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BiConnector {
    pub enabled: Option<bool>,
    pub read_preference: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    pub provider_name: Option<String>,
    pub backing_provider_name: Option<String>,
    #[serde(rename = "diskIOPS")]
    pub disk_iops: Option<i64>,
    pub disk_type_name: Option<String>,
    #[serde(rename = "encryptEBSVolume")]
    pub encrypt_ebs_volume: Option<bool>,
    pub instance_size_name: Option<String>,
    pub region_name: Option<String>,
    pub volume_type: Option<String>,
    pub auto_scaling: Option<ProviderAutoScaling>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderAutoScaling {
    pub compute: Option<InstanceSizeRange>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstanceSizeRange {
    pub min_instance_size: Option<String>,
    pub max_instance_size: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionStrings {
    pub standard: Option<String>,
    pub standard_srv: Option<String>,
    pub aws_private_link: HashMap<String, String>,
    pub aws_private_link_srv: HashMap<String, String>,
    pub private: Option<String>,
    pub private_srv: Option<String>,
    pub private_endpoint: Vec<PrivateEndpoint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivateEndpoint {
    pub connection_string: Option<String>,
    pub endpoints: Vec<Endpoint>,
    pub srv_connection_string: Option<String>,
    pub srv_shard_optimized_connection_string: Option<String>,
    #[serde(rename = "type")]
    pub endpoint_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Endpoint {
    pub endpoint_id: Option<String>,
    pub provider_name: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplicationSpec {
    pub id: Option<String>,
    pub num_shards: Option<i64>,
    pub zone_name: Option<String>,
    /// Keyed by region name
    pub regions_config: HashMap<String, RegionConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegionConfig {
    pub electable_nodes: Option<i64>,
    pub priority: Option<i64>,
    pub read_only_nodes: Option<i64>,
    pub analytics_nodes: Option<i64>,
}

/// Advanced configuration options of a cluster
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessArgs {
    pub default_read_concern: Option<String>,
    pub default_write_concern: Option<String>,
    pub fail_index_key_too_long: Option<bool>,
    pub javascript_enabled: Option<bool>,
    pub minimum_enabled_tls_protocol: Option<String>,
    pub no_table_scan: Option<bool>,
    #[serde(rename = "oplogSizeMB")]
    pub oplog_size_mb: Option<i64>,
    pub oplog_min_retention_hours: Option<f64>,
    #[serde(rename = "sampleSizeBIConnector")]
    pub sample_size_bi_connector: Option<i64>,
    #[serde(rename = "sampleRefreshIntervalBIConnector")]
    pub sample_refresh_interval_bi_connector: Option<i64>,
    pub transaction_lifetime_limit_seconds: Option<i64>,
}

/// Clusters API
pub struct ClustersApi<'a> {
    client: &'a Client,
}

impl<'a> ClustersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub(crate) fn cluster_path(project_id: &str, name: &str) -> String {
        format!(
            "/api/atlas/v1.0/groups/{}/clusters/{}",
            segment(project_id),
            segment(name)
        )
    }

    /// GET /api/atlas/v1.0/groups/{groupId}/clusters/{clusterName}
    pub async fn get(&self, project_id: &str, name: &str) -> Result<Cluster, ApiError> {
        self.client.get(&Self::cluster_path(project_id, name)).await
    }

    /// GET /api/atlas/v1.0/groups/{groupId}/clusters/{clusterName}/processArgs
    pub async fn process_args(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<ProcessArgs, ApiError> {
        self.client
            .get(&format!(
                "{}/processArgs",
                Self::cluster_path(project_id, name)
            ))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_deserializes_irregular_field_names() {
        let body = r#"{
            "name": "c0",
            "diskSizeGB": 10.5,
            "mongoDBMajorVersion": "7.0",
            "mongoDBVersion": "7.0.2",
            "mongoURI": "mongodb://a",
            "mongoURIWithOptions": "mongodb://a/?ssl=true",
            "autoScaling": {"compute": {"enabled": true, "scaleDownEnabled": false}, "diskGBEnabled": true},
            "providerSettings": {"providerName": "AWS", "diskIOPS": 3000, "encryptEBSVolume": true, "regionName": "US_EAST_1"},
            "replicationSpecs": [{"id": "r1", "numShards": 1, "zoneName": "Zone 1",
                "regionsConfig": {"US_EAST_1": {"electableNodes": 3, "priority": 7, "readOnlyNodes": 0, "analyticsNodes": 0}}}],
            "links": []
        }"#;
        let cluster: Cluster = serde_json::from_str(body).unwrap();
        assert_eq!(cluster.disk_size_gb, Some(10.5));
        assert_eq!(cluster.mongo_db_major_version.as_deref(), Some("7.0"));
        assert_eq!(cluster.auto_scaling.unwrap().disk_gb_enabled, Some(true));
        let settings = cluster.provider_settings.unwrap();
        assert_eq!(settings.disk_iops, Some(3000));
        assert_eq!(settings.encrypt_ebs_volume, Some(true));
        assert!(cluster.num_shards.is_none());
        assert_eq!(
            cluster.replication_specs[0].regions_config["US_EAST_1"].priority,
            Some(7)
        );
    }

    #[test]
    fn process_args_deserialize_bi_connector_fields() {
        let body = r#"{"oplogSizeMB": 2048, "sampleSizeBIConnector": 100, "sampleRefreshIntervalBIConnector": 300, "javascriptEnabled": false}"#;
        let args: ProcessArgs = serde_json::from_str(body).unwrap();
        assert_eq!(args.oplog_size_mb, Some(2048));
        assert_eq!(args.sample_size_bi_connector, Some(100));
        assert_eq!(args.sample_refresh_interval_bi_connector, Some(300));
        assert_eq!(args.javascript_enabled, Some(false));
        assert!(args.default_read_concern.is_none());
    }
}
