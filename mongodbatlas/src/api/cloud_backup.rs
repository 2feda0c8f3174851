//! Cloud backup schedule API implementation

use super::clusters::ClustersApi;
use super::{ApiError, Client};
use serde::Deserialize;

const BACKUP_CONFIG_NOT_FOUND: &str = "BACKUP_CONFIG_NOT_FOUND";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotSchedule {
    pub cluster_id: Option<String>,
    pub cluster_name: Option<String>,
    pub next_snapshot: Option<String>,
    pub reference_hour_of_day: Option<i64>,
    pub reference_minute_of_hour: Option<i64>,
    pub restore_window_days: Option<i64>,
    pub update_snapshots: Option<bool>,
    pub policies: Vec<Policy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Policy {
    pub id: Option<String>,
    pub policy_items: Vec<PolicyItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyItem {
    pub id: Option<String>,
    pub frequency_interval: Option<i64>,
    pub frequency_type: Option<String>,
    pub retention_unit: Option<String>,
    pub retention_value: Option<i64>,
}

/// Whether a schedule error means backups are simply not enabled
pub fn is_backup_not_enabled(err: &ApiError) -> bool {
    if err.is_not_found() || err.error_code() == Some(BACKUP_CONFIG_NOT_FOUND) {
        return true;
    }
    let message = err.to_string();
    message.contains("Not Found") || message.contains("as it is not enabled")
}

/// Cloud backup API
pub struct CloudBackupApi<'a> {
    client: &'a Client,
}

impl<'a> CloudBackupApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/atlas/v1.0/groups/{groupId}/clusters/{clusterName}/backup/schedule
    ///
    /// Returns `None` when the cluster has no cloud backup configured.
    pub async fn schedule(
        &self,
        project_id: &str,
        cluster_name: &str,
    ) -> Result<Option<SnapshotSchedule>, ApiError> {
        let path = format!(
            "{}/backup/schedule",
            ClustersApi::cluster_path(project_id, cluster_name)
        );
        match self.client.get(&path).await {
            Ok(schedule) => Ok(Some(schedule)),
            Err(e) if is_backup_not_enabled(&e) => {
                tracing::debug!("No backup schedule for cluster {}: {}", cluster_name, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Credentials;
    use mockito::Server;

    fn api_error(status: u16, code: Option<&str>, message: &str) -> ApiError {
        ApiError::ApiError {
            method: "GET".into(),
            path: "/x".into(),
            status,
            error_code: code.map(String::from),
            message: message.into(),
            details: None,
        }
    }

    #[test]
    fn classifies_disabled_backup_errors() {
        assert!(is_backup_not_enabled(&api_error(404, None, "gone")));
        assert!(is_backup_not_enabled(&api_error(
            400,
            Some("BACKUP_CONFIG_NOT_FOUND"),
            "no config"
        )));
        assert!(is_backup_not_enabled(&api_error(
            400,
            Some("CLOUD_BACKUP_INVALID"),
            "Cannot get backup schedule as it is not enabled"
        )));
        assert!(!is_backup_not_enabled(&api_error(
            500,
            Some("UNEXPECTED_ERROR"),
            "boom"
        )));
    }

    #[tokio::test]
    async fn schedule_is_none_when_backup_disabled() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/atlas/v1.0/groups/p1/clusters/c0/backup/schedule")
            .with_status(404)
            .with_body(r#"{"detail":"Backup configuration not found.","error":404,"errorCode":"BACKUP_CONFIG_NOT_FOUND","reason":"Not Found"}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), Credentials::AccessToken("t".into())).unwrap();
        let schedule = client.cloud_backup().schedule("p1", "c0").await.unwrap();
        assert!(schedule.is_none());
    }

    #[tokio::test]
    async fn schedule_parses_policies() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/atlas/v1.0/groups/p1/clusters/c0/backup/schedule")
            .with_body(
                r#"{"clusterId":"cid","clusterName":"c0","referenceHourOfDay":3,"restoreWindowDays":7,
                "policies":[{"id":"pol","policyItems":[{"id":"i1","frequencyInterval":6,"frequencyType":"hourly","retentionUnit":"days","retentionValue":2}]}]}"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), Credentials::AccessToken("t".into())).unwrap();
        let schedule = client
            .cloud_backup()
            .schedule("p1", "c0")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(schedule.reference_hour_of_day, Some(3));
        assert_eq!(schedule.policies[0].policy_items[0].frequency_type.as_deref(), Some("hourly"));
    }
}
