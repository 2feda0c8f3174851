//! Database user API implementation

use super::common::{segment, Label};
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

/// Database user as returned and accepted by the Atlas API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseUser {
    /// Authentication database
    #[serde(default)]
    pub database_name: String,
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub scopes: Vec<Scope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x509_type: Option<String>,
    #[serde(rename = "awsIAMType", skip_serializing_if = "Option::is_none")]
    pub aws_iam_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ldap_auth_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(default)]
    pub role_name: String,
    #[serde(default)]
    pub database_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
}

/// Cluster or data lake the user is restricted to
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub scope_type: String,
}

/// Database users API
pub struct DatabaseUsersApi<'a> {
    client: &'a Client,
}

impl<'a> DatabaseUsersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn collection_path(project_id: &str) -> String {
        format!(
            "/api/atlas/v1.0/groups/{}/databaseUsers",
            segment(project_id)
        )
    }

    fn user_path(project_id: &str, auth_database_name: &str, username: &str) -> String {
        format!(
            "{}/{}/{}",
            Self::collection_path(project_id),
            segment(auth_database_name),
            segment(username)
        )
    }

    /// POST /api/atlas/v1.0/groups/{groupId}/databaseUsers
    pub async fn create(
        &self,
        project_id: &str,
        user: &DatabaseUser,
    ) -> Result<DatabaseUser, ApiError> {
        self.client
            .post(&Self::collection_path(project_id), user)
            .await
    }

    /// GET /api/atlas/v1.0/groups/{groupId}/databaseUsers/{databaseName}/{username}
    pub async fn get(
        &self,
        project_id: &str,
        auth_database_name: &str,
        username: &str,
    ) -> Result<DatabaseUser, ApiError> {
        self.client
            .get(&Self::user_path(project_id, auth_database_name, username))
            .await
    }

    /// PATCH /api/atlas/v1.0/groups/{groupId}/databaseUsers/{databaseName}/{username}
    pub async fn update(
        &self,
        project_id: &str,
        auth_database_name: &str,
        username: &str,
        user: &DatabaseUser,
    ) -> Result<DatabaseUser, ApiError> {
        self.client
            .patch(
                &Self::user_path(project_id, auth_database_name, username),
                user,
            )
            .await
    }

    /// DELETE /api/atlas/v1.0/groups/{groupId}/databaseUsers/{databaseName}/{username}
    pub async fn delete(
        &self,
        project_id: &str,
        auth_database_name: &str,
        username: &str,
    ) -> Result<(), ApiError> {
        self.client
            .delete(&Self::user_path(project_id, auth_database_name, username))
            .await
    }
}
