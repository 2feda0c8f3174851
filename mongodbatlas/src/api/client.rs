use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::common::AtlasErrorResponse;
use super::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://cloud.mongodb.com/";

/// Accept header for the versionless v1.0 API
const V1_MEDIA_TYPE: &str = "application/json";

/// HTTP settings of the underlying reqwest client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(90),
        }
    }
}

/// Credentials accepted by the Atlas Admin API
#[derive(Clone)]
pub enum Credentials {
    /// Pre-issued bearer token
    AccessToken(String),
    /// Service account, exchanged for a bearer token on first use
    ServiceAccount {
        client_id: String,
        client_secret: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
            Credentials::ServiceAccount { client_id, .. } => f
                .debug_struct("ServiceAccount")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Atlas Admin API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    token: OnceCell<String>,
}

impl Client {
    /// Create a new API client with default connection settings
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self, ApiError> {
        Self::with_config(base_url, credentials, ClientConfig::default())
    }

    /// Create a new API client with custom connection settings
    pub fn with_config(
        base_url: &str,
        credentials: Credentials,
        config: ClientConfig,
    ) -> Result<Self, ApiError> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                base_url
            )));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("terraform-provider-mongodbatlas/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.idle_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: base_url.trim_end_matches('/').to_string(),
                credentials,
                token: OnceCell::new(),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Execute a GET request against the v1.0 API
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(Method::GET, path, None::<&()>, V1_MEDIA_TYPE)
            .await
    }

    /// Execute a GET request against the versioned v2 API
    pub async fn get_versioned<T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
    ) -> Result<T, ApiError> {
        let media_type = format!("application/vnd.atlas.{}+json", api_version);
        self.execute(Method::GET, path, None::<&()>, &media_type)
            .await
    }

    /// Execute a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute(Method::POST, path, Some(body), V1_MEDIA_TYPE)
            .await
    }

    /// Execute a PATCH request
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute(Method::PATCH, path, Some(body), V1_MEDIA_TYPE)
            .await
    }

    /// Execute a DELETE request, ignoring any response body
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, None::<&()>, V1_MEDIA_TYPE)
            .await
            .map(|_| ())
    }

    /// Database user operations
    pub fn database_users(&self) -> super::database_users::DatabaseUsersApi<'_> {
        super::database_users::DatabaseUsersApi::new(self)
    }

    /// Cluster operations
    pub fn clusters(&self) -> super::clusters::ClustersApi<'_> {
        super::clusters::ClustersApi::new(self)
    }

    /// Network peering container operations
    pub fn containers(&self) -> super::containers::ContainersApi<'_> {
        super::containers::ContainersApi::new(self)
    }

    /// Cloud backup schedule operations
    pub fn cloud_backup(&self) -> super::cloud_backup::CloudBackupApi<'_> {
        super::cloud_backup::CloudBackupApi::new(self)
    }

    /// Atlas Stream Processing operations
    pub fn streams(&self) -> super::streams::StreamsApi<'_> {
        super::streams::StreamsApi::new(self)
    }

    async fn execute<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        media_type: &str,
    ) -> Result<T, ApiError> {
        let response = self.send(method, path, body, media_type).await?;
        self.parse_success_response(response).await
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        media_type: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.inner.base_url, path);

        tracing::debug!("{} request to: {}", method, url);

        let mut request = self
            .inner
            .http_client
            .request(method.clone(), &url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(ACCEPT, media_type);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, media_type).json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!("{} {} failed: {}", method, path, e);
            ApiError::RequestError(e)
        })?;

        let status = response.status();
        tracing::debug!("Response status: {}", status);

        if status.is_success() {
            Ok(response)
        } else {
            Err(self.handle_error_response(method, path, response).await)
        }
    }

    /// Parse successful response; an empty body parses as JSON null
    async fn parse_success_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };

        serde_json::from_str::<T>(text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    async fn handle_error_response(
        &self,
        method: Method,
        path: &str,
        response: reqwest::Response,
    ) -> ApiError {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::warn!("API error response ({}): {}", status, text);

        let details = serde_json::from_str::<AtlasErrorResponse>(&text).ok();
        let message = details
            .as_ref()
            .map(|d| d.detail.clone())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| text.clone());
        let error_code = details
            .as_ref()
            .map(|d| d.error_code.clone())
            .filter(|c| !c.is_empty());

        ApiError::ApiError {
            method: method.to_string(),
            path: path.to_string(),
            status,
            error_code,
            message,
            details: details.map(Box::new),
        }
    }

    async fn access_token(&self) -> Result<String, ApiError> {
        match &self.inner.credentials {
            Credentials::AccessToken(token) => Ok(token.clone()),
            Credentials::ServiceAccount {
                client_id,
                client_secret,
            } => self
                .inner
                .token
                .get_or_try_init(|| self.fetch_token(client_id, client_secret))
                .await
                .cloned(),
        }
    }

    /// Exchange service account credentials for a bearer token
    async fn fetch_token(&self, client_id: &str, client_secret: &str) -> Result<String, ApiError> {
        let url = format!("{}/api/oauth/token", self.inner.base_url);
        tracing::debug!("Requesting access token from: {}", url);

        let response = self
            .inner
            .http_client
            .post(&url)
            .basic_auth(client_id, Some(client_secret))
            .header(ACCEPT, V1_MEDIA_TYPE)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::AuthError(format!(
                "token request returned HTTP {}: {}",
                status.as_u16(),
                text
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::AuthError(format!("invalid token response: {}", e)))?;
        Ok(token.access_token)
    }
}
