//! Terraform provider for MongoDB Atlas
//!
//! Serves the `mongodbatlas_database_user` resource and the
//! `mongodbatlas_cluster` and `mongodbatlas_stream_account_details` data
//! sources on top of the Atlas Admin API.

pub mod api;
pub mod conversion;
pub mod data_sources;
pub mod provider_data;
pub mod resources;
pub mod state_id;

pub use provider_data::MongoDbAtlasProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use api::{ClientConfig, Credentials};

pub const ENV_BASE_URL: &str = "MONGODB_ATLAS_BASE_URL";
pub const ENV_ACCESS_TOKEN: &str = "MONGODB_ATLAS_ACCESS_TOKEN";
pub const ENV_CLIENT_ID: &str = "MONGODB_ATLAS_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "MONGODB_ATLAS_CLIENT_SECRET";

const DEFAULT_REQUEST_TIMEOUT_SECONDS: f64 = 30.0;

#[derive(Default)]
pub struct MongoDbAtlasProvider {
    provider_data: Option<MongoDbAtlasProviderData>,
}

impl MongoDbAtlasProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_configured(&self) -> bool {
        self.provider_data.is_some()
    }
}

const MAX_REQUEST_TIMEOUT_SECONDS: f64 = 86_400.0;

fn config_string(config: &DynamicValue, name: &str) -> Option<String> {
    config
        .get_optional_string(&AttributePath::new(name))
        .ok()
        .flatten()
        .filter(|s| !s.is_empty())
}

fn env_string(env_var: &str) -> Option<String> {
    std::env::var(env_var).ok().filter(|s| !s.is_empty())
}

/// Configured value, falling back to the environment
fn string_setting(config: &DynamicValue, name: &str, env_var: &str) -> Option<String> {
    config_string(config, name).or_else(|| env_string(env_var))
}

/// Credential attributes are taken from the provider block as a group; the
/// environment is only consulted when none of them is configured
fn credential_settings(config: &DynamicValue) -> (Option<String>, Option<String>, Option<String>) {
    let configured = (
        config_string(config, "access_token"),
        config_string(config, "client_id"),
        config_string(config, "client_secret"),
    );
    match configured {
        (None, None, None) => (
            env_string(ENV_ACCESS_TOKEN),
            env_string(ENV_CLIENT_ID),
            env_string(ENV_CLIENT_SECRET),
        ),
        configured => configured,
    }
}

fn timeout_setting(config: &DynamicValue) -> Option<f64> {
    config
        .get(&AttributePath::new("request_timeout_seconds"))
        .and_then(|v| v.as_number())
}

fn request_timeout(seconds: f64) -> Result<Duration, Diagnostic> {
    let invalid = |reason: String| {
        Diagnostic::error("Invalid request timeout", reason)
            .with_attribute(AttributePath::new("request_timeout_seconds"))
    };
    if !seconds.is_finite() || seconds <= 0.0 || seconds > MAX_REQUEST_TIMEOUT_SECONDS {
        return Err(invalid(format!(
            "request_timeout_seconds must be between 0 and {}, got {}",
            MAX_REQUEST_TIMEOUT_SECONDS, seconds
        )));
    }
    Duration::try_from_secs_f64(seconds.max(1.0)).map_err(|e| invalid(e.to_string()))
}

/// Exactly one credential form must be present
fn resolve_credentials(
    access_token: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
) -> Result<Credentials, Diagnostic> {
    match (access_token, client_id, client_secret) {
        (Some(token), None, None) => Ok(Credentials::AccessToken(token)),
        (None, Some(client_id), Some(client_secret)) => Ok(Credentials::ServiceAccount {
            client_id,
            client_secret,
        }),
        (Some(_), _, _) => Err(Diagnostic::error(
            "Conflicting credentials",
            "access_token cannot be combined with client_id and client_secret",
        )),
        (None, None, None) => Err(Diagnostic::error(
            "Missing credentials",
            format!(
                "Set access_token, or client_id and client_secret, in the provider block or via {}, {} and {}",
                ENV_ACCESS_TOKEN, ENV_CLIENT_ID, ENV_CLIENT_SECRET
            ),
        )),
        (None, _, _) => Err(Diagnostic::error(
            "Incomplete service account credentials",
            "client_id and client_secret must be set together",
        )),
    }
}

#[async_trait]
impl Provider for MongoDbAtlasProvider {
    fn type_name(&self) -> &str {
        "mongodbatlas"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Interact with the MongoDB Atlas Admin API")
            .attribute(
                AttributeBuilder::new("base_url", AttributeType::String)
                    .description("Atlas API base URL. Can also be set with MONGODB_ATLAS_BASE_URL")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("access_token", AttributeType::String)
                    .description("Bearer token. Can also be set with MONGODB_ATLAS_ACCESS_TOKEN")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("client_id", AttributeType::String)
                    .description(
                        "Service account client ID. Can also be set with MONGODB_ATLAS_CLIENT_ID",
                    )
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("client_secret", AttributeType::String)
                    .description(
                        "Service account client secret. Can also be set with \
                         MONGODB_ATLAS_CLIENT_SECRET",
                    )
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("request_timeout_seconds", AttributeType::Number)
                    .description("Timeout of a single API request (default 30)")
                    .optional()
                    .build(),
            )
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        let mut diagnostics = vec![];

        if let Some(Err(diag)) = timeout_setting(&request.config).map(request_timeout) {
            diagnostics.push(diag);
        }

        ValidateProviderConfigResponse { diagnostics }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let config = &request.config;
        let fail = |diagnostic: Diagnostic| ConfigureProviderResponse {
            diagnostics: vec![diagnostic],
            provider_data: None,
        };

        let base_url = string_setting(config, "base_url", ENV_BASE_URL)
            .unwrap_or_else(|| api::DEFAULT_BASE_URL.to_string());
        let (access_token, client_id, client_secret) = credential_settings(config);
        let credentials = match resolve_credentials(access_token, client_id, client_secret) {
            Ok(credentials) => credentials,
            Err(diag) => return fail(diag),
        };
        let seconds = timeout_setting(config).unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS);
        let timeout = match request_timeout(seconds) {
            Ok(timeout) => timeout,
            Err(diag) => return fail(diag),
        };

        tracing::debug!("Configuring MongoDB Atlas provider for {}", base_url);
        let client_config = ClientConfig {
            request_timeout: timeout,
            ..Default::default()
        };
        match api::Client::with_config(&base_url, credentials, client_config) {
            Ok(client) => {
                let data = MongoDbAtlasProviderData::new(client);
                self.provider_data = Some(data.clone());
                ConfigureProviderResponse {
                    diagnostics: vec![],
                    provider_data: Some(Arc::new(data)),
                }
            }
            Err(e) => fail(Diagnostic::error("Failed to create API client", e.to_string())),
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut resources: HashMap<String, ResourceFactory> = HashMap::new();
        resources.insert(
            resources::database_user::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(resources::DatabaseUserResource::new()) as Box<dyn ResourceWithConfigure>
            }),
        );
        resources
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut data_sources: HashMap<String, DataSourceFactory> = HashMap::new();
        data_sources.insert(
            data_sources::cluster::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(data_sources::ClusterDataSource::new()) as Box<dyn DataSourceWithConfigure>
            }),
        );
        data_sources.insert(
            data_sources::stream_account_details::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(data_sources::StreamAccountDetailsDataSource::new())
                    as Box<dyn DataSourceWithConfigure>
            }),
        );
        data_sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tfplug::types::Dynamic;

    fn clear_env() {
        for var in [ENV_BASE_URL, ENV_ACCESS_TOKEN, ENV_CLIENT_ID, ENV_CLIENT_SECRET] {
            std::env::remove_var(var);
        }
    }

    fn config(pairs: Vec<(&str, Dynamic)>) -> DynamicValue {
        DynamicValue::new(Dynamic::object(pairs))
    }

    async fn configure(
        provider: &mut MongoDbAtlasProvider,
        config: DynamicValue,
    ) -> Vec<Diagnostic> {
        provider
            .configure(Context::new(), ConfigureProviderRequest { config })
            .await
            .diagnostics
    }

    #[test]
    fn credentials_require_exactly_one_form() {
        let s = |v: &str| Some(v.to_string());
        let token = tokio_test::assert_ok!(resolve_credentials(s("tok"), None, None));
        assert!(matches!(token, Credentials::AccessToken(t) if t == "tok"));
        let account = tokio_test::assert_ok!(resolve_credentials(None, s("id"), s("secret")));
        assert!(matches!(account, Credentials::ServiceAccount { .. }));
        assert_eq!(
            resolve_credentials(s("tok"), s("id"), s("secret")).unwrap_err().summary,
            "Conflicting credentials"
        );
        assert_eq!(
            resolve_credentials(None, s("id"), None).unwrap_err().summary,
            "Incomplete service account credentials"
        );
        assert_eq!(
            resolve_credentials(None, None, None).unwrap_err().summary,
            "Missing credentials"
        );
    }

    #[tokio::test]
    #[serial]
    async fn provider_configures_from_env_vars() {
        clear_env();
        std::env::set_var(ENV_ACCESS_TOKEN, "env-token");
        std::env::set_var(ENV_BASE_URL, "https://cloud-dev.mongodb.com/");

        let mut provider = MongoDbAtlasProvider::new();
        let diagnostics = configure(&mut provider, DynamicValue::empty_object()).await;
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert!(provider.is_configured());
        assert_eq!(
            provider.provider_data.as_ref().unwrap().client.base_url(),
            "https://cloud-dev.mongodb.com"
        );

        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn config_takes_precedence_over_env() {
        clear_env();
        std::env::set_var(ENV_BASE_URL, "not a url");

        let mut provider = MongoDbAtlasProvider::new();
        let diagnostics = configure(
            &mut provider,
            config(vec![
                ("base_url", Dynamic::from("https://cloud.mongodb.com/")),
                ("access_token", Dynamic::from("tok")),
            ]),
        )
        .await;
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);

        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn provider_configure_requires_credentials() {
        clear_env();

        let mut provider = MongoDbAtlasProvider::new();
        let diagnostics = configure(&mut provider, DynamicValue::empty_object()).await;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Missing credentials");
        assert!(!provider.is_configured());
    }

    #[tokio::test]
    #[serial]
    async fn invalid_base_url_is_reported() {
        clear_env();

        let mut provider = MongoDbAtlasProvider::new();
        let diagnostics = configure(
            &mut provider,
            config(vec![
                ("base_url", Dynamic::from("ftp://cloud.mongodb.com")),
                ("access_token", Dynamic::from("tok")),
            ]),
        )
        .await;
        assert_eq!(diagnostics[0].summary, "Failed to create API client");
    }

    #[tokio::test]
    async fn validate_rejects_non_positive_timeout() {
        let provider = MongoDbAtlasProvider::new();
        let response = provider
            .validate(
                Context::new(),
                ValidateProviderConfigRequest {
                    config: config(vec![("request_timeout_seconds", Dynamic::Number(0.0))]),
                },
            )
            .await;
        assert_eq!(response.diagnostics[0].summary, "Invalid request timeout");
    }

    #[tokio::test]
    async fn validate_rejects_oversized_timeouts() {
        let provider = MongoDbAtlasProvider::new();
        for timeout in [1e30, f64::INFINITY, f64::NAN, 86_401.0] {
            let response = provider
                .validate(
                    Context::new(),
                    ValidateProviderConfigRequest {
                        config: config(vec![("request_timeout_seconds", Dynamic::Number(timeout))]),
                    },
                )
                .await;
            assert_eq!(response.diagnostics.len(), 1, "timeout {}", timeout);
            assert_eq!(response.diagnostics[0].summary, "Invalid request timeout");
        }
    }

    #[tokio::test]
    #[serial]
    async fn configure_reports_huge_timeout_instead_of_panicking() {
        clear_env();

        let mut provider = MongoDbAtlasProvider::new();
        let diagnostics = configure(
            &mut provider,
            config(vec![
                ("access_token", Dynamic::from("tok")),
                ("request_timeout_seconds", Dynamic::Number(1e30)),
            ]),
        )
        .await;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Invalid request timeout");
        assert!(!provider.is_configured());
    }

    #[test]
    fn request_timeout_rounds_up_to_one_second() {
        assert_eq!(request_timeout(0.25).unwrap(), Duration::from_secs(1));
        assert_eq!(request_timeout(45.0).unwrap(), Duration::from_secs(45));
    }

    #[tokio::test]
    #[serial]
    async fn configured_token_ignores_env_service_account() {
        clear_env();
        std::env::set_var(ENV_CLIENT_ID, "env-id");
        std::env::set_var(ENV_CLIENT_SECRET, "env-secret");

        let mut provider = MongoDbAtlasProvider::new();
        let diagnostics = configure(
            &mut provider,
            config(vec![("access_token", Dynamic::from("cfg-token"))]),
        )
        .await;
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert!(provider.is_configured());

        clear_env();
    }

    #[test]
    #[serial]
    fn env_credentials_are_used_only_when_none_configured() {
        clear_env();
        std::env::set_var(ENV_ACCESS_TOKEN, "env-token");

        let (token, id, secret) = credential_settings(&config(vec![
            ("client_id", Dynamic::from("cfg-id")),
            ("client_secret", Dynamic::from("cfg-secret")),
        ]));
        assert_eq!(token, None);
        assert_eq!(id.as_deref(), Some("cfg-id"));
        assert_eq!(secret.as_deref(), Some("cfg-secret"));

        let (token, id, secret) = credential_settings(&DynamicValue::empty_object());
        assert_eq!(token.as_deref(), Some("env-token"));
        assert_eq!((id, secret), (None, None));

        clear_env();
    }

    #[test]
    fn registers_resources_and_data_sources() {
        let provider = MongoDbAtlasProvider::new();
        assert!(provider.resources().contains_key("mongodbatlas_database_user"));
        let data_sources = provider.data_sources();
        assert!(data_sources.contains_key("mongodbatlas_cluster"));
        assert!(data_sources.contains_key("mongodbatlas_stream_account_details"));
    }
}
