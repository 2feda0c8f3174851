//! Database user resource implementation

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource,
    ReadResourceRequest, ReadResourceResponse, Resource, ResourceSchemaRequest,
    ResourceSchemaResponse, ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{
    AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, SchemaBuilder,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{ConflictsWith, StringLength, StringOneOf};

use crate::api::database_users::{DatabaseUser, Role, Scope};
use crate::api::{self, ApiError, Label};
use crate::conversion::{
    append_default_label, labels_to_dynamic, remove_default_label, string_null_if_empty,
};
use crate::provider_data::{not_configured, MongoDbAtlasProviderData};
use crate::state_id::{StateId, StateIdError};

pub const TYPE_NAME: &str = "mongodbatlas_database_user";

const ID_PROJECT: &str = "project_id";
const ID_USERNAME: &str = "username";
const ID_AUTH_DATABASE: &str = "auth_database_name";

/// Identity of a database user in Atlas
#[derive(Debug, Clone, PartialEq)]
struct UserKey {
    project_id: String,
    username: String,
    auth_database_name: String,
}

impl UserKey {
    fn to_state_id(&self) -> StateId {
        StateId::new()
            .with(ID_PROJECT, &self.project_id)
            .with(ID_USERNAME, &self.username)
            .with(ID_AUTH_DATABASE, &self.auth_database_name)
    }

    fn from_state_id(id: &str) -> Result<Self, StateIdError> {
        let id = StateId::decode(id)?;
        Ok(Self {
            project_id: id.require(ID_PROJECT)?.to_string(),
            username: id.require(ID_USERNAME)?.to_string(),
            auth_database_name: id.require(ID_AUTH_DATABASE)?.to_string(),
        })
    }

    /// Parse `{project_id}/{username}/{auth_database_name}`; the username may contain `/`
    fn from_import_id(id: &str) -> Option<Self> {
        let (project_id, rest) = id.split_once('/')?;
        let (username, auth_database_name) = rest.rsplit_once('/')?;
        if project_id.is_empty() || username.is_empty() || auth_database_name.is_empty() {
            return None;
        }
        Some(Self {
            project_id: project_id.to_string(),
            username: username.to_string(),
            auth_database_name: auth_database_name.to_string(),
        })
    }
}

/// Typed view of the resource's plan and state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseUserModel {
    pub id: Option<String>,
    pub project_id: String,
    pub database_name: Option<String>,
    pub auth_database_name: Option<String>,
    pub username: String,
    pub password: Option<String>,
    pub x509_type: Option<String>,
    pub ldap_auth_type: Option<String>,
    pub aws_iam_type: Option<String>,
    pub roles: Vec<Role>,
    pub labels: Vec<Label>,
    pub scopes: Vec<Scope>,
}

impl DatabaseUserModel {
    pub fn from_value(value: &DynamicValue) -> Result<Self, Diagnostic> {
        let optional = |name: &str| {
            value
                .get_optional_string(&AttributePath::new(name))
                .map(|v| v.filter(|s| !s.is_empty()))
                .map_err(|e| invalid_value(name, e))
        };
        let required = |name: &str| {
            value
                .get_string(&AttributePath::new(name))
                .map_err(|e| invalid_value(name, e))
        };
        let items = |name: &str| {
            value
                .get_optional_list(&AttributePath::new(name))
                .map_err(|e| invalid_value(name, e))
        };
        let text = |item: &Dynamic, name: &str| item.attr(name).as_string().map(str::to_string);

        let roles = items("roles")?
            .iter()
            .map(|r| Role {
                role_name: text(r, "role_name").unwrap_or_default(),
                database_name: text(r, "database_name").unwrap_or_default(),
                collection_name: text(r, "collection_name").filter(|s| !s.is_empty()),
            })
            .collect();
        let labels = items("labels")?
            .iter()
            .map(|l| {
                Label::new(
                    text(l, "key").unwrap_or_default(),
                    text(l, "value").unwrap_or_default(),
                )
            })
            .collect();
        let scopes = items("scopes")?
            .iter()
            .map(|s| Scope {
                name: text(s, "name").unwrap_or_default(),
                scope_type: text(s, "type").unwrap_or_default(),
            })
            .collect();

        Ok(Self {
            id: optional("id")?,
            project_id: required("project_id")?,
            database_name: optional("database_name")?,
            auth_database_name: optional("auth_database_name")?,
            username: required("username")?,
            password: optional("password")?,
            x509_type: optional("x509_type")?,
            ldap_auth_type: optional("ldap_auth_type")?,
            aws_iam_type: optional("aws_iam_type")?,
            roles,
            labels,
            scopes,
        })
    }

    /// Authentication database, preferring the deprecated attribute when set
    pub fn auth_database(&self) -> Option<&str> {
        self.database_name
            .as_deref()
            .or(self.auth_database_name.as_deref())
    }

    pub fn to_api(&self) -> DatabaseUser {
        DatabaseUser {
            database_name: self.auth_database().unwrap_or_default().to_string(),
            group_id: self.project_id.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            roles: self.roles.clone(),
            labels: append_default_label(self.labels.clone()),
            scopes: self.scopes.clone(),
            x509_type: self.x509_type.clone(),
            aws_iam_type: self.aws_iam_type.clone(),
            ldap_auth_type: self.ldap_auth_type.clone(),
        }
    }

    /// Build the model from an API response. Atlas never returns the password,
    /// so it is carried over from the plan or prior state.
    pub fn from_api(
        user: DatabaseUser,
        project_id: &str,
        password: Option<String>,
        legacy_database_name: bool,
    ) -> Self {
        let key = UserKey {
            project_id: project_id.to_string(),
            username: user.username.clone(),
            auth_database_name: user.database_name.clone(),
        };
        let (database_name, auth_database_name) = if legacy_database_name {
            (Some(user.database_name), None)
        } else {
            (None, Some(user.database_name))
        };

        Self {
            id: Some(key.to_state_id().encode()),
            project_id: project_id.to_string(),
            database_name,
            auth_database_name,
            username: user.username,
            password,
            x509_type: user.x509_type,
            ldap_auth_type: user.ldap_auth_type,
            aws_iam_type: user.aws_iam_type,
            roles: user.roles,
            labels: remove_default_label(user.labels),
            scopes: user.scopes,
        }
    }

    pub fn to_state(&self) -> DynamicValue {
        let roles = self
            .roles
            .iter()
            .map(|r| {
                Dynamic::object([
                    ("role_name", Dynamic::from(r.role_name.as_str())),
                    ("database_name", Dynamic::from(r.database_name.as_str())),
                    ("collection_name", string_null_if_empty(r.collection_name.as_ref())),
                ])
            })
            .collect::<Vec<_>>();
        let scopes = self
            .scopes
            .iter()
            .map(|s| {
                Dynamic::object([
                    ("name", Dynamic::from(s.name.as_str())),
                    ("type", Dynamic::from(s.scope_type.as_str())),
                ])
            })
            .collect::<Vec<_>>();

        DynamicValue::new(Dynamic::object([
            ("id", Dynamic::from(self.id.clone())),
            ("project_id", Dynamic::from(self.project_id.as_str())),
            ("database_name", Dynamic::from(self.database_name.clone())),
            ("auth_database_name", Dynamic::from(self.auth_database_name.clone())),
            ("username", Dynamic::from(self.username.as_str())),
            ("password", Dynamic::from(self.password.clone())),
            ("x509_type", Dynamic::from(self.x509_type.clone())),
            ("ldap_auth_type", Dynamic::from(self.ldap_auth_type.clone())),
            ("aws_iam_type", Dynamic::from(self.aws_iam_type.clone())),
            ("roles", Dynamic::List(roles)),
            ("labels", labels_to_dynamic(&self.labels)),
            ("scopes", Dynamic::List(scopes)),
        ]))
    }
}

fn invalid_value(name: &str, err: tfplug::TfplugError) -> Diagnostic {
    Diagnostic::error("Invalid attribute value", err.to_string())
        .with_attribute(AttributePath::new(name))
}

fn invalid_state_id(err: StateIdError) -> Diagnostic {
    Diagnostic::error("Invalid database user ID", err.to_string())
        .with_attribute(AttributePath::new("id"))
}

fn state_key(state: &DynamicValue) -> Result<UserKey, Diagnostic> {
    let id = state
        .get_string(&AttributePath::new("id"))
        .map_err(|e| invalid_value("id", e))?;
    UserKey::from_state_id(&id).map_err(invalid_state_id)
}

#[derive(Default)]
pub struct DatabaseUserResource {
    provider_data: Option<MongoDbAtlasProviderData>,
}

impl DatabaseUserResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<&api::Client, Diagnostic> {
        self.provider_data
            .as_ref()
            .map(|data| data.client.as_ref())
            .ok_or_else(not_configured)
    }
}

#[async_trait]
impl Resource for DatabaseUserResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a MongoDB Atlas database user")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Encoded identifier of the database user")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Atlas project the user belongs to")
                    .required()
                    .validator(StringLength::create(Some(1), None))
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("database_name", AttributeType::String)
                    .description("Authentication database of the user")
                    .optional()
                    .deprecated("use auth_database_name instead")
                    .validator(ConflictsWith::create(&["auth_database_name"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("auth_database_name", AttributeType::String)
                    .description("Authentication database of the user: admin, or $external for X.509, LDAP and AWS IAM users")
                    .optional()
                    .validator(ConflictsWith::create(&["database_name"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("username", AttributeType::String)
                    .description("Username used to authenticate against MongoDB")
                    .required()
                    .validator(StringLength::create(Some(1), Some(1024)))
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("password", AttributeType::String)
                    .description("Password of the user")
                    .optional()
                    .sensitive()
                    .validator(ConflictsWith::create(&[
                        "x509_type",
                        "ldap_auth_type",
                        "aws_iam_type",
                    ]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("x509_type", AttributeType::String)
                    .description("X.509 authentication method: NONE, MANAGED or CUSTOMER")
                    .optional()
                    .computed()
                    .default(StaticDefault::string("NONE"))
                    .validator(StringOneOf::create(&["NONE", "MANAGED", "CUSTOMER"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ldap_auth_type", AttributeType::String)
                    .description("LDAP authentication method: NONE, USER or GROUP")
                    .optional()
                    .computed()
                    .default(StaticDefault::string("NONE"))
                    .validator(StringOneOf::create(&["NONE", "USER", "GROUP"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("aws_iam_type", AttributeType::String)
                    .description("AWS IAM authentication method: NONE, USER or ROLE")
                    .optional()
                    .computed()
                    .default(StaticDefault::string("NONE"))
                    .validator(StringOneOf::create(&["NONE", "USER", "ROLE"]))
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("roles", NestingMode::Set)
                    .description("Roles granted to the user")
                    .min_items(1)
                    .attribute(
                        AttributeBuilder::new("role_name", AttributeType::String)
                            .optional()
                            .computed()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("collection_name", AttributeType::String)
                            .optional()
                            .computed()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("database_name", AttributeType::String)
                            .optional()
                            .computed()
                            .build(),
                    )
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("labels", NestingMode::Set)
                    .description("Key/value pairs tagging the user")
                    .attribute(
                        AttributeBuilder::new("key", AttributeType::String)
                            .optional()
                            .computed()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("value", AttributeType::String)
                            .optional()
                            .computed()
                            .build(),
                    )
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("scopes", NestingMode::Set)
                    .description("Clusters and data lakes the user can access")
                    .attribute(
                        AttributeBuilder::new("name", AttributeType::String)
                            .optional()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("type", AttributeType::String)
                            .optional()
                            .validator(StringOneOf::create(&["CLUSTER", "DATA_LAKE"]))
                            .build(),
                    )
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        // Unknown values may still resolve to either attribute
        let database_name = request.config.value.attr("database_name");
        let auth_database_name = request.config.value.attr("auth_database_name");
        if database_name.is_null() && auth_database_name.is_null() {
            diagnostics.push(Diagnostic::error(
                "one of database_name or auth_database_name must be configured",
                "",
            ));
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let fail = |diagnostic: Diagnostic| CreateResourceResponse {
            new_state: None,
            diagnostics: vec![diagnostic],
        };

        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => return fail(diag),
        };
        let plan = match DatabaseUserModel::from_value(&request.planned_state) {
            Ok(plan) => plan,
            Err(diag) => return fail(diag),
        };
        if plan.auth_database().is_none() {
            return fail(Diagnostic::error(
                "one of database_name or auth_database_name must be configured",
                "",
            ));
        }

        tracing::debug!(
            "Creating database user {} in project {}",
            plan.username,
            plan.project_id
        );
        let result = api::cancellable(
            &ctx,
            client
                .database_users()
                .create(&plan.project_id, &plan.to_api()),
        )
        .await;

        match result {
            Ok(user) => {
                let model = DatabaseUserModel::from_api(
                    user,
                    &plan.project_id,
                    plan.password.clone(),
                    plan.database_name.is_some(),
                );
                CreateResourceResponse {
                    new_state: Some(model.to_state()),
                    diagnostics: vec![],
                }
            }
            Err(e) => fail(Diagnostic::error("error creating database user", e.to_string())),
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let keep = |current: DynamicValue, diagnostic: Diagnostic| ReadResourceResponse {
            new_state: Some(current),
            diagnostics: vec![diagnostic],
        };

        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => return keep(request.current_state, diag),
        };
        let key = match state_key(&request.current_state) {
            Ok(key) => key,
            Err(diag) => return keep(request.current_state, diag),
        };

        let result = api::cancellable(
            &ctx,
            client
                .database_users()
                .get(&key.project_id, &key.auth_database_name, &key.username),
        )
        .await;

        match result {
            Ok(user) => {
                let current = &request.current_state.value;
                let password = current.attr("password").as_string().map(str::to_string);
                let legacy = !current.attr("database_name").is_null();
                let model = DatabaseUserModel::from_api(user, &key.project_id, password, legacy);
                ReadResourceResponse {
                    new_state: Some(model.to_state()),
                    diagnostics: vec![],
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::info!(
                    "Database user {} not found in project {}, removing from state",
                    key.username,
                    key.project_id
                );
                ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                }
            }
            Err(e) => keep(
                request.current_state,
                Diagnostic::error("error getting database user information", e.to_string()),
            ),
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let keep = |prior: DynamicValue, diagnostic: Diagnostic| UpdateResourceResponse {
            new_state: prior,
            diagnostics: vec![diagnostic],
        };

        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => return keep(request.prior_state, diag),
        };
        let key = match state_key(&request.prior_state) {
            Ok(key) => key,
            Err(diag) => return keep(request.prior_state, diag),
        };
        let plan = match DatabaseUserModel::from_value(&request.planned_state) {
            Ok(plan) => plan,
            Err(diag) => return keep(request.prior_state, diag),
        };

        tracing::debug!(
            "Updating database user {} in project {}",
            key.username,
            key.project_id
        );
        let result = api::cancellable(
            &ctx,
            client.database_users().update(
                &key.project_id,
                &key.auth_database_name,
                &key.username,
                &plan.to_api(),
            ),
        )
        .await;

        match result {
            Ok(user) => {
                let model = DatabaseUserModel::from_api(
                    user,
                    &plan.project_id,
                    plan.password.clone(),
                    plan.database_name.is_some(),
                );
                UpdateResourceResponse {
                    new_state: model.to_state(),
                    diagnostics: vec![],
                }
            }
            Err(e) => keep(
                request.prior_state,
                Diagnostic::error("error updating database user", e.to_string()),
            ),
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => return DeleteResourceResponse { diagnostics: vec![diag] },
        };
        let key = match state_key(&request.prior_state) {
            Ok(key) => key,
            Err(diag) => return DeleteResourceResponse { diagnostics: vec![diag] },
        };

        let result = api::cancellable(
            &ctx,
            client
                .database_users()
                .delete(&key.project_id, &key.auth_database_name, &key.username),
        )
        .await;

        let diagnostics = match result {
            Ok(()) => vec![],
            Err(e) if e.is_not_found() => {
                tracing::debug!("Database user {} already deleted", key.username);
                vec![]
            }
            Err(e) => vec![Diagnostic::error("error deleting database user", e.to_string())],
        };
        DeleteResourceResponse { diagnostics }
    }

    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let fail = |diagnostic: Diagnostic| ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![diagnostic],
        };

        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => return fail(diag),
        };
        let key = match UserKey::from_state_id(&request.id)
            .ok()
            .or_else(|| UserKey::from_import_id(&request.id))
        {
            Some(key) => key,
            None => {
                return fail(Diagnostic::error(
                    "Invalid import ID",
                    format!(
                        "Expected {{project_id}}/{{username}}/{{auth_database_name}}, got {:?}",
                        request.id
                    ),
                ))
            }
        };

        let result: Result<DatabaseUser, ApiError> = api::cancellable(
            &ctx,
            client
                .database_users()
                .get(&key.project_id, &key.auth_database_name, &key.username),
        )
        .await;

        match result {
            Ok(user) => {
                let model = DatabaseUserModel::from_api(user, &key.project_id, None, false);
                ImportResourceStateResponse {
                    imported_resources: vec![ImportedResource {
                        type_name: request.type_name,
                        state: model.to_state(),
                    }],
                    diagnostics: vec![],
                }
            }
            Err(e) => fail(Diagnostic::error(
                format!("error importing database user {}", key.username),
                e.to_string(),
            )),
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for DatabaseUserResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        match MongoDbAtlasProviderData::from_any(request.provider_data) {
            Ok(data) => {
                self.provider_data = data;
                ConfigureResourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(diag) => ConfigureResourceResponse {
                diagnostics: vec![diag],
            },
        }
    }
}

#[cfg(test)]
#[path = "./database_user_test.rs"]
mod database_user_test;
