//! Drives a small in-memory provider through ProviderServer

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{
    AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, SchemaBuilder,
};
use tfplug::types::{AttributePath, Diagnostic, Diagnostics, Dynamic, DynamicValue};
use tfplug::validator::StringOneOf;
use tfplug::{Context, ProviderServer};

type Store = Arc<Mutex<HashMap<String, String>>>;

struct KvProvider {
    store: Store,
}

#[async_trait]
impl Provider for KvProvider {
    fn type_name(&self) -> &str {
        "kv"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("namespace", AttributeType::String)
                        .optional()
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        _request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new(self.store.clone())),
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut resources: HashMap<String, ResourceFactory> = HashMap::new();
        resources.insert(
            "kv_entry".to_string(),
            Box::new(|| Box::new(KvEntry::default()) as Box<dyn ResourceWithConfigure>),
        );
        resources
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut data_sources: HashMap<String, DataSourceFactory> = HashMap::new();
        data_sources.insert(
            "kv_lookup".to_string(),
            Box::new(|| Box::new(KvLookup::default()) as Box<dyn DataSourceWithConfigure>),
        );
        data_sources
    }
}

#[derive(Default)]
struct KvEntry {
    store: Option<Store>,
}

impl KvEntry {
    fn state(key: &str, value: &str, mode: &str, tags: Vec<Dynamic>) -> DynamicValue {
        DynamicValue::new(Dynamic::object([
            ("id", Dynamic::from(format!("entry-{}", key))),
            ("key", key.into()),
            ("value", value.into()),
            ("mode", mode.into()),
            ("tags", Dynamic::List(tags)),
            ("labels", Dynamic::List(vec![])),
        ]))
    }

    fn write(&self, plan: &DynamicValue) -> DynamicValue {
        let key = plan.get_string(&AttributePath::new("key")).unwrap();
        let value = plan
            .get_optional_string(&AttributePath::new("value"))
            .unwrap()
            .unwrap_or_default();
        let mode = plan.get_string(&AttributePath::new("mode")).unwrap();
        let tags = plan.get_optional_list(&AttributePath::new("tags")).unwrap();
        let labels = plan.get_optional_list(&AttributePath::new("labels")).unwrap();
        self.store
            .as_ref()
            .unwrap()
            .lock()
            .unwrap()
            .insert(key.clone(), value.clone());
        let mut state = Self::state(&key, &value, &mode, tags);
        state
            .set(&AttributePath::new("labels"), Dynamic::List(labels))
            .unwrap();
        state
    }
}

#[async_trait]
impl Resource for KvEntry {
    fn type_name(&self) -> &str {
        "kv_entry"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("key", AttributeType::String)
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("value", AttributeType::String)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("mode", AttributeType::String)
                    .optional()
                    .computed()
                    .default(StaticDefault::string("plain"))
                    .validator(StringOneOf::create(&["plain", "secret"]))
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("tags", NestingMode::List)
                    .attribute(
                        AttributeBuilder::new("name", AttributeType::String)
                            .required()
                            .build(),
                    )
                    .max_items(2)
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("labels", NestingMode::Set)
                    .attribute(
                        AttributeBuilder::new("name", AttributeType::String)
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("color", AttributeType::String)
                            .optional()
                            .computed()
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

    async fn create(
        &self,
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        CreateResourceResponse {
            new_state: Some(self.write(&request.planned_state)),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let key = request.current_state.get_string(&AttributePath::new("key")).unwrap();
        let stored = self.store.as_ref().unwrap().lock().unwrap().get(&key).cloned();
        ReadResourceResponse {
            new_state: stored.map(|_| request.current_state),
            diagnostics: vec![],
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: self.write(&request.planned_state),
            diagnostics: vec![],
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let key = request.prior_state.get_string(&AttributePath::new("key")).unwrap();
        self.store.as_ref().unwrap().lock().unwrap().remove(&key);
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for KvEntry {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match request.provider_data.as_ref().and_then(|d| d.downcast_ref::<Store>()) {
            Some(store) => self.store = Some(store.clone()),
            None => diagnostics.push(Diagnostic::error("Unexpected provider data", "")),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[derive(Default)]
struct KvLookup {
    store: Option<Store>,
}

#[async_trait]
impl DataSource for KvLookup {
    fn type_name(&self) -> &str {
        "kv_lookup"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("key", AttributeType::String)
                        .required()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("value", AttributeType::String)
                        .computed()
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let key = request.config.get_string(&AttributePath::new("key")).unwrap();
        match self.store.as_ref().unwrap().lock().unwrap().get(&key) {
            Some(value) => ReadDataSourceResponse {
                state: Some(DynamicValue::new(Dynamic::object([
                    ("key", key.as_str().into()),
                    ("value", value.as_str().into()),
                ]))),
                diagnostics: vec![],
            },
            None => ReadDataSourceResponse {
                state: None,
                diagnostics: vec![Diagnostic::error("key not found", key)],
            },
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for KvLookup {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        self.store = request
            .provider_data
            .as_ref()
            .and_then(|d| d.downcast_ref::<Store>())
            .cloned();
        ConfigureDataSourceResponse {
            diagnostics: vec![],
        }
    }
}

fn msgpack(value: Dynamic) -> Vec<u8> {
    DynamicValue::new(value).encode_msgpack().unwrap()
}

fn decode(bytes: &[u8]) -> DynamicValue {
    DynamicValue::decode_msgpack(bytes).unwrap()
}

fn entry_config(key: &str, value: &str) -> Dynamic {
    Dynamic::object([
        ("id", Dynamic::Null),
        ("key", key.into()),
        ("value", value.into()),
        ("mode", Dynamic::Null),
        ("tags", Dynamic::List(vec![])),
        ("labels", Dynamic::List(vec![])),
    ])
}

async fn configured_server() -> (ProviderServer, Store) {
    let store: Store = Arc::new(Mutex::new(HashMap::new()));
    let server = ProviderServer::new(KvProvider {
        store: store.clone(),
    });
    let diags = server
        .configure_provider(
            Context::new(),
            &msgpack(Dynamic::object([("namespace", Dynamic::Null)])),
        )
        .await;
    assert!(diags.is_empty(), "{:?}", diags);
    (server, store)
}

#[tokio::test]
async fn schema_lists_resources_and_data_sources() {
    let (server, _) = configured_server().await;
    let response = server.get_provider_schema(Context::new()).await;

    assert!(response.diagnostics.is_empty());
    assert!(response.provider.is_some());
    assert!(response.resource_schemas.contains_key("kv_entry"));
    assert!(response.data_source_schemas.contains_key("kv_lookup"));
}

#[tokio::test]
async fn validation_reports_missing_required_and_bad_enum() {
    let (server, _) = configured_server().await;
    let config = msgpack(Dynamic::object([
        ("key", Dynamic::Null),
        ("mode", "loud".into()),
    ]));

    let diags = server
        .validate_resource_config(Context::new(), "kv_entry", &config)
        .await;

    assert_eq!(diags.error_count(), 2);
    assert!(diags.iter().any(|d| d.summary == "Missing required argument"));
    assert!(diags.iter().any(|d| d.detail.contains("plain, secret")));
}

#[tokio::test]
async fn validation_rejects_computed_only_and_too_many_blocks() {
    let (server, _) = configured_server().await;
    let tag = || Dynamic::object([("name", "t".into())]);
    let config = msgpack(Dynamic::object([
        ("id", "set-by-user".into()),
        ("key", "k".into()),
        ("tags", Dynamic::List(vec![tag(), tag(), tag()])),
    ]));

    let diags = server
        .validate_resource_config(Context::new(), "kv_entry", &config)
        .await;

    assert_eq!(diags.error_count(), 2);
    assert!(diags.iter().any(|d| d.summary == "Too many tags blocks"));
}

#[tokio::test]
async fn plan_create_applies_defaults_and_marks_computed_unknown() {
    let (server, _) = configured_server().await;

    let plan = server
        .plan_resource_change(Context::new(), "kv_entry", &[], &msgpack(entry_config("a", "1")))
        .await;

    assert!(plan.diagnostics.is_empty());
    assert!(plan.requires_replace.is_empty());
    let planned = decode(&plan.planned_state);
    assert_eq!(planned.get_string(&AttributePath::new("mode")).unwrap(), "plain");
    assert!(planned.get(&AttributePath::new("id")).unwrap().is_unknown());
}

#[tokio::test]
async fn create_update_replace_and_delete_lifecycle() {
    let (server, store) = configured_server().await;
    let ctx = Context::new();

    // Create
    let config = msgpack(entry_config("a", "1"));
    let plan = server.plan_resource_change(ctx.clone(), "kv_entry", &[], &config).await;
    let applied = server
        .apply_resource_change(ctx.clone(), "kv_entry", &[], &plan.planned_state, &config)
        .await;
    assert!(applied.diagnostics.is_empty(), "{:?}", applied.diagnostics);
    let state = applied.state;
    assert_eq!(
        decode(&state).get_string(&AttributePath::new("id")).unwrap(),
        "entry-a"
    );
    assert_eq!(store.lock().unwrap().get("a").cloned(), Some("1".to_string()));

    // In-place update keeps the id
    let config = msgpack(entry_config("a", "2"));
    let plan = server.plan_resource_change(ctx.clone(), "kv_entry", &state, &config).await;
    assert!(plan.requires_replace.is_empty());
    assert_eq!(
        decode(&plan.planned_state).get_string(&AttributePath::new("id")).unwrap(),
        "entry-a"
    );
    let applied = server
        .apply_resource_change(ctx.clone(), "kv_entry", &state, &plan.planned_state, &config)
        .await;
    assert!(applied.diagnostics.is_empty());
    let state = applied.state;
    assert_eq!(store.lock().unwrap().get("a").cloned(), Some("2".to_string()));

    // Changing the key forces replacement
    let plan = server
        .plan_resource_change(ctx.clone(), "kv_entry", &state, &msgpack(entry_config("b", "2")))
        .await;
    assert_eq!(plan.requires_replace, vec![AttributePath::new("key")]);

    // Destroy
    let plan = server.plan_resource_change(ctx.clone(), "kv_entry", &state, &[]).await;
    assert!(plan.planned_state.is_empty());
    let applied = server
        .apply_resource_change(ctx, "kv_entry", &state, &[], &[])
        .await;
    assert!(applied.diagnostics.is_empty());
    assert!(applied.state.is_empty());
    assert!(store.lock().unwrap().is_empty());
}

#[tokio::test]
async fn plan_without_changes_keeps_prior_values() {
    let (server, _) = configured_server().await;
    let prior = KvEntry::state("a", "1", "plain", vec![]);
    let prior_bytes = prior.encode_msgpack().unwrap();

    let plan = server
        .plan_resource_change(
            Context::new(),
            "kv_entry",
            &prior_bytes,
            &msgpack(entry_config("a", "1")),
        )
        .await;

    assert_eq!(decode(&plan.planned_state), prior);
}

fn label(name: &str, color: Dynamic) -> Dynamic {
    Dynamic::object([("name", name.into()), ("color", color)])
}

#[tokio::test]
async fn set_blocks_are_matched_by_value_not_position() {
    let (server, _) = configured_server().await;
    let mut prior = KvEntry::state("a", "1", "plain", vec![]);
    prior
        .set(
            &AttributePath::new("labels"),
            Dynamic::List(vec![label("blue", "#00f".into()), label("red", "#f00".into())]),
        )
        .unwrap();
    let prior_bytes = prior.encode_msgpack().unwrap();

    let mut config = DynamicValue::new(entry_config("a", "1"));
    config
        .set(
            &AttributePath::new("labels"),
            Dynamic::List(vec![label("red", Dynamic::Null), label("blue", Dynamic::Null)]),
        )
        .unwrap();

    let plan = server
        .plan_resource_change(
            Context::new(),
            "kv_entry",
            &prior_bytes,
            &config.encode_msgpack().unwrap(),
        )
        .await;

    assert!(plan.diagnostics.is_empty());
    assert!(plan.requires_replace.is_empty());
    let labels = decode(&plan.planned_state)
        .get_list(&AttributePath::new("labels"))
        .unwrap();
    assert_eq!(labels[0], label("red", "#f00".into()));
    assert_eq!(labels[1], label("blue", "#00f".into()));
}

#[tokio::test]
async fn read_removes_vanished_resource() {
    let (server, store) = configured_server().await;
    let state = KvEntry::state("gone", "x", "plain", vec![]).encode_msgpack().unwrap();

    let response = server.read_resource(Context::new(), "kv_entry", &state).await;
    assert!(response.diagnostics.is_empty());
    assert!(response.state.is_empty());

    store.lock().unwrap().insert("gone".to_string(), "x".to_string());
    let response = server.read_resource(Context::new(), "kv_entry", &state).await;
    assert_eq!(decode(&response.state), decode(&state));
}

#[tokio::test]
async fn data_source_read_returns_state_or_diagnostic() {
    let (server, store) = configured_server().await;
    store.lock().unwrap().insert("k".to_string(), "v".to_string());

    let config = msgpack(Dynamic::object([("key", "k".into()), ("value", Dynamic::Null)]));
    let response = server.read_data_source(Context::new(), "kv_lookup", &config).await;
    assert!(response.diagnostics.is_empty());
    assert_eq!(
        decode(&response.state).get_string(&AttributePath::new("value")).unwrap(),
        "v"
    );

    let config = msgpack(Dynamic::object([("key", "nope".into()), ("value", Dynamic::Null)]));
    let response = server.read_data_source(Context::new(), "kv_lookup", &config).await;
    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.state.is_empty());
}

#[tokio::test]
async fn import_defaults_to_unsupported() {
    let (server, _) = configured_server().await;
    let response = server.import_resource_state(Context::new(), "kv_entry", "a").await;
    assert!(response.imported_resources.is_empty());
    assert_eq!(response.diagnostics[0].summary, "Resource import not supported");
}

#[tokio::test]
async fn operations_require_configuration_and_known_types() {
    let server = ProviderServer::new(KvProvider {
        store: Arc::new(Mutex::new(HashMap::new())),
    });
    let state = KvEntry::state("a", "1", "plain", vec![]).encode_msgpack().unwrap();

    let response = server.read_resource(Context::new(), "kv_entry", &state).await;
    assert_eq!(response.diagnostics[0].summary, "Provider not configured");

    let diags = server
        .validate_resource_config(Context::new(), "kv_missing", &state)
        .await;
    assert_eq!(diags[0].summary, "Resource type not found: kv_missing");
}
