//! In-process provider server
//!
//! `ProviderServer` drives a `Provider` the way the Terraform host does: it
//! serves schemas, validates configuration against them, plans and applies
//! resource changes, and reads resources and data sources. Values cross the
//! boundary msgpack-encoded, exactly as they do on the plugin wire protocol.

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceSchemaRequest, DataSourceWithConfigure,
    ReadDataSourceRequest, ValidateDataSourceConfigRequest,
};
use crate::error::TfplugError;
use crate::provider::{
    ConfigureProviderRequest, DataSourceFactory, Provider, ProviderSchemaRequest,
    ResourceFactory, ValidateProviderConfigRequest,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest, ResourceSchemaRequest,
    ResourceWithConfigure, UpdateResourceRequest, ValidateResourceConfigRequest,
};
use crate::schema::{
    Attribute, Block, DefaultRequest, NestingMode, ObjectNestingMode, PlanModifierRequest, Schema,
    ValidatorRequest,
};
use crate::types::{AttributePath, Diagnostic, Diagnostics, Dynamic, DynamicValue};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

type ProviderData = Option<Arc<dyn Any + Send + Sync>>;

pub struct ProviderServer {
    provider: Mutex<Box<dyn Provider>>,
    resources: HashMap<String, ResourceFactory>,
    data_sources: HashMap<String, DataSourceFactory>,
    /// Some once the provider has been configured successfully
    provider_data: RwLock<Option<ProviderData>>,
}

pub struct GetProviderSchemaResponse {
    pub provider: Option<Schema>,
    pub resource_schemas: HashMap<String, Schema>,
    pub data_source_schemas: HashMap<String, Schema>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct PlanResourceChangeResponse {
    pub planned_state: Vec<u8>,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Encoded state returned by apply, read and data source read.
/// An empty `state` means null: nothing exists.
pub struct StateResponse {
    pub state: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ImportedState {
    pub type_name: String,
    pub state: Vec<u8>,
}

pub struct ImportResourceStateResponse {
    pub imported_resources: Vec<ImportedState>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ProviderServer {
    pub fn new<P: Provider + 'static>(provider: P) -> Self {
        let resources = provider.resources();
        let data_sources = provider.data_sources();
        Self {
            provider: Mutex::new(Box::new(provider)),
            resources,
            data_sources,
            provider_data: RwLock::new(None),
        }
    }

    pub async fn get_provider_schema(&self, ctx: Context) -> GetProviderSchemaResponse {
        let mut diagnostics = vec![];

        let provider_schema = {
            let provider = self.provider.lock().await;
            let response = provider.schema(ctx.clone(), ProviderSchemaRequest).await;
            diagnostics.extend(response.diagnostics);
            response.schema
        };

        let mut resource_schemas = HashMap::new();
        for (name, factory) in &self.resources {
            let response = factory().schema(ctx.clone(), ResourceSchemaRequest).await;
            diagnostics.extend(response.diagnostics);
            resource_schemas.insert(name.clone(), response.schema);
        }

        let mut data_source_schemas = HashMap::new();
        for (name, factory) in &self.data_sources {
            let response = factory().schema(ctx.clone(), DataSourceSchemaRequest).await;
            diagnostics.extend(response.diagnostics);
            data_source_schemas.insert(name.clone(), response.schema);
        }

        GetProviderSchemaResponse {
            provider: Some(provider_schema),
            resource_schemas,
            data_source_schemas,
            diagnostics,
        }
    }

    pub async fn validate_provider_config(&self, ctx: Context, config: &[u8]) -> Vec<Diagnostic> {
        let config = match decode(config) {
            Ok(c) => c,
            Err(diag) => return vec![diag],
        };

        let provider = self.provider.lock().await;
        let schema = provider.schema(ctx.clone(), ProviderSchemaRequest).await.schema;
        let mut diagnostics = validate_config(&schema.block, &config);
        if diagnostics.has_errors() {
            return diagnostics;
        }

        let response = provider
            .validate(ctx, ValidateProviderConfigRequest { config })
            .await;
        diagnostics.extend(response.diagnostics);
        diagnostics
    }

    pub async fn configure_provider(&self, ctx: Context, config: &[u8]) -> Vec<Diagnostic> {
        let mut diagnostics = self.validate_provider_config(ctx.clone(), config).await;
        if diagnostics.has_errors() {
            return diagnostics;
        }
        let config = match decode(config) {
            Ok(c) => c,
            Err(diag) => return vec![diag],
        };

        let response = {
            let mut provider = self.provider.lock().await;
            provider
                .configure(ctx, ConfigureProviderRequest { config })
                .await
        };
        diagnostics.extend(response.diagnostics);

        if !diagnostics.has_errors() {
            *self.provider_data.write().await = Some(response.provider_data);
            debug!("provider configured");
        }
        diagnostics
    }

    pub async fn validate_resource_config(
        &self,
        ctx: Context,
        type_name: &str,
        config: &[u8],
    ) -> Vec<Diagnostic> {
        let Some(factory) = self.resources.get(type_name) else {
            return vec![not_found(TfplugError::ResourceNotFound(type_name.to_string()))];
        };
        let config = match decode(config) {
            Ok(c) => c,
            Err(diag) => return vec![diag],
        };

        let resource = factory();
        let schema = resource.schema(ctx.clone(), ResourceSchemaRequest).await.schema;
        let mut diagnostics = validate_config(&schema.block, &config);
        if diagnostics.has_errors() {
            return diagnostics;
        }

        let response = resource
            .validate(
                ctx,
                ValidateResourceConfigRequest {
                    type_name: type_name.to_string(),
                    config,
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);
        diagnostics
    }

    pub async fn validate_data_source_config(
        &self,
        ctx: Context,
        type_name: &str,
        config: &[u8],
    ) -> Vec<Diagnostic> {
        let Some(factory) = self.data_sources.get(type_name) else {
            return vec![not_found(TfplugError::DataSourceNotFound(type_name.to_string()))];
        };
        let config = match decode(config) {
            Ok(c) => c,
            Err(diag) => return vec![diag],
        };

        let data_source = factory();
        let schema = data_source
            .schema(ctx.clone(), DataSourceSchemaRequest)
            .await
            .schema;
        let mut diagnostics = validate_config(&schema.block, &config);
        if diagnostics.has_errors() {
            return diagnostics;
        }

        let response = data_source
            .validate(
                ctx,
                ValidateDataSourceConfigRequest {
                    type_name: type_name.to_string(),
                    config,
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);
        diagnostics
    }

    /// Compute the planned state from prior state and configuration
    ///
    /// Configured values win; unset attributes take their default, or for
    /// computed attributes the prior value. When anything changes, unset
    /// computed attributes become unknown before plan modifiers run.
    pub async fn plan_resource_change(
        &self,
        ctx: Context,
        type_name: &str,
        prior_state: &[u8],
        config: &[u8],
    ) -> PlanResourceChangeResponse {
        let mut response = PlanResourceChangeResponse {
            planned_state: vec![],
            requires_replace: vec![],
            diagnostics: vec![],
        };

        let Some(factory) = self.resources.get(type_name) else {
            response
                .diagnostics
                .push(not_found(TfplugError::ResourceNotFound(type_name.to_string())));
            return response;
        };
        let (prior, config) = match (decode(prior_state), decode(config)) {
            (Ok(p), Ok(c)) => (p, c),
            (Err(diag), _) | (_, Err(diag)) => {
                response.diagnostics.push(diag);
                return response;
            }
        };

        // Destroy plan
        if config.is_null() {
            return response;
        }

        let schema = factory().schema(ctx, ResourceSchemaRequest).await.schema;
        let is_create = prior.is_null();

        let proposed = propose_block(&schema.block, &config.value, &prior.value);
        let has_changes =
            is_create || !block_values_equal(&schema.block, &proposed, &prior.value);

        let mut planner = Planner {
            is_create,
            has_changes,
            requires_replace: vec![],
            diagnostics: vec![],
        };
        let planned = planner.plan_block(
            &schema.block,
            &config.value,
            &prior.value,
            proposed,
            &AttributePath::root(),
        );

        response.requires_replace = planner.requires_replace;
        response.diagnostics = planner.diagnostics;
        match DynamicValue::new(planned).encode_msgpack() {
            Ok(bytes) => response.planned_state = bytes,
            Err(e) => response
                .diagnostics
                .push(Diagnostic::error("Failed to encode planned state", e.to_string())),
        }
        response
    }

    /// Dispatch to create, update or delete depending on which of prior and
    /// planned state are null
    pub async fn apply_resource_change(
        &self,
        ctx: Context,
        type_name: &str,
        prior_state: &[u8],
        planned_state: &[u8],
        config: &[u8],
    ) -> StateResponse {
        let mut response = StateResponse {
            state: prior_state.to_vec(),
            diagnostics: vec![],
        };

        let decoded = (decode(prior_state), decode(planned_state), decode(config));
        let (prior, planned, config) = match decoded {
            (Ok(p), Ok(pl), Ok(c)) => (p, pl, c),
            (Err(diag), _, _) | (_, Err(diag), _) | (_, _, Err(diag)) => {
                response.diagnostics.push(diag);
                return response;
            }
        };

        let resource = match self.configured_resource(&ctx, type_name).await {
            Ok(r) => r,
            Err(diags) => {
                response.diagnostics = diags;
                return response;
            }
        };

        let type_name = type_name.to_string();
        let new_state = match (prior.is_null(), planned.is_null()) {
            (true, true) => return response,
            (true, false) => {
                debug!(%type_name, "creating resource");
                let created = resource
                    .create(
                        ctx,
                        CreateResourceRequest {
                            type_name,
                            planned_state: planned,
                            config,
                        },
                    )
                    .await;
                response.diagnostics = created.diagnostics;
                match created.new_state {
                    Some(state) => state,
                    None if response.diagnostics.has_errors() => DynamicValue::null(),
                    None => {
                        response.diagnostics.push(Diagnostic::error(
                            "Provider produced null object",
                            "The provider returned no state after a successful create.",
                        ));
                        DynamicValue::null()
                    }
                }
            }
            (false, true) => {
                debug!(%type_name, "deleting resource");
                let deleted = resource
                    .delete(
                        ctx,
                        DeleteResourceRequest {
                            type_name,
                            prior_state: prior.clone(),
                        },
                    )
                    .await;
                response.diagnostics = deleted.diagnostics;
                if response.diagnostics.has_errors() {
                    prior
                } else {
                    DynamicValue::null()
                }
            }
            (false, false) => {
                debug!(%type_name, "updating resource");
                let updated = resource
                    .update(
                        ctx,
                        UpdateResourceRequest {
                            type_name,
                            prior_state: prior,
                            planned_state: planned,
                            config,
                        },
                    )
                    .await;
                response.diagnostics = updated.diagnostics;
                updated.new_state
            }
        };

        if new_state.value.contains_unknown() {
            response.diagnostics.push(Diagnostic::error(
                "Provider returned invalid result object after apply",
                "After the apply operation, the provider still indicated an unknown value. \
                 All values must be known after apply.",
            ));
        }

        match new_state.encode_msgpack() {
            Ok(bytes) => response.state = bytes,
            Err(e) => response
                .diagnostics
                .push(Diagnostic::error("Failed to encode new state", e.to_string())),
        }
        response
    }

    /// Refresh a resource; an empty returned state means it no longer exists
    pub async fn read_resource(
        &self,
        ctx: Context,
        type_name: &str,
        current_state: &[u8],
    ) -> StateResponse {
        let mut response = StateResponse {
            state: current_state.to_vec(),
            diagnostics: vec![],
        };

        let current = match decode(current_state) {
            Ok(s) => s,
            Err(diag) => {
                response.diagnostics.push(diag);
                return response;
            }
        };
        if current.is_null() {
            return response;
        }

        let resource = match self.configured_resource(&ctx, type_name).await {
            Ok(r) => r,
            Err(diags) => {
                response.diagnostics = diags;
                return response;
            }
        };

        let read = resource
            .read(
                ctx,
                ReadResourceRequest {
                    type_name: type_name.to_string(),
                    current_state: current,
                },
            )
            .await;
        response.diagnostics = read.diagnostics;

        match read.new_state {
            Some(state) => match state.encode_msgpack() {
                Ok(bytes) => response.state = bytes,
                Err(e) => response
                    .diagnostics
                    .push(Diagnostic::error("Failed to encode state", e.to_string())),
            },
            None if response.diagnostics.has_errors() => {}
            None => {
                debug!(%type_name, "resource no longer exists, removing from state");
                response.state = vec![];
            }
        }
        response
    }

    pub async fn read_data_source(
        &self,
        ctx: Context,
        type_name: &str,
        config: &[u8],
    ) -> StateResponse {
        let mut response = StateResponse {
            state: vec![],
            diagnostics: vec![],
        };

        let config = match decode(config) {
            Ok(c) => c,
            Err(diag) => {
                response.diagnostics.push(diag);
                return response;
            }
        };

        let data_source = match self.configured_data_source(&ctx, type_name).await {
            Ok(d) => d,
            Err(diags) => {
                response.diagnostics = diags;
                return response;
            }
        };

        let read = data_source
            .read(
                ctx,
                ReadDataSourceRequest {
                    type_name: type_name.to_string(),
                    config,
                },
            )
            .await;
        response.diagnostics = read.diagnostics;

        if let Some(state) = read.state {
            if state.value.contains_unknown() {
                response.diagnostics.push(Diagnostic::error(
                    "Provider returned invalid data source state",
                    "Data source state must not contain unknown values.",
                ));
            }
            match state.encode_msgpack() {
                Ok(bytes) => response.state = bytes,
                Err(e) => response
                    .diagnostics
                    .push(Diagnostic::error("Failed to encode state", e.to_string())),
            }
        }
        response
    }

    pub async fn import_resource_state(
        &self,
        ctx: Context,
        type_name: &str,
        id: &str,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };

        let resource = match self.configured_resource(&ctx, type_name).await {
            Ok(r) => r,
            Err(diags) => {
                response.diagnostics = diags;
                return response;
            }
        };

        let imported = resource
            .import_state(
                ctx,
                ImportResourceStateRequest {
                    type_name: type_name.to_string(),
                    id: id.to_string(),
                },
            )
            .await;
        response.diagnostics = imported.diagnostics;

        for resource in imported.imported_resources {
            match resource.state.encode_msgpack() {
                Ok(state) => response.imported_resources.push(ImportedState {
                    type_name: resource.type_name,
                    state,
                }),
                Err(e) => response
                    .diagnostics
                    .push(Diagnostic::error("Failed to encode imported state", e.to_string())),
            }
        }
        response
    }

    async fn provider_data(&self) -> Result<ProviderData, Vec<Diagnostic>> {
        self.provider_data
            .read()
            .await
            .clone()
            .ok_or_else(|| vec![not_found(TfplugError::ProviderNotConfigured)])
    }

    async fn configured_resource(
        &self,
        ctx: &Context,
        type_name: &str,
    ) -> Result<Box<dyn ResourceWithConfigure>, Vec<Diagnostic>> {
        let factory = self
            .resources
            .get(type_name)
            .ok_or_else(|| vec![not_found(TfplugError::ResourceNotFound(type_name.to_string()))])?;
        let provider_data = self.provider_data().await?;

        let mut resource = factory();
        let response = resource
            .configure(ctx.clone(), ConfigureResourceRequest { provider_data })
            .await;
        if response.diagnostics.has_errors() {
            return Err(response.diagnostics);
        }
        Ok(resource)
    }

    async fn configured_data_source(
        &self,
        ctx: &Context,
        type_name: &str,
    ) -> Result<Box<dyn DataSourceWithConfigure>, Vec<Diagnostic>> {
        let factory = self.data_sources.get(type_name).ok_or_else(|| {
            vec![not_found(TfplugError::DataSourceNotFound(type_name.to_string()))]
        })?;
        let provider_data = self.provider_data().await?;

        let mut data_source = factory();
        let response = data_source
            .configure(ctx.clone(), ConfigureDataSourceRequest { provider_data })
            .await;
        if response.diagnostics.has_errors() {
            return Err(response.diagnostics);
        }
        Ok(data_source)
    }
}

fn decode(bytes: &[u8]) -> Result<DynamicValue, Diagnostic> {
    DynamicValue::decode_msgpack(bytes)
        .map_err(|e| Diagnostic::error("Failed to decode value", e.to_string()))
}

fn not_found(err: TfplugError) -> Diagnostic {
    warn!(error = %err, "request rejected");
    Diagnostic::error(err.to_string(), "")
}

// Configuration validation

fn validate_config(block: &Block, config: &DynamicValue) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];
    validate_block(block, config, &config.value, &AttributePath::root(), &mut diagnostics);
    diagnostics
}

fn validate_block(
    block: &Block,
    config: &DynamicValue,
    value: &Dynamic,
    path: &AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    validate_attributes(&block.attributes, config, value, path, diagnostics);

    for nested in &block.block_types {
        let nested_path = path.clone().attribute(&nested.type_name);
        let nested_value = value.attr(&nested.type_name);
        if nested_value.is_unknown() {
            continue;
        }

        match nested.nesting {
            NestingMode::List | NestingMode::Set => {
                let items = nested_value.as_list().unwrap_or_default();
                check_block_count(nested, items.len(), &nested_path, diagnostics);
                for (i, item) in items.iter().enumerate() {
                    let item_path = nested_path.clone().index(i as i64);
                    validate_block(&nested.block, config, item, &item_path, diagnostics);
                }
            }
            NestingMode::Single | NestingMode::Group => {
                let count = usize::from(!nested_value.is_null());
                check_block_count(nested, count, &nested_path, diagnostics);
                if count == 1 {
                    validate_block(&nested.block, config, nested_value, &nested_path, diagnostics);
                }
            }
            NestingMode::Map => {
                let entries = nested_value.as_map().cloned().unwrap_or_default();
                check_block_count(nested, entries.len(), &nested_path, diagnostics);
                for (key, item) in &entries {
                    let item_path = nested_path.clone().key(key);
                    validate_block(&nested.block, config, item, &item_path, diagnostics);
                }
            }
        }
    }
}

fn check_block_count(
    nested: &crate::schema::NestedBlock,
    count: usize,
    path: &AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let count = count as i64;
    if count < nested.min_items {
        diagnostics.push(
            Diagnostic::error(
                format!("Insufficient {} blocks", nested.type_name),
                format!(
                    "At least {} \"{}\" blocks are required.",
                    nested.min_items, nested.type_name
                ),
            )
            .with_attribute(path.clone()),
        );
    }
    if nested.max_items > 0 && count > nested.max_items {
        diagnostics.push(
            Diagnostic::error(
                format!("Too many {} blocks", nested.type_name),
                format!(
                    "No more than {} \"{}\" blocks are allowed.",
                    nested.max_items, nested.type_name
                ),
            )
            .with_attribute(path.clone()),
        );
    }
}

fn validate_attributes(
    attributes: &[Attribute],
    config: &DynamicValue,
    value: &Dynamic,
    path: &AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for attr in attributes {
        let attr_path = path.clone().attribute(&attr.name);
        let attr_value = value.attr(&attr.name);

        if attr.required && attr_value.is_null() {
            diagnostics.push(
                Diagnostic::error(
                    "Missing required argument",
                    format!(
                        "The argument \"{}\" is required, but no definition was found.",
                        attr_path
                    ),
                )
                .with_attribute(attr_path),
            );
            continue;
        }
        if attr_value.is_null() {
            continue;
        }

        if attr.is_computed_only() {
            diagnostics.push(
                Diagnostic::error(
                    "Invalid Configuration for Read-Only Attribute",
                    format!(
                        "Cannot set value for this attribute as the provider has marked it as read-only: {}",
                        attr_path
                    ),
                )
                .with_attribute(attr_path),
            );
            continue;
        }

        if !attr.r#type.accepts(attr_value) {
            diagnostics.push(
                Diagnostic::error(
                    "Incorrect attribute value type",
                    format!(
                        "Inappropriate value for attribute \"{}\": {} required, got {}.",
                        attr_path,
                        type_label(&attr.r#type),
                        attr_value.type_name()
                    ),
                )
                .with_attribute(attr_path),
            );
            continue;
        }

        if let Some(message) = &attr.deprecation_message {
            diagnostics.push(
                Diagnostic::warning(
                    "Attribute Deprecated",
                    format!("\"{}\" is deprecated: {}", attr_path, message),
                )
                .with_attribute(attr_path.clone()),
            );
        }

        for validator in &attr.validators {
            let response = validator.validate(ValidatorRequest {
                config,
                config_value: attr_value,
                path: attr_path.clone(),
            });
            diagnostics.extend(response.diagnostics);
        }

        if let Some(nested) = &attr.nested_type {
            match nested.nesting {
                ObjectNestingMode::Single => {
                    validate_attributes(
                        &nested.attributes,
                        config,
                        attr_value,
                        &attr_path,
                        diagnostics,
                    )
                }
                ObjectNestingMode::List | ObjectNestingMode::Set => {
                    for (i, item) in attr_value.as_list().unwrap_or_default().iter().enumerate() {
                        let item_path = attr_path.clone().index(i as i64);
                        validate_attributes(
                            &nested.attributes,
                            config,
                            item,
                            &item_path,
                            diagnostics,
                        );
                    }
                }
                ObjectNestingMode::Map => {
                    if let Some(entries) = attr_value.as_map() {
                        for (key, item) in entries {
                            let item_path = attr_path.clone().key(key);
                            validate_attributes(
                                &nested.attributes,
                                config,
                                item,
                                &item_path,
                                diagnostics,
                            );
                        }
                    }
                }
            }
        }
    }
}

fn type_label(t: &crate::schema::AttributeType) -> &'static str {
    use crate::schema::AttributeType;
    match t {
        AttributeType::String => "string",
        AttributeType::Number => "number",
        AttributeType::Bool => "bool",
        AttributeType::List(_) => "list",
        AttributeType::Set(_) => "set",
        AttributeType::Map(_) => "map",
        AttributeType::Object(_) => "object",
    }
}

// Planning

/// Prior element of a nested block collection that corresponds to a config element
///
/// Set elements have no position, so the prior element is the one agreeing
/// with every attribute the config element sets.
fn prior_element<'a>(
    nesting: NestingMode,
    config_item: &Dynamic,
    prior: &'a Dynamic,
    index: usize,
) -> &'a Dynamic {
    let items = prior.as_list().unwrap_or_default();
    let found = match nesting {
        NestingMode::Set => items.iter().find(|p| configured_attrs_match(config_item, p)),
        _ => items.get(index),
    };
    found.unwrap_or(&Dynamic::Null)
}

fn configured_attrs_match(config_item: &Dynamic, prior_item: &Dynamic) -> bool {
    match config_item.as_map() {
        Some(fields) => fields
            .iter()
            .filter(|(_, v)| !v.is_null() && !v.contains_unknown())
            .all(|(k, v)| prior_item.attr(k) == v),
        None => false,
    }
}

/// Equality of two block values with set-nested blocks compared regardless of order
fn block_values_equal(block: &Block, a: &Dynamic, b: &Dynamic) -> bool {
    if a.is_null() || b.is_null() {
        return a.is_null() && b.is_null();
    }

    let attrs_equal = block
        .attributes
        .iter()
        .all(|attr| a.attr(&attr.name) == b.attr(&attr.name));

    attrs_equal
        && block.block_types.iter().all(|nested| {
            let (x, y) = (a.attr(&nested.type_name), b.attr(&nested.type_name));
            match (nested.nesting, x.as_list(), y.as_list()) {
                (NestingMode::Set, Some(xs), Some(ys)) => {
                    let contained = |from: &[Dynamic], into: &[Dynamic]| {
                        from.iter()
                            .all(|i| into.iter().any(|j| block_values_equal(&nested.block, i, j)))
                    };
                    xs.len() == ys.len() && contained(xs, ys) && contained(ys, xs)
                }
                (NestingMode::List, Some(xs), Some(ys)) => {
                    xs.len() == ys.len()
                        && xs
                            .iter()
                            .zip(ys)
                            .all(|(i, j)| block_values_equal(&nested.block, i, j))
                }
                (NestingMode::Single | NestingMode::Group, _, _) => {
                    block_values_equal(&nested.block, x, y)
                }
                _ => x == y,
            }
        })
}

/// Config values, then defaults, then prior values for computed attributes
fn propose_block(block: &Block, config: &Dynamic, prior: &Dynamic) -> Dynamic {
    let mut out = HashMap::new();

    for attr in &block.attributes {
        let cfg = config.attr(&attr.name);
        let value = if !cfg.is_null() {
            cfg.clone()
        } else if let Some(default) = &attr.default {
            default
                .default_value(DefaultRequest {
                    path: AttributePath::new(&attr.name),
                })
                .value
        } else if attr.computed {
            prior.attr(&attr.name).clone()
        } else {
            Dynamic::Null
        };
        out.insert(attr.name.clone(), value);
    }

    for nested in &block.block_types {
        let cfg = config.attr(&nested.type_name);
        let prior_nested = prior.attr(&nested.type_name);
        let value = match (nested.nesting, cfg) {
            (NestingMode::List | NestingMode::Set, Dynamic::List(items)) => Dynamic::List(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let prior_item = prior_element(nested.nesting, item, prior_nested, i);
                        propose_block(&nested.block, item, prior_item)
                    })
                    .collect(),
            ),
            (NestingMode::Single | NestingMode::Group, Dynamic::Map(_)) => {
                propose_block(&nested.block, cfg, prior_nested)
            }
            (NestingMode::List | NestingMode::Set, _) => Dynamic::List(vec![]),
            _ => cfg.clone(),
        };
        out.insert(nested.type_name.clone(), value);
    }

    Dynamic::Map(out)
}

struct Planner {
    is_create: bool,
    has_changes: bool,
    requires_replace: Vec<AttributePath>,
    diagnostics: Vec<Diagnostic>,
}

impl Planner {
    fn plan_block(
        &mut self,
        block: &Block,
        config: &Dynamic,
        prior: &Dynamic,
        proposed: Dynamic,
        path: &AttributePath,
    ) -> Dynamic {
        let Dynamic::Map(mut proposed) = proposed else {
            return proposed;
        };

        for attr in &block.attributes {
            let attr_path = path.clone().attribute(&attr.name);
            let cfg = config.attr(&attr.name);
            let mut value = proposed.remove(&attr.name).unwrap_or(Dynamic::Null);

            if cfg.is_null() && attr.computed && attr.default.is_none() && self.has_changes {
                value = Dynamic::Unknown;
            }

            for modifier in &attr.plan_modifiers {
                let response = modifier.modify(PlanModifierRequest {
                    config_value: cfg.clone(),
                    state_value: prior.attr(&attr.name).clone(),
                    plan_value: value,
                    path: attr_path.clone(),
                    is_create: self.is_create,
                });
                value = response.plan_value;
                self.diagnostics.extend(response.diagnostics);
                if response.requires_replace && !self.requires_replace.contains(&attr_path) {
                    self.requires_replace.push(attr_path.clone());
                }
            }

            proposed.insert(attr.name.clone(), value);
        }

        for nested in &block.block_types {
            let nested_path = path.clone().attribute(&nested.type_name);
            let cfg = config.attr(&nested.type_name);
            let prior_nested = prior.attr(&nested.type_name);
            let value = proposed.remove(&nested.type_name).unwrap_or(Dynamic::Null);

            let value = match (nested.nesting, value) {
                (NestingMode::List | NestingMode::Set, Dynamic::List(items)) => Dynamic::List(
                    items
                        .into_iter()
                        .enumerate()
                        .map(|(i, item)| {
                            let cfg_item = cfg
                                .as_list()
                                .and_then(|l| l.get(i))
                                .unwrap_or(&Dynamic::Null);
                            let prior_item =
                                prior_element(nested.nesting, cfg_item, prior_nested, i);
                            let item_path = nested_path.clone().index(i as i64);
                            self.plan_block(&nested.block, cfg_item, prior_item, item, &item_path)
                        })
                        .collect(),
                ),
                (NestingMode::Single | NestingMode::Group, item @ Dynamic::Map(_)) => {
                    self.plan_block(&nested.block, cfg, prior_nested, item, &nested_path)
                }
                (_, other) => other,
            };
            proposed.insert(nested.type_name.clone(), value);
        }

        Dynamic::Map(proposed)
    }
}
