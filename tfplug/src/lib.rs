//! tfplug - Terraform Plugin Framework for Rust
//!
//! A framework for building Terraform providers in Rust: the value model,
//! schemas with validators, plan modifiers and defaults, the provider traits,
//! and an in-process server that plans and applies changes against them.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod data_source;
pub mod provider;
pub mod resource;

// Helper modules
pub mod defaults;
pub mod plan_modifier;
pub mod validator;

// Host-side driver
pub mod server;

// Re-exports for convenience
pub use context::Context;
pub use data_source::{DataSource, DataSourceWithConfigure};
pub use error::{Result, TfplugError};
pub use provider::{DataSourceFactory, Provider, ResourceFactory};
pub use resource::{Resource, ResourceWithConfigure};
pub use schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, Schema, SchemaBuilder};
pub use server::ProviderServer;
pub use types::{AttributePath, Diagnostic, Diagnostics, Dynamic, DynamicValue};
