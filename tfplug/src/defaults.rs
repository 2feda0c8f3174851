//! Default value providers for attributes
//!
//! Defaults are evaluated during planning when an attribute is not set in the
//! configuration. They differ from plan modifiers in that they only run when
//! the configured value is null.

use crate::schema::{Default, DefaultRequest, DefaultResponse};
use crate::types::Dynamic;
use std::sync::Arc;

/// StaticDefault provides a static default value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    /// Create a new static default provider with the given value
    pub fn create(value: Dynamic) -> Arc<dyn Default> {
        Arc::new(Self { value })
    }

    /// Create a static string default
    pub fn string(value: &str) -> Arc<dyn Default> {
        Self::create(Dynamic::String(value.to_string()))
    }
}

impl Default for StaticDefault {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: self.value.clone(),
        }
    }
}
