//! Built-in attribute validators
//!
//! Validators run during configuration validation, before any planning.
//! Null and unknown values are skipped by every validator here; requiredness
//! is checked by the server from the schema flags.

use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::Diagnostic;
use std::sync::Arc;

/// Restricts a string attribute to a fixed set of values
pub struct StringOneOf {
    allowed: Vec<String>,
}

impl StringOneOf {
    pub fn create(allowed: &[&str]) -> Arc<dyn Validator> {
        Arc::new(Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl Validator for StringOneOf {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.allowed.join(", "))
    }

    fn validate(&self, request: ValidatorRequest<'_>) -> ValidatorResponse {
        let mut response = ValidatorResponse::default();
        if let Some(s) = request.config_value.as_string() {
            if !self.allowed.iter().any(|a| a == s) {
                response.diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid value for {}", request.path),
                        format!(
                            "Expected one of [{}], got {:?}",
                            self.allowed.join(", "),
                            s
                        ),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        response
    }
}

/// Bounds the length of a string attribute
pub struct StringLength {
    min: Option<usize>,
    max: Option<usize>,
}

impl StringLength {
    pub fn create(min: Option<usize>, max: Option<usize>) -> Arc<dyn Validator> {
        Arc::new(Self { min, max })
    }
}

impl Validator for StringLength {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("length must be between {} and {}", min, max),
            (Some(min), None) => format!("length must be at least {}", min),
            (None, Some(max)) => format!("length must be at most {}", max),
            (None, None) => "any length".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest<'_>) -> ValidatorResponse {
        let mut response = ValidatorResponse::default();
        if let Some(s) = request.config_value.as_string() {
            let len = s.chars().count();
            let too_short = self.min.is_some_and(|min| len < min);
            let too_long = self.max.is_some_and(|max| len > max);
            if too_short || too_long {
                response.diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid length for {}", request.path),
                        format!("{}, got length {}", self.description(), len),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        response
    }
}

/// Rejects configurations that set this attribute together with any of the
/// named sibling attributes
pub struct ConflictsWith {
    others: Vec<String>,
}

impl ConflictsWith {
    pub fn create(others: &[&str]) -> Arc<dyn Validator> {
        Arc::new(Self {
            others: others.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl Validator for ConflictsWith {
    fn description(&self) -> String {
        format!("conflicts with: {}", self.others.join(", "))
    }

    fn validate(&self, request: ValidatorRequest<'_>) -> ValidatorResponse {
        let mut response = ValidatorResponse::default();
        if request.config_value.is_null() {
            return response;
        }

        for other in &self.others {
            let other_path = request.path.sibling(other);
            let is_set = request
                .config
                .get(&other_path)
                .is_some_and(|v| !v.is_null());
            if is_set {
                response.diagnostics.push(
                    Diagnostic::error(
                        "Conflicting configuration arguments",
                        format!(
                            "\"{}\": conflicts with {}",
                            request.path, other_path
                        ),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributePath, Dynamic, DynamicValue};

    fn run(validator: &Arc<dyn Validator>, config: &DynamicValue, name: &str) -> ValidatorResponse {
        let path = AttributePath::new(name);
        let value = config.get(&path).cloned().unwrap_or(Dynamic::Null);
        validator.validate(ValidatorRequest {
            config,
            config_value: &value,
            path,
        })
    }

    #[test]
    fn string_one_of_accepts_listed_value() {
        let v = StringOneOf::create(&["NONE", "MANAGED", "CUSTOMER"]);
        let config = DynamicValue::new(Dynamic::object([("x509_type", "MANAGED".into())]));
        assert!(run(&v, &config, "x509_type").diagnostics.is_empty());
    }

    #[test]
    fn string_one_of_rejects_other_value() {
        let v = StringOneOf::create(&["NONE", "USER", "GROUP"]);
        let config = DynamicValue::new(Dynamic::object([("ldap_auth_type", "ROLE".into())]));
        let diags = run(&v, &config, "ldap_auth_type").diagnostics;
        assert_eq!(diags.len(), 1);
        assert!(diags[0].detail.contains("NONE, USER, GROUP"));
    }

    #[test]
    fn string_one_of_ignores_null() {
        let v = StringOneOf::create(&["A"]);
        let config = DynamicValue::new(Dynamic::object([("a", Dynamic::Null)]));
        assert!(run(&v, &config, "a").diagnostics.is_empty());
    }

    #[test]
    fn string_length_rejects_too_short() {
        let v = StringLength::create(Some(5), None);
        let config = DynamicValue::new(Dynamic::object([("name", "hi".into())]));
        let diags = run(&v, &config, "name").diagnostics;
        assert_eq!(diags.len(), 1);
        assert!(diags[0].detail.contains("got length 2"));
    }

    #[test]
    fn conflicts_with_flags_both_set() {
        let v = ConflictsWith::create(&["auth_database_name"]);
        let config = DynamicValue::new(Dynamic::object([
            ("database_name", "admin".into()),
            ("auth_database_name", "admin".into()),
        ]));
        let diags = run(&v, &config, "database_name").diagnostics;
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Conflicting configuration arguments");
    }

    #[test]
    fn conflicts_with_allows_single() {
        let v = ConflictsWith::create(&["auth_database_name"]);
        let config = DynamicValue::new(Dynamic::object([
            ("database_name", "admin".into()),
            ("auth_database_name", Dynamic::Null),
        ]));
        assert!(run(&v, &config, "database_name").diagnostics.is_empty());
    }
}
