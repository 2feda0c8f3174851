//! Composite state identifiers
//!
//! A state ID packs the handful of fields needed to re-identify a remote
//! object into the single opaque `id` string Terraform keeps in state. Entries
//! are sorted by key and rendered as `base64(key):base64(value)`, joined with
//! `-`. Neither separator can occur inside a base64 token, so any key or value
//! round-trips unchanged.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::collections::BTreeMap;
use std::fmt;

const ENTRY_SEPARATOR: char = '-';
const KEY_VALUE_SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateIdError {
    #[error("state ID is empty")]
    Empty,

    #[error("malformed state ID entry {0:?}: expected <key>:<value>")]
    MalformedEntry(String),

    #[error("state ID entry {0:?} is not valid base64")]
    InvalidBase64(String),

    #[error("state ID is missing field {0:?}")]
    MissingField(String),
}

/// Structured form of a state ID
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateId {
    fields: BTreeMap<String, String>,
}

impl StateId {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Like [`StateId::get`] but a missing field is an error
    pub fn require(&self, key: &str) -> Result<&str, StateIdError> {
        self.get(key)
            .ok_or_else(|| StateIdError::MissingField(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                out.push(ENTRY_SEPARATOR);
            }
            out.push_str(&STANDARD.encode(key));
            out.push(KEY_VALUE_SEPARATOR);
            out.push_str(&STANDARD.encode(value));
        }
        out
    }

    pub fn decode(id: &str) -> Result<Self, StateIdError> {
        if id.is_empty() {
            return Err(StateIdError::Empty);
        }

        let mut fields = BTreeMap::new();
        for entry in id.split(ENTRY_SEPARATOR) {
            let (key, value) = entry
                .split_once(KEY_VALUE_SEPARATOR)
                .filter(|(k, v)| !k.is_empty() && !v.contains(KEY_VALUE_SEPARATOR))
                .ok_or_else(|| StateIdError::MalformedEntry(entry.to_string()))?;
            fields.insert(decode_token(key)?, decode_token(value)?);
        }

        Ok(Self { fields })
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn decode_token(token: &str) -> Result<String, StateIdError> {
    let bytes = STANDARD
        .decode(token)
        .map_err(|_| StateIdError::InvalidBase64(token.to_string()))?;
    String::from_utf8(bytes).map_err(|_| StateIdError::InvalidBase64(token.to_string()))
}

pub fn encode_state_id(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .fold(StateId::new(), |id, (k, v)| id.with(*k, *v))
        .encode()
}

pub fn decode_state_id(id: &str) -> Result<BTreeMap<String, String>, StateIdError> {
    StateId::decode(id).map(|id| id.fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_is_sorted_and_deterministic() {
        let a = encode_state_id(&[("username", "app"), ("project_id", "p1")]);
        let b = encode_state_id(&[("project_id", "p1"), ("username", "app")]);
        assert_eq!(a, b);
        assert_eq!(a, "cHJvamVjdF9pZA==:cDE=-dXNlcm5hbWU=:YXBw");
    }

    #[test]
    fn round_trips_separator_characters() {
        let id = StateId::new()
            .with("project_id", "5f1a-2b3c")
            .with("username", "CN=app:svc,OU=dev-ops/eu")
            .with("auth_database_name", "$external");
        let decoded = StateId::decode(&id.encode()).unwrap();
        assert_eq!(decoded, id);
        assert_eq!(decoded.get("username"), Some("CN=app:svc,OU=dev-ops/eu"));
    }

    #[test]
    fn empty_value_round_trips() {
        let id = StateId::new().with("k", "");
        assert_eq!(StateId::decode(&id.encode()).unwrap().get("k"), Some(""));
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert_eq!(StateId::decode(""), Err(StateIdError::Empty));
        assert!(matches!(
            StateId::decode("no-separators-here"),
            Err(StateIdError::MalformedEntry(_))
        ));
        assert!(matches!(
            StateId::decode("a2V5:dmFs-"),
            Err(StateIdError::MalformedEntry(_))
        ));
        assert!(matches!(
            StateId::decode("a2V5:dmFs:eHh4"),
            Err(StateIdError::MalformedEntry(_))
        ));
        assert!(matches!(
            StateId::decode("!!!:dmFs"),
            Err(StateIdError::InvalidBase64(_))
        ));
    }

    #[test]
    fn require_reports_missing_field() {
        let id = StateId::new().with("project_id", "p1");
        assert_eq!(id.require("project_id"), Ok("p1"));
        assert_eq!(
            id.require("username"),
            Err(StateIdError::MissingField("username".into()))
        );
    }

    #[test]
    fn decode_wrapper_returns_map() {
        let map = decode_state_id(&encode_state_id(&[("a", "1"), ("b", "2")])).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["b"], "2");
    }
}
