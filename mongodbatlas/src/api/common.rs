//! Common types and utilities for the Atlas Admin API

use serde::{Deserialize, Serialize};

/// Error body returned by the Atlas API for every non-2xx response
#[derive(Debug, Clone, Default, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase", default)]
#[error("Atlas error {error}: {detail}")]
pub struct AtlasErrorResponse {
    pub detail: String,
    pub error: u16,
    pub error_code: String,
    pub parameters: Vec<serde_json::Value>,
    pub reason: String,
}

/// Envelope of list endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub total_count: Option<u64>,
}

/// Key/value pair used for database user labels and cluster labels and tags
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Label {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl Label {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

/// Percent-encode a single path segment
pub fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_are_encoded() {
        let params = ApiQueryParams::new()
            .add("cloudProvider", "aws")
            .add("regionName", "US EAST 1")
            .add_optional("pageNum", None::<u32>);
        assert_eq!(
            params.to_query_string(),
            "?cloudProvider=aws&regionName=US%20EAST%201"
        );
        assert_eq!(ApiQueryParams::new().to_query_string(), "");
    }

    #[test]
    fn segments_escape_slashes() {
        assert_eq!(segment("CN=alice/OU=dev"), "CN%3Dalice%2FOU%3Ddev");
    }

    #[test]
    fn error_body_parses_partial_fields() {
        let body = r#"{"detail":"No cluster named c0 exists in group p.","error":404,"errorCode":"CLUSTER_NOT_FOUND","reason":"Not Found"}"#;
        let parsed: AtlasErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error, 404);
        assert_eq!(parsed.error_code, "CLUSTER_NOT_FOUND");
        assert!(parsed.parameters.is_empty());
    }
}
