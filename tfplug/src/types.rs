//! Core value types for tfplug
//!
//! Terraform exchanges configuration, plan and state as untyped object trees.
//! `Dynamic` models one node of such a tree, `DynamicValue` wraps a root node
//! and offers path-based typed access plus the msgpack/JSON wire encodings.

use crate::error::{Result, TfplugError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Terraform's msgpack encoding of an unknown value: extension type 0, one
/// zero byte of payload
const UNKNOWN_EXT_TYPE: i8 = 0;
const UNKNOWN_EXT_PAYLOAD: &[u8] = &[0];

/// `(type, payload)` tuple that rmp-serde writes as a msgpack extension
struct UnknownExt;

impl Serialize for UnknownExt {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeTuple;

        struct Payload;

        impl Serialize for Payload {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_bytes(UNKNOWN_EXT_PAYLOAD)
            }
        }

        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&UNKNOWN_EXT_TYPE)?;
        tuple.serialize_element(&Payload)?;
        tuple.end()
    }
}

/// Dynamic represents Terraform values that can be of any type
/// IMPORTANT: Prefer the typed accessors over matching directly
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    /// Explicit null value
    Null,
    Bool(bool),
    /// All numbers are f64 to match Terraform
    Number(f64),
    String(String),
    /// Lists and sets (ordered, duplicates allowed on the wire)
    List(Vec<Dynamic>),
    /// Objects and maps
    Map(HashMap<String, Dynamic>),
    /// Value not yet known (during planning)
    Unknown,
}

impl Dynamic {
    /// Build an object from `(name, value)` pairs
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Dynamic)>,
    {
        Dynamic::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Dynamic::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Dynamic::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Dynamic]> {
        match self {
            Dynamic::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Dynamic>> {
        match self {
            Dynamic::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Dynamic::Unknown)
    }

    /// True when this value or anything nested in it is unknown
    pub fn contains_unknown(&self) -> bool {
        match self {
            Dynamic::Unknown => true,
            Dynamic::List(items) => items.iter().any(Dynamic::contains_unknown),
            Dynamic::Map(m) => m.values().any(Dynamic::contains_unknown),
            _ => false,
        }
    }

    /// Attribute of an object value; missing attributes read as null
    pub fn attr(&self, name: &str) -> &Dynamic {
        match self {
            Dynamic::Map(m) => m.get(name).unwrap_or(&Dynamic::Null),
            _ => &Dynamic::Null,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
            Dynamic::Unknown => "unknown",
        }
    }
}

impl From<bool> for Dynamic {
    fn from(value: bool) -> Self {
        Dynamic::Bool(value)
    }
}

impl From<f64> for Dynamic {
    fn from(value: f64) -> Self {
        Dynamic::Number(value)
    }
}

impl From<i64> for Dynamic {
    fn from(value: i64) -> Self {
        Dynamic::Number(value as f64)
    }
}

impl From<String> for Dynamic {
    fn from(value: String) -> Self {
        Dynamic::String(value)
    }
}

impl From<&str> for Dynamic {
    fn from(value: &str) -> Self {
        Dynamic::String(value.to_string())
    }
}

impl<T: Into<Dynamic>> From<Option<T>> for Dynamic {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Dynamic::Null)
    }
}

impl<T: Into<Dynamic>> From<Vec<T>> for Dynamic {
    fn from(values: Vec<T>) -> Self {
        Dynamic::List(values.into_iter().map(Into::into).collect())
    }
}

impl Serialize for Dynamic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Dynamic::Null => serializer.serialize_unit(),
            Dynamic::Bool(b) => serializer.serialize_bool(*b),
            Dynamic::Number(n) => serializer.serialize_f64(*n),
            Dynamic::String(s) => serializer.serialize_str(s),
            Dynamic::List(l) => l.serialize(serializer),
            Dynamic::Map(m) => m.serialize(serializer),
            // JSON has no unknowns; Terraform never sends them there
            Dynamic::Unknown if serializer.is_human_readable() => serializer.serialize_unit(),
            Dynamic::Unknown => {
                serializer.serialize_newtype_struct(rmp_serde::MSGPACK_EXT_STRUCT_NAME, &UnknownExt)
            }
        }
    }
}

impl<'de> Deserialize<'de> for Dynamic {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct DynamicVisitor;

        impl<'de> Visitor<'de> for DynamicVisitor {
            type Value = Dynamic;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a Terraform value")
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Null)
            }

            fn visit_none<E: de::Error>(self) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Null)
            }

            fn visit_some<D2>(self, deserializer: D2) -> std::result::Result<Dynamic, D2::Error>
            where
                D2: serde::Deserializer<'de>,
            {
                Dynamic::deserialize(deserializer)
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Bool(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::String(value.to_string()))
            }

            fn visit_string<E: de::Error>(self, value: String) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::String(value))
            }

            // rmp-serde hands msgpack extensions over as a `(type, payload)` newtype
            fn visit_newtype_struct<D2>(
                self,
                deserializer: D2,
            ) -> std::result::Result<Dynamic, D2::Error>
            where
                D2: serde::Deserializer<'de>,
            {
                let (ext_type, _payload): (i8, de::IgnoredAny) =
                    Deserialize::deserialize(deserializer)?;
                if ext_type == UNKNOWN_EXT_TYPE {
                    Ok(Dynamic::Unknown)
                } else {
                    Err(de::Error::custom(format!(
                        "unsupported msgpack extension type {}",
                        ext_type
                    )))
                }
            }

            fn visit_seq<V>(self, mut seq: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(elem) = seq.next_element()? {
                    items.push(elem);
                }
                Ok(Dynamic::List(items))
            }

            fn visit_map<V>(self, mut map: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::MapAccess<'de>,
            {
                let mut entries = HashMap::new();
                while let Some((key, value)) = map.next_entry::<String, Dynamic>()? {
                    entries.insert(key, value);
                }
                Ok(Dynamic::Map(entries))
            }
        }

        deserializer.deserialize_any(DynamicVisitor)
    }
}

/// DynamicValue wraps a root Dynamic and provides path access and encoding
/// This is what gets passed between the host and the provider
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub value: Dynamic,
}

impl DynamicValue {
    pub fn new(value: Dynamic) -> Self {
        Self { value }
    }

    pub fn null() -> Self {
        Self {
            value: Dynamic::Null,
        }
    }

    /// An empty object, the usual starting point for building state
    pub fn empty_object() -> Self {
        Self {
            value: Dynamic::Map(HashMap::new()),
        }
    }

    /// Terraform uses msgpack on the wire; a null root encodes as no bytes
    pub fn encode_msgpack(&self) -> Result<Vec<u8>> {
        match &self.value {
            Dynamic::Null => Ok(vec![]),
            value => rmp_serde::encode::to_vec(value)
                .map_err(|e| TfplugError::EncodingError(format!("msgpack encoding failed: {}", e))),
        }
    }

    pub fn decode_msgpack(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::null());
        }

        rmp_serde::decode::from_slice::<Dynamic>(data)
            .map(Self::new)
            .map_err(|e| TfplugError::DecodingError(format!("msgpack decoding failed: {}", e)))
    }

    pub fn encode_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.value)
            .map_err(|e| TfplugError::EncodingError(format!("json encoding failed: {}", e)))
    }

    pub fn decode_json(data: &[u8]) -> Result<Self> {
        let value = serde_json::from_slice(data)
            .map_err(|e| TfplugError::DecodingError(format!("json decoding failed: {}", e)))?;
        Ok(Self { value })
    }

    /// Raw access; None when any step of the path is missing
    pub fn get(&self, path: &AttributePath) -> Option<&Dynamic> {
        self.navigate_path(path).ok()
    }

    pub fn get_string(&self, path: &AttributePath) -> Result<String> {
        match self.navigate_path(path)? {
            Dynamic::String(s) => Ok(s.clone()),
            other => Err(mismatch(path, "string", other)),
        }
    }

    pub fn get_number(&self, path: &AttributePath) -> Result<f64> {
        match self.navigate_path(path)? {
            Dynamic::Number(n) => Ok(*n),
            other => Err(mismatch(path, "number", other)),
        }
    }

    pub fn get_bool(&self, path: &AttributePath) -> Result<bool> {
        match self.navigate_path(path)? {
            Dynamic::Bool(b) => Ok(*b),
            other => Err(mismatch(path, "bool", other)),
        }
    }

    pub fn get_list(&self, path: &AttributePath) -> Result<Vec<Dynamic>> {
        match self.navigate_path(path)? {
            Dynamic::List(l) => Ok(l.clone()),
            other => Err(mismatch(path, "list", other)),
        }
    }

    /// Null, unknown and missing all read as `None`; a wrongly typed value is an error
    pub fn get_optional_string(&self, path: &AttributePath) -> Result<Option<String>> {
        match self.get(path) {
            None | Some(Dynamic::Null) | Some(Dynamic::Unknown) => Ok(None),
            Some(Dynamic::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(mismatch(path, "string", other)),
        }
    }

    pub fn get_optional_list(&self, path: &AttributePath) -> Result<Vec<Dynamic>> {
        match self.get(path) {
            None | Some(Dynamic::Null) | Some(Dynamic::Unknown) => Ok(Vec::new()),
            Some(Dynamic::List(items)) => Ok(items.clone()),
            Some(other) => Err(mismatch(path, "list", other)),
        }
    }

    pub fn set_string(&mut self, path: &AttributePath, value: String) -> Result<()> {
        self.set(path, Dynamic::String(value))
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn is_unknown(&self) -> bool {
        self.value.is_unknown()
    }

    fn navigate_path<'a>(&'a self, path: &AttributePath) -> Result<&'a Dynamic> {
        let mut current = &self.value;

        for step in &path.steps {
            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => m
                    .get(name)
                    .ok_or_else(|| TfplugError::AttributeNotFound(path.to_string()))?,
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
                    usize::try_from(*idx)
                        .ok()
                        .and_then(|i| l.get(i))
                        .ok_or_else(|| TfplugError::AttributeNotFound(path.to_string()))?
                }
                (Dynamic::Null, _) => return Err(TfplugError::AttributeNotFound(path.to_string())),
                (other, _) => {
                    return Err(TfplugError::Custom(format!(
                        "cannot navigate into {} at {}",
                        other.type_name(),
                        path
                    )))
                }
            };
        }

        Ok(current)
    }

    /// Set a value, creating intermediate objects as needed
    pub fn set(&mut self, path: &AttributePath, new_value: Dynamic) -> Result<()> {
        let Some((last, parents)) = path.steps.split_last() else {
            self.value = new_value;
            return Ok(());
        };

        if !matches!(self.value, Dynamic::Map(_)) {
            self.value = Dynamic::Map(HashMap::new());
        }

        let mut current = &mut self.value;
        for step in parents {
            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => {
                    let entry = m
                        .entry(name.clone())
                        .or_insert_with(|| Dynamic::Map(HashMap::new()));
                    if entry.is_null() {
                        *entry = Dynamic::Map(HashMap::new());
                    }
                    entry
                }
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
                    let len = l.len();
                    usize::try_from(*idx)
                        .ok()
                        .and_then(|i| l.get_mut(i))
                        .ok_or_else(|| {
                            TfplugError::Custom(format!(
                                "list index {} out of bounds ({})",
                                idx, len
                            ))
                        })?
                }
                _ => return Err(TfplugError::Custom(format!("invalid path {}", path))),
            };
        }

        match (current, last) {
            (Dynamic::Map(m), AttributePathStep::AttributeName(name))
            | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => {
                m.insert(name.clone(), new_value);
                Ok(())
            }
            (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
                let len = l.len();
                let slot = usize::try_from(*idx)
                    .ok()
                    .and_then(|i| l.get_mut(i))
                    .ok_or_else(|| {
                        TfplugError::Custom(format!("list index {} out of bounds ({})", idx, len))
                    })?;
                *slot = new_value;
                Ok(())
            }
            _ => Err(TfplugError::Custom(format!("invalid path {}", path))),
        }
    }
}

impl From<Dynamic> for DynamicValue {
    fn from(value: Dynamic) -> Self {
        Self::new(value)
    }
}

fn mismatch(path: &AttributePath, expected: &str, actual: &Dynamic) -> TfplugError {
    if actual.is_null() {
        return TfplugError::AttributeNotFound(path.to_string());
    }
    TfplugError::TypeMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        actual: actual.type_name().to_string(),
    }
}

/// AttributePath represents a path to an attribute within a DynamicValue
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributePath {
    pub steps: Vec<AttributePathStep>,
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![AttributePathStep::AttributeName(name.to_string())],
        }
    }

    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.steps
            .push(AttributePathStep::AttributeName(name.to_string()));
        self
    }

    pub fn index(mut self, idx: i64) -> Self {
        self.steps.push(AttributePathStep::ElementKeyInt(idx));
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.steps
            .push(AttributePathStep::ElementKeyString(key.to_string()));
        self
    }

    /// Path of the sibling attribute `name` (same parent object)
    pub fn sibling(&self, name: &str) -> Self {
        let mut steps = self.steps.clone();
        steps.pop();
        steps.push(AttributePathStep::AttributeName(name.to_string()));
        Self { steps }
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                AttributePathStep::AttributeName(name) if i == 0 => write!(f, "{}", name)?,
                AttributePathStep::AttributeName(name) => write!(f, ".{}", name)?,
                AttributePathStep::ElementKeyString(key) => write!(f, "[{:?}]", key)?,
                AttributePathStep::ElementKeyInt(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

/// Individual step in an AttributePath
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributePathStep {
    AttributeName(String),
    ElementKeyString(String),
    ElementKeyInt(i64),
}

/// Diagnostic represents a warning or error from the provider
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
    pub attribute: Option<AttributePath>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, path: AttributePath) -> Self {
        self.attribute = Some(path);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// Convenience queries over a diagnostics list
pub trait Diagnostics {
    fn has_errors(&self) -> bool;
    fn error_count(&self) -> usize;
}

impl Diagnostics for [Diagnostic] {
    fn has_errors(&self) -> bool {
        self.iter().any(Diagnostic::is_error)
    }

    fn error_count(&self) -> usize {
        self.iter().filter(|d| d.is_error()).count()
    }
}

impl Diagnostics for Vec<Diagnostic> {
    fn has_errors(&self) -> bool {
        self.as_slice().has_errors()
    }

    fn error_count(&self) -> usize {
        self.as_slice().error_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_value_string_access() {
        let mut dv = DynamicValue::empty_object();
        dv.set_string(&AttributePath::new("name"), "test".to_string())
            .unwrap();

        assert_eq!(dv.get_string(&AttributePath::new("name")).unwrap(), "test");
    }

    #[test]
    fn dynamic_value_nested_access() {
        let mut dv = DynamicValue::empty_object();
        let path = AttributePath::new("config").attribute("endpoint");
        dv.set_string(&path, "https://example.com".to_string())
            .unwrap();

        assert_eq!(dv.get_string(&path).unwrap(), "https://example.com");
    }

    #[test]
    fn list_element_access_by_index() {
        let dv = DynamicValue::new(Dynamic::object([(
            "roles",
            Dynamic::List(vec![Dynamic::object([("role_name", "readWrite".into())])]),
        )]));

        let path = AttributePath::new("roles").index(0).attribute("role_name");
        assert_eq!(dv.get_string(&path).unwrap(), "readWrite");
        assert!(dv.get(&AttributePath::new("roles").index(3)).is_none());
    }

    #[test]
    fn optional_accessors_treat_null_and_unknown_as_absent() {
        let dv = DynamicValue::new(Dynamic::object([
            ("a", Dynamic::Null),
            ("b", Dynamic::Unknown),
            ("c", Dynamic::String("x".into())),
            ("d", Dynamic::Number(1.0)),
        ]));

        assert_eq!(dv.get_optional_string(&AttributePath::new("a")).unwrap(), None);
        assert_eq!(dv.get_optional_string(&AttributePath::new("b")).unwrap(), None);
        assert_eq!(dv.get_optional_string(&AttributePath::new("zz")).unwrap(), None);
        assert_eq!(
            dv.get_optional_string(&AttributePath::new("c")).unwrap(),
            Some("x".to_string())
        );
        assert!(matches!(
            dv.get_optional_string(&AttributePath::new("d")),
            Err(TfplugError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn null_reads_as_absent_for_strict_accessors() {
        let dv = DynamicValue::new(Dynamic::object([("a", Dynamic::Null)]));
        let err = dv.get_string(&AttributePath::new("a")).unwrap_err();
        assert!(err.is_absent());
    }

    #[test]
    fn msgpack_round_trip_preserves_unknown_and_null() {
        let dv = DynamicValue::new(Dynamic::object([
            ("id", Dynamic::Unknown),
            ("password", Dynamic::Null),
            ("count", Dynamic::Number(3.0)),
            ("tags", Dynamic::List(vec!["a".into(), "b".into()])),
        ]));

        let bytes = dv.encode_msgpack().unwrap();
        let decoded = DynamicValue::decode_msgpack(&bytes).unwrap();
        assert_eq!(decoded, dv);
    }

    #[test]
    fn unknown_uses_msgpack_extension_not_a_string() {
        let dv = DynamicValue::new(Dynamic::object([
            ("name", Dynamic::String("__unknown__".into())),
            ("id", Dynamic::Unknown),
        ]));

        let decoded = DynamicValue::decode_msgpack(&dv.encode_msgpack().unwrap()).unwrap();
        assert_eq!(
            decoded.get_string(&AttributePath::new("name")).unwrap(),
            "__unknown__"
        );
        assert!(decoded.get(&AttributePath::new("id")).unwrap().is_unknown());

        // fixext1, type 0, payload 0x00
        let bytes = DynamicValue::new(Dynamic::Unknown).encode_msgpack().unwrap();
        assert_eq!(bytes, vec![0xd4, 0x00, 0x00]);
    }

    #[test]
    fn null_root_encodes_to_empty_bytes() {
        assert!(DynamicValue::null().encode_msgpack().unwrap().is_empty());
        assert!(DynamicValue::decode_msgpack(&[]).unwrap().is_null());
    }

    #[test]
    fn json_decoding_accepts_integers() {
        let dv = DynamicValue::decode_json(br#"{"num_shards": 3, "name": "c0"}"#).unwrap();
        assert_eq!(dv.get_number(&AttributePath::new("num_shards")).unwrap(), 3.0);
    }

    #[test]
    fn path_display_is_human_readable() {
        let path = AttributePath::new("roles").index(1).attribute("role_name");
        assert_eq!(path.to_string(), "roles[1].role_name");
        assert_eq!(
            AttributePath::new("a").key("k").to_string(),
            "a[\"k\"]"
        );
    }

    #[test]
    fn contains_unknown_looks_through_nesting() {
        let v = Dynamic::object([(
            "outer",
            Dynamic::List(vec![Dynamic::object([("inner", Dynamic::Unknown)])]),
        )]);
        assert!(v.contains_unknown());
        assert!(!Dynamic::object([("a", "b".into())]).contains_unknown());
    }

    #[test]
    fn diagnostics_report_errors_only() {
        let diags = vec![
            Diagnostic::warning("deprecated", ""),
            Diagnostic::error("broken", ""),
        ];
        assert!(diags.has_errors());
        assert_eq!(diags.error_count(), 1);
    }
}
