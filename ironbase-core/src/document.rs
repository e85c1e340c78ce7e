// src/document.rs
//! Document representation: a key→value record plus the reserved metadata
//! fields every stored document carries (`_id`, `created_at`, `updated_at`, `version`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// MongoDB-style document with reserved metadata alongside the user fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: DocumentId,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,

    #[serde(flatten)]
    pub fields: HashMap<String, Value>,
}

/// Opaque document id. Defaults to a 32-character hex string (UUID v4, no dashes);
/// callers may also supply their own id at insert time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    /// Generate a new opaque 32-hex-char id.
    pub fn new() -> Self {
        DocumentId(Uuid::new_v4().simple().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        DocumentId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

const METADATA_FIELDS: [&str; 4] = ["_id", "created_at", "updated_at", "version"];

/// True if `field` names one of the reserved metadata fields rather than a user field.
pub fn is_metadata_field(field: &str) -> bool {
    METADATA_FIELDS.contains(&field)
}

impl Document {
    /// Create a new document, stamping metadata (`created_at = updated_at = now`, `version = 1`).
    pub fn new(id: DocumentId, fields: HashMap<String, Value>) -> Self {
        let now = Utc::now();
        Document {
            id,
            created_at: now,
            updated_at: now,
            version: 1,
            fields,
        }
    }

    pub fn from_value(value: &Value) -> serde_json::Result<Self> {
        serde_json::from_value(value.clone())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Field lookup with dot-notation support; also resolves the reserved metadata fields.
    pub fn get(&self, field: &str) -> Option<Value> {
        if field.is_empty() {
            return None;
        }
        match field {
            "_id" => return Some(Value::String(self.id.0.clone())),
            "created_at" => return Some(serde_json::to_value(self.created_at).ok()?),
            "updated_at" => return Some(serde_json::to_value(self.updated_at).ok()?),
            "version" => return Some(Value::from(self.version)),
            _ => {}
        }

        if field.contains('.') {
            let mut value = self.fields.get(field.split('.').next().unwrap())?;
            for part in field.split('.').skip(1) {
                match value {
                    Value::Object(map) => value = map.get(part)?,
                    Value::Array(arr) => {
                        let index = part.parse::<usize>().ok()?;
                        value = arr.get(index)?;
                    }
                    _ => return None,
                }
            }
            Some(value.clone())
        } else {
            self.fields.get(field).cloned()
        }
    }

    pub fn set(&mut self, field: String, value: Value) {
        self.fields.insert(field, value);
    }

    /// Set a field with dot-notation support, creating intermediate objects as needed.
    pub fn set_nested(&mut self, field: &str, value: Value) {
        if !field.contains('.') {
            self.fields.insert(field.to_string(), value);
            return;
        }

        let parts: Vec<&str> = field.split('.').collect();
        let first = parts[0];

        if !self.fields.contains_key(first) {
            let nested = Self::create_nested_value(&parts[1..], value);
            self.fields.insert(first.to_string(), nested);
            return;
        }

        let root = self.fields.get_mut(first).unwrap();
        Self::set_value_at_path(root, &parts[1..], value);
    }

    fn create_nested_value(parts: &[&str], value: Value) -> Value {
        if parts.is_empty() {
            return value;
        }
        let mut obj = serde_json::Map::new();
        obj.insert(
            parts[0].to_string(),
            Self::create_nested_value(&parts[1..], value),
        );
        Value::Object(obj)
    }

    fn set_value_at_path(current: &mut Value, parts: &[&str], value: Value) {
        if parts.is_empty() {
            return;
        }

        if parts.len() == 1 {
            match current {
                Value::Object(map) => {
                    map.insert(parts[0].to_string(), value);
                }
                Value::Array(arr) => {
                    if let Ok(index) = parts[0].parse::<usize>() {
                        if index < arr.len() {
                            arr[index] = value;
                        }
                    }
                }
                _ => {
                    let mut obj = serde_json::Map::new();
                    obj.insert(parts[0].to_string(), value);
                    *current = Value::Object(obj);
                }
            }
            return;
        }

        match current {
            Value::Object(map) => {
                if !map.contains_key(parts[0]) {
                    map.insert(
                        parts[0].to_string(),
                        Self::create_nested_value(&parts[1..], value),
                    );
                } else {
                    let next = map.get_mut(parts[0]).unwrap();
                    Self::set_value_at_path(next, &parts[1..], value);
                }
            }
            Value::Array(arr) => {
                if let Ok(index) = parts[0].parse::<usize>() {
                    if index < arr.len() {
                        Self::set_value_at_path(&mut arr[index], &parts[1..], value);
                    }
                }
            }
            _ => {
                let nested = Self::create_nested_value(parts, value);
                *current = nested;
            }
        }
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn remove_nested(&mut self, field: &str) -> Option<Value> {
        if !field.contains('.') {
            return self.fields.remove(field);
        }

        let parts: Vec<&str> = field.split('.').collect();
        let first = parts[0];

        if !self.fields.contains_key(first) {
            return None;
        }

        let root = self.fields.get_mut(first)?;
        Self::remove_value_at_path(root, &parts[1..])
    }

    fn remove_value_at_path(current: &mut Value, parts: &[&str]) -> Option<Value> {
        if parts.is_empty() {
            return None;
        }

        if parts.len() == 1 {
            match current {
                Value::Object(map) => map.remove(parts[0]),
                Value::Array(arr) => {
                    let index = parts[0].parse::<usize>().ok()?;
                    if index < arr.len() {
                        Some(arr.remove(index))
                    } else {
                        None
                    }
                }
                _ => None,
            }
        } else {
            match current {
                Value::Object(map) => {
                    let next = map.get_mut(parts[0])?;
                    Self::remove_value_at_path(next, &parts[1..])
                }
                Value::Array(arr) => {
                    let index = parts[0].parse::<usize>().ok()?;
                    if index < arr.len() {
                        Self::remove_value_at_path(&mut arr[index], &parts[1..])
                    } else {
                        None
                    }
                }
                _ => None,
            }
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        if is_metadata_field(field) {
            return true;
        }
        self.fields.contains_key(field)
    }

    /// Bump `version` and refresh `updated_at`; called by the write path on every update.
    pub fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        let mut map = serde_json::Map::new();
        map.insert("_id".to_string(), Value::String(doc.id.0.clone()));
        map.insert(
            "created_at".to_string(),
            serde_json::to_value(doc.created_at).unwrap(),
        );
        map.insert(
            "updated_at".to_string(),
            serde_json::to_value(doc.updated_at).unwrap(),
        );
        map.insert("version".to_string(), Value::from(doc.version));
        for (k, v) in doc.fields {
            map.insert(k, v);
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc_with(fields: Vec<(&str, Value)>) -> Document {
        let mut map = HashMap::new();
        for (k, v) in fields {
            map.insert(k.to_string(), v);
        }
        Document::new(DocumentId::new(), map)
    }

    #[test]
    fn new_id_is_32_hex_chars() {
        let id = DocumentId::new();
        assert_eq!(id.0.len(), 32);
        assert!(id.0.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn new_document_has_version_one_and_equal_timestamps() {
        let doc = doc_with(vec![("name", json!("Alice"))]);
        assert_eq!(doc.version, 1);
        assert_eq!(doc.created_at, doc.updated_at);
    }

    #[test]
    fn touch_bumps_version_and_updated_at() {
        let mut doc = doc_with(vec![]);
        let before = doc.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        doc.touch();
        assert_eq!(doc.version, 2);
        assert!(doc.updated_at >= before);
        assert!(doc.updated_at >= doc.created_at);
    }

    #[test]
    fn get_resolves_metadata_fields() {
        let doc = doc_with(vec![("name", json!("Bob"))]);
        assert_eq!(doc.get("_id"), Some(Value::String(doc.id.0.clone())));
        assert_eq!(doc.get("version"), Some(json!(1)));
        assert!(doc.get("created_at").is_some());
    }

    #[test]
    fn get_set_remove_nested() {
        let mut doc = doc_with(vec![]);
        doc.set_nested("address.city", json!("Budapest"));
        assert_eq!(doc.get("address.city"), Some(json!("Budapest")));
        let removed = doc.remove_nested("address.city");
        assert_eq!(removed, Some(json!("Budapest")));
        assert_eq!(doc.get("address.city"), None);
    }

    #[test]
    fn get_array_index_path() {
        let doc = doc_with(vec![("items", json!([{"name": "a"}, {"name": "b"}]))]);
        assert_eq!(doc.get("items.1.name"), Some(json!("b")));
        assert_eq!(doc.get("items.5.name"), None);
    }

    #[test]
    fn contains_treats_metadata_as_present() {
        let doc = doc_with(vec![]);
        assert!(doc.contains("_id"));
        assert!(doc.contains("version"));
        assert!(!doc.contains("missing"));
    }

    #[test]
    fn roundtrip_serialization_preserves_metadata_and_fields() {
        let doc = doc_with(vec![("name", json!("Grace")), ("tags", json!(["a", "b"]))]);
        let json_str = doc.to_json().unwrap();
        let restored: Document = serde_json::from_str(&json_str).unwrap();
        assert_eq!(restored.id, doc.id);
        assert_eq!(restored.version, doc.version);
        assert_eq!(restored.get("name"), doc.get("name"));
        assert_eq!(restored.get("tags"), doc.get("tags"));
    }

    #[test]
    fn into_value_includes_reserved_fields() {
        let doc = doc_with(vec![("key", json!("value"))]);
        let id_str = doc.id.0.clone();
        let value: Value = doc.into();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.get("_id").unwrap(), &json!(id_str));
        assert_eq!(obj.get("version").unwrap(), &json!(1));
        assert_eq!(obj.get("key").unwrap(), &json!("value"));
    }
}
