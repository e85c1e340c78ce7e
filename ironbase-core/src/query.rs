// src/query.rs
//! Query filter matching, built on a Strategy-pattern operator registry
//! (`operators::matches_filter`). `Query` is a thin JSON wrapper kept for callers
//! that want to hold onto a filter value without re-parsing it.

pub mod fingerprint;
pub mod operators;

use crate::document::Document;
use crate::error::Result;
use serde_json::Value;

pub use operators::matches_filter;

#[derive(Debug, Clone)]
pub struct Query {
    json: Value,
}

impl Query {
    pub fn new() -> Self {
        Query {
            json: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn from_json(json: &Value) -> Result<Self> {
        Ok(Query { json: json.clone() })
    }

    pub fn matches(&self, document: &Document) -> bool {
        operators::matches_filter(document, &self.json).unwrap_or(false)
    }

    pub fn to_json(&self) -> &Value {
        &self.json
    }

    pub fn into_json(self) -> Value {
        self.json
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}
