// src/storage/memory_storage.rs
//! In-memory storage backend: a `HashMap` standing in for the filesystem. Used by
//! `in_memory` database configs and by tests that don't need durability.

use crate::document::DocumentId;
use crate::error::Result;
use crate::storage::traits::Storage;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryStorage {
    collections: HashMap<String, HashMap<DocumentId, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn write(&mut self, collection: &str, id: &DocumentId, doc: &Value) -> Result<()> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), doc.clone());
        Ok(())
    }

    fn read(&self, collection: &str, id: &DocumentId) -> Result<Option<Value>> {
        Ok(self.collections.get(collection).and_then(|docs| docs.get(id).cloned()))
    }

    fn read_all(&self, collection: &str) -> Result<Vec<Value>> {
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    fn delete(&mut self, collection: &str, id: &DocumentId) -> Result<bool> {
        Ok(self
            .collections
            .get_mut(collection)
            .map(|docs| docs.remove(id).is_some())
            .unwrap_or(false))
    }

    fn create_collection(&mut self, name: &str) -> Result<()> {
        self.collections.entry(name.to_string()).or_default();
        Ok(())
    }

    fn drop_collection(&mut self, name: &str) -> Result<()> {
        self.collections.remove(name);
        Ok(())
    }

    fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.keys().cloned().collect();
        names.sort();
        names
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
