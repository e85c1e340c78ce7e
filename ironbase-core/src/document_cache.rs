// src/document_cache.rs
//! Bounded cache of fully decoded documents, keyed by id. Populated on `find_by_id`,
//! on post-load of query candidates, and on every successful write. The invariant a
//! caller may rely on: if an id is present, its value equals storage.

use crate::document::DocumentId;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

pub struct DocumentCache {
    capacity: usize,
    entries: RwLock<HashMap<DocumentId, Value>>,
}

impl DocumentCache {
    pub fn new(capacity: usize) -> Self {
        DocumentCache {
            capacity,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, id: &DocumentId) -> Option<Value> {
        self.entries.read().get(id).cloned()
    }

    /// Insert or refresh `id`'s cached value. When full, new ids are simply skipped:
    /// existing entries are never evicted, since the cache is only ever a read-through
    /// shortcut and a miss just falls back to storage.
    pub fn put(&self, id: DocumentId, value: Value) {
        let mut entries = self.entries.write();
        if entries.contains_key(&id) {
            entries.insert(id, value);
        } else if entries.len() < self.capacity {
            entries.insert(id, value);
        }
    }

    pub fn remove(&self, id: &DocumentId) {
        self.entries.write().remove(id);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
