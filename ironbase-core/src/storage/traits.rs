// src/storage/traits.rs
//! Storage abstraction: document CRUD plus collection lifecycle. Implemented by
//! [`FileStorage`](super::FileStorage) (one file per document) and
//! [`MemoryStorage`](super::MemoryStorage) (in-memory, for tests and `in_memory` configs).

use crate::document::DocumentId;
use crate::error::Result;
use serde_json::Value;

pub trait Storage: Send + Sync {
    /// Persist `doc` under `collection/id`, replacing any existing body atomically.
    fn write(&mut self, collection: &str, id: &DocumentId, doc: &Value) -> Result<()>;

    /// Read a document by id. A missing document is `Ok(None)`, not an error.
    fn read(&self, collection: &str, id: &DocumentId) -> Result<Option<Value>>;

    /// Read every document currently stored in `collection`.
    fn read_all(&self, collection: &str) -> Result<Vec<Value>>;

    /// Remove a document. Returns whether it was present.
    fn delete(&mut self, collection: &str, id: &DocumentId) -> Result<bool>;

    fn exists(&self, collection: &str, id: &DocumentId) -> Result<bool> {
        Ok(self.read(collection, id)?.is_some())
    }

    fn create_collection(&mut self, name: &str) -> Result<()>;

    fn drop_collection(&mut self, name: &str) -> Result<()>;

    fn list_collections(&self) -> Vec<String>;

    /// Flush any buffered state to durable storage. A no-op for in-memory backends.
    fn flush(&mut self) -> Result<()>;
}
