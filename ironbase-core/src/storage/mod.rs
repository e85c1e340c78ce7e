// src/storage/mod.rs
//! Storage backends: one document per file on disk, or an in-memory `HashMap`
//! for tests and `in_memory` configs. Both implement the same [`Storage`] trait.

pub mod file_storage;
pub mod memory_storage;
pub mod traits;

pub use file_storage::FileStorage;
pub use memory_storage::MemoryStorage;
pub use traits::Storage;

/// Metadata about a stored document, without loading its body.
#[derive(Debug, Clone)]
pub struct DocumentMetadata {
    pub id: crate::document::DocumentId,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub size: u64,
}

/// Directory-scan and batch-read tuning; bounds file-descriptor pressure on `read_all`.
pub const READ_BATCH_SIZE: usize = 100;
