//! Crate-wide error type.
//!
//! One `thiserror` enum covers every error kind named in the specification's error-handling
//! design: database, collection, document, schema, storage, encryption, query-shape, timeout.
//! `kind()` exposes the coarse category so callers (and tests) can assert on it without
//! matching every variant.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MongoLiteError>;

#[derive(Error, Debug)]
pub enum MongoLiteError {
    #[error("database error: {0}")]
    Database(String),

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("collection already exists: {0}")]
    CollectionExists(String),

    #[error("alias already exists: {0}")]
    AliasExists(String),

    #[error("document not found")]
    DocumentNotFound,

    #[error("document error: {0}")]
    DocumentError(String),

    #[error("schema error: {0}")]
    SchemaError(String),

    #[error("index error: {0}")]
    IndexError(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage corruption: {0}")]
    Corruption(String),

    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("operation timed out: {0}")]
    Timeout(String),
}

impl From<serde_json::Error> for MongoLiteError {
    fn from(e: serde_json::Error) -> Self {
        MongoLiteError::Serialization(e.to_string())
    }
}

/// Coarse error kind, matching the taxonomy in the specification's error-handling design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Database,
    Collection,
    Document,
    Schema,
    Storage,
    Encryption,
    QueryShape,
    Timeout,
}

impl MongoLiteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MongoLiteError::Database(_) => ErrorKind::Database,
            MongoLiteError::CollectionNotFound(_)
            | MongoLiteError::CollectionExists(_)
            | MongoLiteError::AliasExists(_) => ErrorKind::Collection,
            MongoLiteError::DocumentNotFound | MongoLiteError::DocumentError(_) => {
                ErrorKind::Document
            }
            MongoLiteError::SchemaError(_) => ErrorKind::Schema,
            MongoLiteError::IndexError(_)
            | MongoLiteError::Io(_)
            | MongoLiteError::Corruption(_)
            | MongoLiteError::Serialization(_) => ErrorKind::Storage,
            MongoLiteError::Encryption(_) => ErrorKind::Encryption,
            MongoLiteError::InvalidQuery(_) => ErrorKind::QueryShape,
            MongoLiteError::Timeout(_) => ErrorKind::Timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_storage_variants() {
        assert_eq!(
            MongoLiteError::Corruption("bad".into()).kind(),
            ErrorKind::Storage
        );
        assert_eq!(
            MongoLiteError::IndexError("bad".into()).kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn kind_maps_query_shape() {
        assert_eq!(
            MongoLiteError::InvalidQuery("bad op".into()).kind(),
            ErrorKind::QueryShape
        );
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MongoLiteError = io_err.into();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
