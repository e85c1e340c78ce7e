// src/config.rs
//! Plain configuration structs, in the same serde-struct style the host library uses for
//! its own metadata records (index/collection descriptors) rather than a builder type.

use crate::logging::LogLevel;
use crate::schema::SchemaMode;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Root directory for collections. Ignored when `in_memory` is set.
    pub path: Option<String>,
    pub in_memory: bool,
    pub create_if_missing: bool,
    pub debug: bool,
    pub log_level: LogLevel,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: None,
            in_memory: false,
            create_if_missing: true,
            debug: false,
            log_level: LogLevel::Info,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectionConfig {
    pub encrypt: bool,
    pub encryption_key: Option<String>,
    pub cache_documents: bool,
    pub max_cache_size: usize,
    pub auto_flush: bool,
    pub flush_interval_ms: u64,
    pub schema_validation: SchemaMode,
    /// When set, installing a schema whose field declarations name `unique`/`index`
    /// attributes automatically creates the corresponding index on the collection.
    pub auto_index: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        CollectionConfig {
            encrypt: false,
            encryption_key: None,
            cache_documents: true,
            max_cache_size: 10_000,
            auto_flush: true,
            flush_interval_ms: 1000,
            schema_validation: SchemaMode::Strict,
            auto_index: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_config_defaults_are_sane() {
        let config = DatabaseConfig::default();
        assert!(!config.in_memory);
        assert!(config.create_if_missing);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn collection_config_defaults_are_sane() {
        let config = CollectionConfig::default();
        assert!(!config.encrypt);
        assert!(config.cache_documents);
        assert_eq!(config.schema_validation, SchemaMode::Strict);
        assert!(config.auto_index);
    }
}
