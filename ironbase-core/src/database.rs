// src/database.rs
//! `DatabaseCore`: the public facade. Owns the collection registry and the alias table,
//! and resolves aliases before any lookup reaches a [`Collection`](crate::collection::Collection) —
//! aliases are a fiction of this layer only, never seen by the index catalog or the
//! collection itself. Grounded on the host library's own `DatabaseCore` for the general
//! shape (a struct wrapping shared storage, collection() creating on first access), with
//! the WAL/transaction/durability-mode machinery left behind: this facade is single-storage,
//! not generic over a durability-tiered backend.

use crate::collection::Collection;
use crate::config::{CollectionConfig, DatabaseConfig};
use crate::error::{MongoLiteError, Result};
use crate::log_info;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;

pub struct DatabaseStats {
    pub collection_count: usize,
    pub document_count: usize,
    pub index_count: usize,
}

struct Registry {
    collections: HashMap<String, Collection>,
    aliases: HashMap<String, String>,
}

pub struct DatabaseCore {
    config: DatabaseConfig,
    root: Option<PathBuf>,
    registry: RwLock<Registry>,
}

impl DatabaseCore {
    /// Opens a database rooted at `config.path`, or a purely in-memory one when
    /// `config.in_memory` is set. Does not eagerly open any collection.
    pub fn open(config: DatabaseConfig) -> Result<Self> {
        let root = if config.in_memory {
            None
        } else {
            let path = config
                .path
                .clone()
                .ok_or_else(|| MongoLiteError::Database("path required unless in_memory".into()))?;
            let root = PathBuf::from(path);
            if !root.exists() {
                if config.create_if_missing {
                    std::fs::create_dir_all(&root)?;
                } else {
                    return Err(MongoLiteError::Database(format!(
                        "database path {} does not exist",
                        root.display()
                    )));
                }
            }
            Some(root)
        };

        log_info!("database opened at {:?}", root);

        Ok(DatabaseCore {
            config,
            root,
            registry: RwLock::new(Registry { collections: HashMap::new(), aliases: HashMap::new() }),
        })
    }

    pub fn open_memory() -> Result<Self> {
        Self::open(DatabaseConfig { in_memory: true, ..DatabaseConfig::default() })
    }

    /// No persistent resources to release; present for symmetry with `open` and so
    /// callers have an explicit point to stop using the handle.
    pub fn close(&self) {
        log_info!("database closed");
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    fn canonical_name(registry: &Registry, name: &str) -> String {
        registry.aliases.get(name).cloned().unwrap_or_else(|| name.to_string())
    }

    /// Looks up a collection by name (resolving an alias first), creating it on first
    /// access when `create_if_missing` allows it.
    pub fn collection(&self, name: &str) -> Result<()> {
        self.with_collection(name, |_| Ok(()))
    }

    /// Runs `body` against the named collection, opening it on first access.
    pub fn with_collection<T>(&self, name: &str, body: impl FnOnce(&Collection) -> Result<T>) -> Result<T> {
        let canonical = {
            let registry = self.registry.read();
            Self::canonical_name(&registry, name)
        };

        {
            let registry = self.registry.read();
            if let Some(collection) = registry.collections.get(&canonical) {
                return body(collection);
            }
        }

        if !self.config.create_if_missing {
            return Err(MongoLiteError::CollectionNotFound(canonical));
        }

        let mut registry = self.registry.write();
        let collection = match registry.collections.entry(canonical.clone()) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                let created = self.open_collection(&canonical, CollectionConfig::default())?;
                entry.insert(created)
            }
        };
        body(collection)
    }

    fn open_collection(&self, name: &str, config: CollectionConfig) -> Result<Collection> {
        match &self.root {
            Some(root) => Collection::open(root, name.to_string(), config),
            None => Ok(Collection::new_in_memory(name.to_string(), config)),
        }
    }

    /// Creates a collection with explicit configuration. Fails if one already exists
    /// under this canonical name.
    pub fn create_collection(&self, name: &str, config: CollectionConfig) -> Result<()> {
        let mut registry = self.registry.write();
        let canonical = Self::canonical_name(&registry, name);
        if registry.collections.contains_key(&canonical) {
            return Err(MongoLiteError::CollectionExists(canonical));
        }
        let collection = self.open_collection(&canonical, config)?;
        registry.collections.insert(canonical, collection);
        Ok(())
    }

    pub fn drop_collection(&self, name: &str) -> Result<()> {
        let mut registry = self.registry.write();
        let canonical = Self::canonical_name(&registry, name);
        if registry.collections.remove(&canonical).is_none() {
            return Err(MongoLiteError::CollectionNotFound(canonical));
        }
        if let Some(root) = &self.root {
            let dir = root.join(&canonical);
            if dir.exists() {
                std::fs::remove_dir_all(dir)?;
            }
        }
        registry.aliases.retain(|_, target| target != &canonical);
        Ok(())
    }

    pub fn list_collections(&self) -> Vec<String> {
        let registry = self.registry.read();
        let mut names: Vec<String> = registry.collections.keys().cloned().collect();
        names.sort();
        names
    }

    /// Registers `alias` as an alternate name for `canonical`. The canonical collection
    /// need not exist yet; resolution happens lazily in [`with_collection`].
    pub fn add_alias(&self, alias: &str, canonical: &str) -> Result<()> {
        let mut registry = self.registry.write();
        if registry.aliases.contains_key(alias) || registry.collections.contains_key(alias) {
            return Err(MongoLiteError::AliasExists(alias.to_string()));
        }
        registry.aliases.insert(alias.to_string(), canonical.to_string());
        Ok(())
    }

    pub fn resolve_alias(&self, name: &str) -> String {
        let registry = self.registry.read();
        Self::canonical_name(&registry, name)
    }

    /// Cheap health check: the root path exists and is writable, and every registered
    /// collection's on-disk directory is present. Always `Ok` for an in-memory database.
    pub fn validate(&self) -> Result<()> {
        let Some(root) = &self.root else { return Ok(()) };

        let metadata = std::fs::metadata(root)
            .map_err(|_| MongoLiteError::Database(format!("root path {} is not accessible", root.display())))?;
        if metadata.permissions().readonly() {
            return Err(MongoLiteError::Database(format!("root path {} is not writable", root.display())));
        }

        let registry = self.registry.read();
        for name in registry.collections.keys() {
            let dir = root.join(name);
            if !dir.exists() {
                return Err(MongoLiteError::Database(format!("collection directory missing: {}", dir.display())));
            }
        }
        Ok(())
    }

    /// Aggregates document and index counts across every currently open collection.
    pub fn stats(&self) -> Result<DatabaseStats> {
        let registry = self.registry.read();
        let mut document_count = 0;
        let mut index_count = 0;
        for collection in registry.collections.values() {
            let stats = collection.stats()?;
            document_count += stats.document_count;
            index_count += stats.index_count;
        }
        Ok(DatabaseStats { collection_count: registry.collections.len(), document_count, index_count })
    }
}
