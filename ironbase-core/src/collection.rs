// src/collection.rs
//! A single collection: storage backend, index catalog, document cache, query cache,
//! optional schema and encryptor, wired together through the find pipeline in
//! `query_planner`. Grounded on `collection_core/mod.rs`'s overall write-path ordering
//! (validate -> defaults -> stamp metadata -> persist -> cache -> index), but the
//! update/delete path here replaces the teacher's tombstone-write-then-reinsert scheme
//! with direct in-place replacement and physical file removal.

use crate::config::CollectionConfig;
use crate::document::{Document, DocumentId};
use crate::encryption::Encryptor;
use crate::document_cache::DocumentCache;
use crate::error::{MongoLiteError, Result};
use crate::find_options::FindOptions;
use crate::index::IndexCatalog;
use crate::query_builder::QueryBuilder;
use crate::query_cache::{CacheStats, QueryCache};
use crate::query_planner::{DocumentSource, FindResult, QueryPlanner};
use crate::schema::CompiledSchema;
use crate::storage::{MemoryStorage, Storage};
use crate::{log_debug, log_warn};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::path::Path;

const ID_INDEX: &str = "_id";

/// Outcome of a single insert.
#[derive(Debug, Clone)]
pub struct InsertResult {
    pub id: DocumentId,
    pub inserted_count: usize,
    pub document: Value,
}

/// Outcome of a batch insert. Insertion is not atomic across documents: `errors`
/// names which inputs (by index) failed, and `inserted` carries whatever succeeded
/// before or after the failures.
#[derive(Debug, Clone, Default)]
pub struct InsertManyResult {
    pub inserted: Vec<InsertResult>,
    pub errors: Vec<(usize, String)>,
}

/// Outcome of an upsert: exactly one of `matched_id`/`upserted_id` is set.
#[derive(Debug, Clone)]
pub struct UpsertResult {
    pub document: Value,
    pub upserted_id: Option<DocumentId>,
    pub upserted_count: usize,
}

/// Aggregate counts for a collection, as reported by `Collection::stats`.
#[derive(Debug, Clone)]
pub struct CollectionStats {
    pub document_count: usize,
    pub index_count: usize,
    pub query_cache: CacheStats,
}

pub struct Collection {
    name: String,
    storage: RwLock<Box<dyn Storage>>,
    indexes: RwLock<IndexCatalog>,
    doc_cache: DocumentCache,
    query_cache: QueryCache,
    schema: RwLock<Option<CompiledSchema>>,
    schema_json: RwLock<Option<Value>>,
    encryptor: Option<Encryptor>,
    config: CollectionConfig,
}

/// Adapts a `Collection`'s storage + doc cache into the `DocumentSource` the
/// query planner reads through: cache first, storage on a miss.
struct CollectionSource<'a> {
    collection: &'a Collection,
}

impl<'a> DocumentSource for CollectionSource<'a> {
    fn load(&self, id: &DocumentId) -> Option<Value> {
        self.collection.load(id)
    }

    fn all_ids(&self) -> Vec<DocumentId> {
        self.collection
            .storage
            .read()
            .read_all(&self.collection.name)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| v.get("_id").and_then(|id| id.as_str()).map(DocumentId::from_string))
            .collect()
    }
}

impl Collection {
    fn new(name: String, storage: Box<dyn Storage>, config: CollectionConfig) -> Self {
        let encryptor = if config.encrypt {
            config.encryption_key.as_deref().map(Encryptor::new)
        } else {
            None
        };
        let cache_capacity = if config.cache_documents { config.max_cache_size } else { 0 };

        let mut indexes = IndexCatalog::new();
        indexes.create_index(ID_INDEX, vec!["_id".to_string()], true);

        let collection = Collection {
            name,
            storage: RwLock::new(storage),
            indexes: RwLock::new(indexes),
            doc_cache: DocumentCache::new(cache_capacity),
            query_cache: QueryCache::new(1000),
            schema: RwLock::new(None),
            schema_json: RwLock::new(None),
            encryptor,
            config,
        };
        collection.rebuild_indexes();
        collection
    }

    pub fn new_in_memory(name: String, config: CollectionConfig) -> Self {
        let mut storage = MemoryStorage::new();
        storage.create_collection(&name).ok();
        Collection::new(name, Box::new(storage), config)
    }

    pub fn open<P: AsRef<Path>>(base: P, name: String, config: CollectionConfig) -> Result<Self> {
        let mut storage = crate::storage::FileStorage::open(base)?;
        storage.create_collection(&name)?;
        Ok(Collection::new(name, Box::new(storage), config))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    pub fn set_schema(&self, schema: CompiledSchema) {
        *self.schema.write() = Some(schema);
    }

    /// Compiles and installs a schema from its raw JSON form, keeping the JSON around so
    /// it can be handed back out verbatim (the CLI's schema save/export commands round-trip
    /// through this rather than through `CompiledSchema`, which has no `Serialize` impl).
    /// Honors `config.schema_validation` as the compiled mode, and — when `auto_index` is
    /// on — creates an index for every field the schema declares `index`/`unique` on.
    pub fn set_schema_from_json(&self, schema: Value) -> Result<()> {
        let compiled = CompiledSchema::from_value_with_mode(&schema, self.config.schema_validation)?;
        let indexed_fields = compiled.indexed_fields();
        *self.schema.write() = Some(compiled);
        *self.schema_json.write() = Some(schema);

        if self.config.auto_index {
            for (field, unique) in indexed_fields {
                let index_name = format!("auto_{}", field);
                let already_exists = self.indexes.read().get(&index_name).is_some();
                if already_exists {
                    continue;
                }
                self.create_index(&index_name, vec![field], unique)?;
            }
        }
        Ok(())
    }

    pub fn schema_json(&self) -> Option<Value> {
        self.schema_json.read().clone()
    }

    fn rebuild_indexes(&self) {
        let docs = self.storage.read().read_all(&self.name).unwrap_or_default();
        let mut indexes = self.indexes.write();
        for doc in &docs {
            if let Some(id) = doc.get("_id").and_then(|v| v.as_str()) {
                let _ = indexes.index_document(doc, &DocumentId::from_string(id));
            }
        }
    }

    fn load(&self, id: &DocumentId) -> Option<Value> {
        if let Some(cached) = self.doc_cache.get(id) {
            return Some(cached);
        }
        let stored = self.storage.read().read(&self.name, id).ok().flatten()?;
        let plain = self.decrypt_if_needed(&stored).ok()?;
        self.doc_cache.put(id.clone(), plain.clone());
        Some(plain)
    }

    fn source(&self) -> CollectionSource<'_> {
        CollectionSource { collection: self }
    }

    fn with_planner<T>(&self, body: impl FnOnce(&QueryPlanner<'_>) -> Result<T>) -> Result<T> {
        let indexes = self.indexes.read();
        let planner = QueryPlanner::new(&self.name, &indexes, &self.query_cache);
        body(&planner)
    }

    // --- write path -----------------------------------------------------

    pub fn insert(&self, fields: Value) -> Result<InsertResult> {
        let mut fields = fields;
        if let Some(schema) = self.schema.read().as_ref() {
            schema.apply_defaults(&mut fields);
            schema.validate(&self.name, &fields)?;
        }

        let obj = fields.as_object().ok_or_else(|| {
            MongoLiteError::DocumentError("document must be a JSON object".to_string())
        })?;
        let id = match obj.get("_id").and_then(|v| v.as_str()) {
            Some(existing) => DocumentId::from_string(existing),
            None => DocumentId::new(),
        };

        let mut field_map = obj.clone();
        field_map.remove("_id");
        let doc = Document::new(id.clone(), field_map.into_iter().collect());
        let value: Value = doc.into();

        self.persist_new(&id, &value)?;
        log_debug!("inserted document {} into '{}'", id, self.name);

        Ok(InsertResult {
            id,
            inserted_count: 1,
            document: value,
        })
    }

    pub fn insert_one(&self, fields: Value) -> Result<DocumentId> {
        Ok(self.insert(fields)?.id)
    }

    /// Insert documents in batches of `READ_BATCH_SIZE`. Not atomic: a failure on one
    /// document does not roll back documents already inserted in the same call.
    pub fn insert_many(&self, documents: Vec<Value>) -> InsertManyResult {
        let mut result = InsertManyResult::default();
        for chunk in documents.into_iter().enumerate().collect::<Vec<_>>().chunks(crate::storage::READ_BATCH_SIZE) {
            for (index, fields) in chunk {
                match self.insert(fields.clone()) {
                    Ok(inserted) => result.inserted.push(inserted),
                    Err(e) => result.errors.push((*index, e.to_string())),
                }
            }
        }
        result
    }

    fn persist_new(&self, id: &DocumentId, value: &Value) -> Result<()> {
        let on_disk = self.encrypt_if_needed(value)?;
        self.storage.write().write(&self.name, id, &on_disk)?;
        self.doc_cache.put(id.clone(), value.clone());
        self.indexes.write().index_document(value, id)?;
        self.query_cache.invalidate_collection(&self.name);
        Ok(())
    }

    pub fn update_one(&self, filter: &Value, update: &Value) -> Result<Option<Value>> {
        let matched = self.with_planner(|planner| planner.find_one(filter, &self.source()))?;
        match matched {
            Some(existing) => self.apply_update(&existing, update).map(Some),
            None => Ok(None),
        }
    }

    /// Update every document matching `filter`. `FindOptions` sort/limit are not
    /// meaningful for a bulk update and are ignored, per the wire contract.
    pub fn update_many(&self, filter: &Value, update: &Value) -> Result<Vec<Value>> {
        let matches =
            self.with_planner(|planner| planner.find(filter, &FindOptions::new(), &self.source()))?;
        matches.documents.iter().map(|doc| self.apply_update(doc, update)).collect()
    }

    fn apply_update(&self, existing: &Value, update: &Value) -> Result<Value> {
        let mut doc = Document::from_value(existing)?;
        let old_value = existing.clone();

        let changed = apply_update_operators(&mut doc, update)?;
        if changed {
            doc.touch();
        }
        let new_value: Value = doc.into();

        if let Some(schema) = self.schema.read().as_ref() {
            schema.validate(&self.name, &new_value)?;
        }

        let on_disk = self.encrypt_if_needed(&new_value)?;
        self.storage.write().write(&self.name, &doc_id(&new_value)?, &on_disk)?;

        let id = doc_id(&new_value)?;
        self.doc_cache.put(id.clone(), new_value.clone());

        {
            let mut indexes = self.indexes.write();
            indexes.deindex_document(&old_value, &id);
            indexes.index_document(&new_value, &id)?;
        }
        self.query_cache.invalidate_collection(&self.name);

        Ok(new_value)
    }

    /// Update the first match, or insert `update` as a new document when nothing matches.
    pub fn upsert(&self, filter: &Value, update: Value) -> Result<UpsertResult> {
        let existing = self.with_planner(|planner| planner.find_one(filter, &self.source()))?;
        if let Some(existing) = existing {
            let updated = self.apply_update(&existing, &update)?;
            return Ok(UpsertResult {
                document: updated,
                upserted_id: None,
                upserted_count: 0,
            });
        }

        let mut payload = update;
        merge_filter_into_payload(&mut payload, filter);
        let inserted = self.insert(payload)?;
        Ok(UpsertResult {
            document: inserted.document.clone(),
            upserted_id: Some(inserted.id),
            upserted_count: 1,
        })
    }

    pub fn delete_one(&self, filter: &Value) -> Result<Option<Value>> {
        let matched = self.with_planner(|planner| planner.find_one(filter, &self.source()))?;
        match matched {
            Some(doc) => {
                self.remove(&doc)?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    pub fn delete_many(&self, filter: &Value) -> Result<usize> {
        let matches =
            self.with_planner(|planner| planner.find(filter, &FindOptions::new(), &self.source()))?;
        for doc in &matches.documents {
            self.remove(doc)?;
        }
        Ok(matches.documents.len())
    }

    fn remove(&self, doc: &Value) -> Result<()> {
        let id = doc_id(doc)?;
        self.storage.write().delete(&self.name, &id)?;
        self.doc_cache.remove(&id);
        self.indexes.write().deindex_document(doc, &id);
        self.query_cache.invalidate_collection(&self.name);
        Ok(())
    }

    fn encrypt_if_needed(&self, value: &Value) -> Result<Value> {
        let Some(encryptor) = &self.encryptor else {
            return Ok(value.clone());
        };
        let obj = value.as_object().ok_or_else(|| {
            MongoLiteError::DocumentError("document must be a JSON object".to_string())
        })?;

        let mut user_fields = Map::new();
        let mut envelope = Map::new();
        for (k, v) in obj {
            if k == "_id" || k == "created_at" || k == "updated_at" || k == "version" {
                envelope.insert(k.clone(), v.clone());
            } else {
                user_fields.insert(k.clone(), v.clone());
            }
        }

        let plaintext = serde_json::to_vec(&Value::Object(user_fields))?;
        let ciphertext = encryptor.encrypt(&plaintext)?;
        envelope.insert("data".to_string(), Value::String(ciphertext));
        Ok(Value::Object(envelope))
    }

    fn decrypt_if_needed(&self, stored: &Value) -> Result<Value> {
        let Some(encryptor) = &self.encryptor else {
            return Ok(stored.clone());
        };
        let Some(data) = stored.get("data").and_then(|v| v.as_str()) else {
            // Not an encrypted envelope (e.g. predates `encrypt` being turned on).
            return Ok(stored.clone());
        };

        let plaintext = encryptor.decrypt(data)?;
        let user_fields: Value = serde_json::from_slice(&plaintext)?;

        let mut merged = user_fields.as_object().cloned().unwrap_or_default();
        for field in ["_id", "created_at", "updated_at", "version"] {
            if let Some(v) = stored.get(field) {
                merged.insert(field.to_string(), v.clone());
            }
        }
        Ok(Value::Object(merged))
    }

    // --- read path --------------------------------------------------------

    pub fn find(&self, filter: &Value, options: &FindOptions) -> Result<FindResult> {
        self.with_planner(|planner| planner.find(filter, options, &self.source()))
    }

    pub fn find_one(&self, filter: &Value) -> Result<Option<Value>> {
        self.with_planner(|planner| planner.find_one(filter, &self.source()))
    }

    /// Direct id lookup, bypassing the filter pipeline entirely.
    pub fn find_by_id(&self, id: &DocumentId) -> Option<Value> {
        self.load(id)
    }

    pub fn count(&self, filter: &Value) -> Result<usize> {
        Ok(self.find(filter, &FindOptions::new())?.total)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.storage.read().read_all(&self.name)?.is_empty())
    }

    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }

    // --- index / cache management ------------------------------------------

    pub fn create_index(&self, name: &str, fields: Vec<String>, unique: bool) -> Result<()> {
        let docs = self.storage.read().read_all(&self.name)?;
        let mut indexes = self.indexes.write();
        indexes.create_index(name, fields, unique);
        let index = indexes.get_mut(name).expect("just created");
        for doc in &docs {
            if let Some(id) = doc.get("_id").and_then(|v| v.as_str()) {
                let key = index.extract_key(doc);
                index.insert(key, DocumentId::from_string(id))?;
            }
        }
        Ok(())
    }

    pub fn drop_index(&self, name: &str) -> bool {
        if name == ID_INDEX {
            log_warn!("refusing to drop the reserved '_id' index on '{}'", self.name);
            return false;
        }
        self.indexes.write().drop_index(name).is_some()
    }

    pub fn list_indexes(&self) -> Vec<String> {
        self.indexes.read().list_names()
    }

    pub fn clear_cache(&self) {
        self.doc_cache.clear();
        self.query_cache.clear();
    }

    pub fn stats(&self) -> Result<CollectionStats> {
        Ok(CollectionStats {
            document_count: self.storage.read().read_all(&self.name)?.len(),
            index_count: self.indexes.read().list_names().len(),
            query_cache: self.query_cache.stats(),
        })
    }
}

fn doc_id(value: &Value) -> Result<DocumentId> {
    value
        .get("_id")
        .and_then(|v| v.as_str())
        .map(DocumentId::from_string)
        .ok_or_else(|| MongoLiteError::DocumentError("document is missing '_id'".to_string()))
}

/// Fold the equality constraints of an upsert's filter into the insert payload, so
/// `upsert({name: "Alice"}, {$set: {age: 30}})` creates `{name: "Alice", age: 30}`.
fn merge_filter_into_payload(payload: &mut Value, filter: &Value) {
    let Some(filter_obj) = filter.as_object() else {
        return;
    };
    let Some(payload_obj) = payload.as_object_mut() else {
        return;
    };
    for (field, value) in filter_obj {
        if field.starts_with('$') || value.is_object() {
            continue;
        }
        payload_obj.entry(field.clone()).or_insert_with(|| value.clone());
    }
}

/// Apply the ambient update-operator subset (`$set`, `$unset`, `$inc`) or, when the
/// update document carries no `$`-prefixed keys, treat it as a full-field merge
/// (shorthand for `$set` on every top-level key). Returns whether anything changed.
pub fn apply_update_operators(document: &mut Document, update: &Value) -> Result<bool> {
    let Some(obj) = update.as_object() else {
        return Err(MongoLiteError::InvalidQuery(
            "update document must be a JSON object".to_string(),
        ));
    };

    let has_operators = obj.keys().any(|k| k.starts_with('$'));
    if !has_operators {
        for (field, value) in obj {
            document.set_nested(field, value.clone());
        }
        return Ok(!obj.is_empty());
    }

    let mut changed = false;

    if let Some(Value::Object(set_fields)) = obj.get("$set") {
        for (field, value) in set_fields {
            document.set_nested(field, value.clone());
            changed = true;
        }
    }

    if let Some(Value::Object(unset_fields)) = obj.get("$unset") {
        for field in unset_fields.keys() {
            if document.remove_nested(field).is_some() {
                changed = true;
            }
        }
    }

    if let Some(Value::Object(inc_fields)) = obj.get("$inc") {
        for (field, delta) in inc_fields {
            let delta = delta.as_f64().ok_or_else(|| {
                MongoLiteError::InvalidQuery(format!("$inc amount for '{}' must be numeric", field))
            })?;
            let current = document.get(field).and_then(|v| v.as_f64()).unwrap_or(0.0);
            document.set_nested(field, serde_json::json!(current + delta));
            changed = true;
        }
    }

    for key in obj.keys() {
        if key.starts_with('$') && !matches!(key.as_str(), "$set" | "$unset" | "$inc") {
            return Err(MongoLiteError::InvalidQuery(format!(
                "unsupported update operator '{}'",
                key
            )));
        }
    }

    Ok(changed)
}
