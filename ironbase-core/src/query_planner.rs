// src/query_planner.rs
//! The find pipeline: fingerprint/cache probe, index-assisted candidate resolution,
//! residual filtering, sort, skip/limit, projection, cache store. Grounded on the
//! index-selection idiom in `collection_core/mod.rs` (`collect_doc_ids_with_options`),
//! generalized to the multi-valued index catalog and serving the full wire contract.

use crate::document::{Document, DocumentId};
use crate::find_options::{apply_limit_skip, apply_projection, apply_sort, FindOptions};
use crate::index::{IndexCatalog, IndexKey};
use crate::query::fingerprint;
use crate::query::operators::matches_filter;
use crate::query_cache::QueryCache;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct FindResult {
    pub documents: Vec<Value>,
    pub total: usize,
    pub has_more: bool,
}

/// Anything the planner can load candidate documents from: the document cache first,
/// storage second. Implemented by `Collection`'s internal `CollectionSource`.
pub trait DocumentSource {
    fn load(&self, id: &DocumentId) -> Option<Value>;
    fn all_ids(&self) -> Vec<DocumentId>;
}

pub struct QueryPlanner<'a> {
    pub collection: &'a str,
    pub index_catalog: &'a IndexCatalog,
    pub query_cache: &'a QueryCache,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(collection: &'a str, index_catalog: &'a IndexCatalog, query_cache: &'a QueryCache) -> Self {
        QueryPlanner {
            collection,
            index_catalog,
            query_cache,
        }
    }

    pub fn find(
        &self,
        filter: &Value,
        options: &FindOptions,
        source: &impl DocumentSource,
    ) -> crate::error::Result<FindResult> {
        let generation = self.query_cache.generation(self.collection);
        let fp = fingerprint::build(self.collection, generation, filter, options);

        if let Some(cached) = self.query_cache.get(&fp) {
            return Ok(cached);
        }

        let filter_obj = filter.as_object();
        let filter_is_empty = filter_obj.map(|o| o.is_empty()).unwrap_or(false);

        let result = if filter_is_empty && options.limit.is_some() {
            self.fast_path_empty_filter(options, source)
        } else {
            self.full_pipeline(filter, options, source)
        }?;

        self.query_cache.set(fp, result.clone());
        Ok(result)
    }

    pub fn find_one(&self, filter: &Value, source: &impl DocumentSource) -> crate::error::Result<Option<Value>> {
        let options = FindOptions::new().with_limit(1);
        let result = self.find(filter, &options, source)?;
        Ok(result.documents.into_iter().next())
    }

    fn fast_path_empty_filter(
        &self,
        options: &FindOptions,
        source: &impl DocumentSource,
    ) -> crate::error::Result<FindResult> {
        let ids = source.all_ids();
        let total = ids.len();
        let skip = options.skip.unwrap_or(0);
        let limit = options.limit.unwrap();

        let mut docs: Vec<Value> = ids
            .into_iter()
            .skip(skip)
            .take(limit)
            .filter_map(|id| source.load(&id))
            .collect();

        if let Some(sort) = &options.sort {
            apply_sort(&mut docs, sort);
        }
        if let Some(projection) = &options.projection {
            docs = docs.iter().map(|d| apply_projection(d, projection)).collect();
        }

        Ok(FindResult {
            has_more: total > skip + docs.len(),
            documents: docs,
            total,
        })
    }

    fn full_pipeline(
        &self,
        filter: &Value,
        options: &FindOptions,
        source: &impl DocumentSource,
    ) -> crate::error::Result<FindResult> {
        let candidates = self.resolve_candidates(filter);

        let loaded: Vec<(DocumentId, Value)> = match &candidates {
            Some(ids) => ids.iter().filter_map(|id| source.load(id).map(|v| (id.clone(), v))).collect(),
            None => source
                .all_ids()
                .into_iter()
                .filter_map(|id| source.load(&id).map(|v| (id, v)))
                .collect(),
        };

        if candidates.as_ref().map(|c| c.is_empty()).unwrap_or(false) {
            return Ok(FindResult {
                documents: Vec::new(),
                total: 0,
                has_more: false,
            });
        }

        let mut survivors: Vec<Value> = Vec::new();
        for (_, doc_value) in &loaded {
            let doc = Document::from_value(doc_value)?;
            if matches_filter(&doc, filter)? {
                survivors.push(doc_value.clone());
            }
        }

        let total = survivors.len();

        let mut ordered = survivors;
        if let Some(sort) = &options.sort {
            apply_sort(&mut ordered, sort);
        }

        let skip = options.skip.unwrap_or(0);
        let returned = apply_limit_skip(ordered, options.limit, options.skip);
        let has_more = total > skip + returned.len();

        let projected = if let Some(projection) = &options.projection {
            returned.iter().map(|d| apply_projection(d, projection)).collect()
        } else {
            returned
        };

        Ok(FindResult {
            documents: projected,
            total,
            has_more,
        })
    }

    /// Index-assisted candidate resolution: intersect per-field id sets. Returns
    /// `None` when no field in the filter contributed an index constraint (fall back
    /// to full scan). A field whose value can't be served by its index (e.g. `$regex`)
    /// simply contributes nothing — it does not void pruning from other fields in the
    /// same filter.
    fn resolve_candidates(&self, filter: &Value) -> Option<HashSet<DocumentId>> {
        let filter_obj = filter.as_object()?;
        let mut candidates: Option<HashSet<DocumentId>> = None;

        for (field, value) in filter_obj {
            if field.starts_with('$') {
                continue;
            }

            let index_names = self.index_catalog.indexes_for_field(field);
            let Some(index_name) = index_names.first() else {
                continue;
            };
            let Some(index) = self.index_catalog.get(index_name) else {
                continue;
            };

            let field_ids = if index.is_composite() {
                Some(index.lookup_prefix(&[IndexKey::from(value)]))
            } else {
                self.resolve_field_ids(index, value)
            };
            let Some(field_ids) = field_ids else {
                continue;
            };

            candidates = Some(match candidates {
                None => field_ids,
                Some(existing) => existing.intersection(&field_ids).cloned().collect(),
            });
        }

        candidates
    }

    fn resolve_field_ids(
        &self,
        index: &crate::index::Index,
        value: &Value,
    ) -> Option<HashSet<DocumentId>> {
        match value {
            Value::Object(ops) => {
                if let Some(eq_val) = ops.get("$eq") {
                    return Some(index.lookup(&IndexKey::from(eq_val)));
                }
                if let Some(Value::Array(values)) = ops.get("$in") {
                    let mut result = HashSet::new();
                    for v in values {
                        result.extend(index.lookup(&IndexKey::from(v)));
                    }
                    return Some(result);
                }
                // Range bounds: only contribute if the index is numeric-ordered.
                let lower = ops.get("$gte").map(|v| (IndexKey::from(v), true)).or_else(|| {
                    ops.get("$gt").map(|v| (IndexKey::from(v), false))
                });
                let upper = ops.get("$lte").map(|v| (IndexKey::from(v), true)).or_else(|| {
                    ops.get("$lt").map(|v| (IndexKey::from(v), false))
                });
                if lower.is_some() || upper.is_some() {
                    let numeric = lower.as_ref().map(|(k, _)| k.is_numeric()).unwrap_or(true)
                        && upper.as_ref().map(|(k, _)| k.is_numeric()).unwrap_or(true);
                    if numeric {
                        let (lower_key, lower_inclusive) = match &lower {
                            Some((k, inc)) => (Some(k), *inc),
                            None => (None, false),
                        };
                        let (upper_key, upper_inclusive) = match &upper {
                            Some((k, inc)) => (Some(k), *inc),
                            None => (None, false),
                        };
                        return Some(index.range_scan(lower_key, lower_inclusive, upper_key, upper_inclusive));
                    }
                }
                // $ne, $nin, $regex, $exists: index cannot contribute.
                None
            }
            scalar => Some(index.lookup(&IndexKey::from(scalar))),
        }
    }
}
