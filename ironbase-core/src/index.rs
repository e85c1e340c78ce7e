// src/index.rs
//! Index Catalog: per-collection mapping `index_name -> (index_key -> set of document ids)`,
//! plus a derived `field -> {index_names}` lookup and a lazily built sorted vector per
//! index used to serve numeric range scans.

use crate::document::DocumentId;
use crate::error::{MongoLiteError, Result};
use crate::value_utils::get_nested_value;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Canonical, totally-ordered representation of an indexable value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat),
    String(String),
    /// Compound key for multi-field indexes (e.g., ["country", "city"]).
    Compound(Vec<IndexKey>),
}

/// `f64` wrapper giving a total order (NaN sorts greatest), so `IndexKey` can live in
/// a `HashMap`/`BTreeMap` key position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}
impl Eq for OrderedFloat {}

impl std::hash::Hash for OrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for OrderedFloat {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedFloat {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self.0.is_nan(), other.0.is_nan()) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            (false, false) => self
                .0
                .partial_cmp(&other.0)
                .unwrap_or(std::cmp::Ordering::Equal),
        }
    }
}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use IndexKey::*;
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Null, _) => std::cmp::Ordering::Less,
            (_, Null) => std::cmp::Ordering::Greater,

            (Bool(a), Bool(b)) => a.cmp(b),
            (Bool(_), _) => std::cmp::Ordering::Less,
            (_, Bool(_)) => std::cmp::Ordering::Greater,

            (Int(a), Int(b)) => a.cmp(b),
            (Int(_), _) => std::cmp::Ordering::Less,
            (_, Int(_)) => std::cmp::Ordering::Greater,

            (Float(a), Float(b)) => a.cmp(b),
            (Float(_), _) => std::cmp::Ordering::Less,
            (_, Float(_)) => std::cmp::Ordering::Greater,

            (String(a), String(b)) => a.cmp(b),
            (String(_), Compound(_)) => std::cmp::Ordering::Less,

            (Compound(a), Compound(b)) => a.cmp(b),
            (Compound(_), _) => std::cmp::Ordering::Greater,
        }
    }
}

impl From<&Value> for IndexKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => IndexKey::Null,
            Value::Bool(b) => IndexKey::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    IndexKey::Int(i)
                } else if let Some(f) = n.as_f64() {
                    IndexKey::Float(OrderedFloat(f))
                } else {
                    IndexKey::Null
                }
            }
            Value::String(s) => IndexKey::String(s.clone()),
            _ => IndexKey::Null, // arrays/objects are not indexable scalars
        }
    }
}

impl IndexKey {
    /// True for keys that participate in a numeric ordering (range scans are meaningful).
    pub fn is_numeric(&self) -> bool {
        matches!(self, IndexKey::Int(_) | IndexKey::Float(_))
    }
}

/// A single named index: one or more covered fields, mapping key -> set of document ids.
pub struct Index {
    pub name: String,
    pub fields: Vec<String>,
    pub unique: bool,
    entries: HashMap<IndexKey, HashSet<DocumentId>>,
    /// Lazily built `(key, ids)` pairs in ascending key order, used for range scans.
    /// Dropped (set to `None`) on any mutation; rebuilt on the next range query.
    /// Interior-mutable so `range_scan` can build it through a shared `&Index` —
    /// the query planner only ever holds shared borrows from the catalog.
    sorted_cache: RwLock<Option<Vec<(IndexKey, Vec<DocumentId>)>>>,
}

impl Index {
    pub fn new(name: impl Into<String>, fields: Vec<String>, unique: bool) -> Self {
        Index {
            name: name.into(),
            fields,
            unique,
            entries: HashMap::new(),
            sorted_cache: RwLock::new(None),
        }
    }

    pub fn is_composite(&self) -> bool {
        self.fields.len() > 1
    }

    /// Extract this index's key from a document, honoring dot-notation field paths.
    pub fn extract_key(&self, doc: &Value) -> IndexKey {
        if self.fields.len() == 1 {
            get_nested_value(doc, &self.fields[0])
                .map(IndexKey::from)
                .unwrap_or(IndexKey::Null)
        } else {
            let parts = self
                .fields
                .iter()
                .map(|f| {
                    get_nested_value(doc, f)
                        .map(IndexKey::from)
                        .unwrap_or(IndexKey::Null)
                })
                .collect();
            IndexKey::Compound(parts)
        }
    }

    pub fn insert(&mut self, key: IndexKey, id: DocumentId) -> Result<()> {
        if self.unique {
            if let Some(existing) = self.entries.get(&key) {
                if !existing.is_empty() && !existing.contains(&id) {
                    return Err(MongoLiteError::IndexError(format!(
                        "unique constraint violated on index '{}'",
                        self.name
                    )));
                }
            }
        }
        self.entries.entry(key).or_default().insert(id);
        *self.sorted_cache.write() = None;
        Ok(())
    }

    pub fn remove(&mut self, key: &IndexKey, id: &DocumentId) {
        if let Some(set) = self.entries.get_mut(key) {
            set.remove(id);
            if set.is_empty() {
                self.entries.remove(key);
            }
        }
        *self.sorted_cache.write() = None;
    }

    pub fn lookup(&self, key: &IndexKey) -> HashSet<DocumentId> {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    /// Lookup by composite-key prefix: any entry whose leading fields equal `prefix`.
    pub fn lookup_prefix(&self, prefix: &[IndexKey]) -> HashSet<DocumentId> {
        let mut result = HashSet::new();
        for (key, ids) in &self.entries {
            if let IndexKey::Compound(parts) = key {
                if parts.len() >= prefix.len() && &parts[..prefix.len()] == prefix {
                    result.extend(ids.iter().cloned());
                }
            }
        }
        result
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lazily materialize (or reuse) the ascending-key sorted view used for range scans.
    fn ensure_sorted(&self) {
        if self.sorted_cache.read().is_none() {
            let mut pairs: Vec<(IndexKey, Vec<DocumentId>)> = self
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.iter().cloned().collect()))
                .collect();
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            *self.sorted_cache.write() = Some(pairs);
        }
    }

    /// Range scan over the numeric keys in `[lower, upper)` semantics chosen by the caller
    /// via inclusive/exclusive bound predicates. Builds the sorted cache on first use.
    pub fn range_scan(
        &self,
        lower: Option<&IndexKey>,
        lower_inclusive: bool,
        upper: Option<&IndexKey>,
        upper_inclusive: bool,
    ) -> HashSet<DocumentId> {
        self.ensure_sorted();
        let cache = self.sorted_cache.read();
        let pairs = cache.as_ref().unwrap();
        let mut result = HashSet::new();
        for (key, ids) in pairs {
            if let Some(lo) = lower {
                match key.cmp(lo) {
                    std::cmp::Ordering::Less => continue,
                    std::cmp::Ordering::Equal if !lower_inclusive => continue,
                    _ => {}
                }
            }
            if let Some(hi) = upper {
                match key.cmp(hi) {
                    std::cmp::Ordering::Greater => break,
                    std::cmp::Ordering::Equal if !upper_inclusive => break,
                    _ => {}
                }
            }
            result.extend(ids.iter().cloned());
        }
        result
    }

    /// True if the sorted cache is currently materialized (used by tests verifying the
    /// "build once, reuse" behavior in scenario S3).
    pub fn has_sorted_cache(&self) -> bool {
        self.sorted_cache.read().is_some()
    }
}

/// Per-collection collection of named indexes, plus the derived `field -> index names` lookup.
#[derive(Default)]
pub struct IndexCatalog {
    indexes: HashMap<String, Index>,
    field_to_indexes: HashMap<String, HashSet<String>>,
}

impl IndexCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_index(&mut self, name: impl Into<String>, fields: Vec<String>, unique: bool) {
        let name = name.into();
        for f in &fields {
            self.field_to_indexes
                .entry(f.clone())
                .or_default()
                .insert(name.clone());
        }
        self.indexes.insert(name.clone(), Index::new(name, fields, unique));
    }

    pub fn drop_index(&mut self, name: &str) -> Option<Index> {
        let removed = self.indexes.remove(name);
        if removed.is_some() {
            for names in self.field_to_indexes.values_mut() {
                names.remove(name);
            }
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<&Index> {
        self.indexes.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Index> {
        self.indexes.get_mut(name)
    }

    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.keys().cloned().collect();
        names.sort();
        names
    }

    /// All index names that cover `field` (as a single-field index or as part of a composite).
    pub fn indexes_for_field(&self, field: &str) -> Vec<String> {
        self.field_to_indexes
            .get(field)
            .map(|s| {
                let mut v: Vec<String> = s.iter().cloned().collect();
                v.sort();
                v
            })
            .unwrap_or_default()
    }

    /// Insert `doc`'s contribution into every index.
    pub fn index_document(&mut self, doc: &Value, id: &DocumentId) -> Result<()> {
        for index in self.indexes.values_mut() {
            let key = index.extract_key(doc);
            index.insert(key, id.clone())?;
        }
        Ok(())
    }

    /// Remove `doc`'s contribution from every index (used on delete, and on update's
    /// "remove old key" half).
    pub fn deindex_document(&mut self, doc: &Value, id: &DocumentId) {
        for index in self.indexes.values_mut() {
            let key = index.extract_key(doc);
            index.remove(&key, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(n: &str) -> DocumentId {
        DocumentId::from_string(n)
    }

    #[test]
    fn ordering_null_lt_bool_lt_int_lt_float_lt_string() {
        assert!(IndexKey::Null < IndexKey::Bool(false));
        assert!(IndexKey::Bool(true) < IndexKey::Int(0));
        assert!(IndexKey::Int(100) < IndexKey::Float(OrderedFloat(0.1)));
        assert!(IndexKey::Float(OrderedFloat(9.9)) < IndexKey::String("a".into()));
    }

    #[test]
    fn ordered_float_nan_sorts_greatest() {
        let nan = OrderedFloat(f64::NAN);
        let one = OrderedFloat(1.0);
        assert!(one < nan);
    }

    #[test]
    fn insert_and_lookup_multi_valued() {
        let mut idx = Index::new("by_dept", vec!["department".into()], false);
        idx.insert(IndexKey::String("Eng".into()), id("1")).unwrap();
        idx.insert(IndexKey::String("Eng".into()), id("2")).unwrap();
        idx.insert(IndexKey::String("Sales".into()), id("3")).unwrap();

        let eng = idx.lookup(&IndexKey::String("Eng".into()));
        assert_eq!(eng.len(), 2);
        assert!(eng.contains(&id("1")) && eng.contains(&id("2")));
    }

    #[test]
    fn unique_constraint_rejects_second_distinct_id() {
        let mut idx = Index::new("uniq_email", vec!["email".into()], true);
        idx.insert(IndexKey::String("a@b".into()), id("1")).unwrap();
        let err = idx.insert(IndexKey::String("a@b".into()), id("2"));
        assert!(err.is_err());
    }

    #[test]
    fn remove_drops_empty_entry() {
        let mut idx = Index::new("by_dept", vec!["department".into()], false);
        let key = IndexKey::String("Eng".into());
        idx.insert(key.clone(), id("1")).unwrap();
        idx.remove(&key, &id("1"));
        assert!(idx.is_empty());
    }

    #[test]
    fn range_scan_builds_cache_once_and_reuses() {
        let mut idx = Index::new("by_age", vec!["age".into()], false);
        for age in 0..100i64 {
            idx.insert(IndexKey::Int(age), id(&age.to_string())).unwrap();
        }
        assert!(!idx.has_sorted_cache());
        let r1 = idx.range_scan(
            Some(&IndexKey::Int(25)),
            true,
            Some(&IndexKey::Int(30)),
            false,
        );
        assert!(idx.has_sorted_cache());
        assert_eq!(r1.len(), 5); // 25,26,27,28,29

        // Second identical scan reuses the cache (no mutation happened in between).
        let r2 = idx.range_scan(
            Some(&IndexKey::Int(25)),
            true,
            Some(&IndexKey::Int(30)),
            false,
        );
        assert_eq!(r1, r2);
    }

    #[test]
    fn mutation_invalidates_sorted_cache() {
        let mut idx = Index::new("by_age", vec!["age".into()], false);
        idx.insert(IndexKey::Int(1), id("a")).unwrap();
        let _ = idx.range_scan(None, true, None, true);
        assert!(idx.has_sorted_cache());
        idx.insert(IndexKey::Int(2), id("b")).unwrap();
        assert!(!idx.has_sorted_cache());
    }

    #[test]
    fn composite_key_extraction_and_lookup() {
        let mut idx = Index::new(
            "by_country_city",
            vec!["country".into(), "city".into()],
            false,
        );
        let doc = json!({"country": "HU", "city": "Budapest"});
        let key = idx.extract_key(&doc);
        assert_eq!(
            key,
            IndexKey::Compound(vec![
                IndexKey::String("HU".into()),
                IndexKey::String("Budapest".into())
            ])
        );
        idx.insert(key.clone(), id("1")).unwrap();
        assert_eq!(idx.lookup(&key).len(), 1);
    }

    #[test]
    fn composite_prefix_lookup() {
        let mut idx = Index::new(
            "by_country_city",
            vec!["country".into(), "city".into()],
            false,
        );
        idx.insert(
            IndexKey::Compound(vec![
                IndexKey::String("HU".into()),
                IndexKey::String("Budapest".into()),
            ]),
            id("1"),
        )
        .unwrap();
        idx.insert(
            IndexKey::Compound(vec![
                IndexKey::String("HU".into()),
                IndexKey::String("Szeged".into()),
            ]),
            id("2"),
        )
        .unwrap();
        idx.insert(
            IndexKey::Compound(vec![
                IndexKey::String("US".into()),
                IndexKey::String("Reno".into()),
            ]),
            id("3"),
        )
        .unwrap();

        let hu = idx.lookup_prefix(&[IndexKey::String("HU".into())]);
        assert_eq!(hu.len(), 2);
    }

    #[test]
    fn catalog_tracks_field_to_index_mapping() {
        let mut cat = IndexCatalog::new();
        cat.create_index("by_dept", vec!["department".into()], false);
        cat.create_index(
            "by_country_city",
            vec!["country".into(), "city".into()],
            false,
        );

        assert_eq!(cat.indexes_for_field("department"), vec!["by_dept"]);
        assert_eq!(
            cat.indexes_for_field("city"),
            vec!["by_country_city".to_string()]
        );
        assert!(cat.indexes_for_field("unknown").is_empty());
    }

    #[test]
    fn catalog_index_and_deindex_document() {
        let mut cat = IndexCatalog::new();
        cat.create_index("by_dept", vec!["department".into()], false);
        let doc = json!({"department": "Eng"});
        let doc_id = id("1");
        cat.index_document(&doc, &doc_id).unwrap();
        assert_eq!(
            cat.get("by_dept")
                .unwrap()
                .lookup(&IndexKey::String("Eng".into()))
                .len(),
            1
        );
        cat.deindex_document(&doc, &doc_id);
        assert!(cat.get("by_dept").unwrap().is_empty());
    }

    #[test]
    fn drop_index_removes_field_mapping() {
        let mut cat = IndexCatalog::new();
        cat.create_index("by_dept", vec!["department".into()], false);
        cat.drop_index("by_dept");
        assert!(cat.get("by_dept").is_none());
        assert!(cat.indexes_for_field("department").is_empty());
    }
}
