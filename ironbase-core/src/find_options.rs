// ironbase-core/src/find_options.rs
// Find query options: projection, sort, limit, skip

use crate::document::is_metadata_field;
use crate::error::{MongoLiteError, Result};
use crate::value_utils::{compare_values_with_none, get_nested_value};
use serde_json::Value;
use std::collections::HashMap;

/// Options for find queries
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Projection: field → 1 (include) or 0 (exclude)
    /// Special case: metadata fields may be excluded in include mode.
    pub projection: Option<HashMap<String, i32>>,

    /// Sort: [(field, direction)], direction: 1 (asc) or -1 (desc)
    pub sort: Option<Vec<(String, i32)>>,

    /// Limit: maximum number of documents to return
    pub limit: Option<usize>,

    /// Skip: number of documents to skip (for pagination)
    pub skip: Option<usize>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the projection. Rejects a mix of 1s and 0s across non-metadata fields
    /// as a query-shape error, per the wire contract.
    pub fn with_projection(mut self, projection: HashMap<String, i32>) -> Result<Self> {
        validate_projection(&projection)?;
        self.projection = Some(projection);
        Ok(self)
    }

    pub fn with_sort(mut self, sort: Vec<(String, i32)>) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }
}

/// Reject a projection that mixes inclusion and exclusion across non-metadata fields.
pub fn validate_projection(projection: &HashMap<String, i32>) -> Result<()> {
    let has_inclusions = projection
        .iter()
        .any(|(field, &action)| action == 1 && !is_metadata_field(field));
    let has_non_metadata_exclusions = projection
        .iter()
        .any(|(field, &action)| action == 0 && !is_metadata_field(field));

    if has_inclusions && has_non_metadata_exclusions {
        return Err(MongoLiteError::InvalidQuery(
            "projection cannot mix inclusion and exclusion of non-metadata fields".to_string(),
        ));
    }
    Ok(())
}

/// Apply projection to a document.
/// Supports dot notation for nested fields (e.g., "address.city").
pub fn apply_projection(doc: &Value, projection: &HashMap<String, i32>) -> Value {
    if projection.is_empty() {
        return doc.clone();
    }

    let has_inclusions = projection
        .iter()
        .any(|(field, &action)| action == 1 && !is_metadata_field(field));
    let include_mode = has_inclusions;

    if let Value::Object(obj) = doc {
        let mut result = serde_json::Map::new();

        if include_mode {
            for (field, &action) in projection {
                if action == 1 {
                    if let Some(value) = get_nested_value(doc, field) {
                        result.insert(field.clone(), value.clone());
                    }
                }
            }

            // Reserved fields are included only if explicitly named with 1.
            for field in ["_id", "created_at", "updated_at", "version"] {
                if projection.get(field) == Some(&1) {
                    if let Some(value) = obj.get(field) {
                        result.insert(field.to_string(), value.clone());
                    }
                }
            }
        } else {
            for (key, value) in obj {
                if projection.get(key) != Some(&0) {
                    result.insert(key.clone(), value.clone());
                }
            }
        }

        Value::Object(result)
    } else {
        doc.clone()
    }
}

/// Apply sort to documents.
/// Supports dot notation for nested fields (e.g., "address.city").
pub fn apply_sort(docs: &mut [Value], sort: &[(String, i32)]) {
    if sort.is_empty() {
        return;
    }

    docs.sort_by(|a, b| {
        for (field, direction) in sort {
            let val_a = get_nested_value(a, field);
            let val_b = get_nested_value(b, field);

            let cmp = compare_values_with_none(val_a, val_b);

            if cmp != std::cmp::Ordering::Equal {
                return if *direction == 1 { cmp } else { cmp.reverse() };
            }
        }
        std::cmp::Ordering::Equal
    });
}

/// Apply skip then limit to documents.
pub fn apply_limit_skip(docs: Vec<Value>, limit: Option<usize>, skip: Option<usize>) -> Vec<Value> {
    let skip_count = skip.unwrap_or(0);

    if skip_count >= docs.len() {
        return Vec::new();
    }

    let start = skip_count;
    let end = if let Some(limit_count) = limit {
        (start + limit_count).min(docs.len())
    } else {
        docs.len()
    };

    docs[start..end].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_projection_include_mode() {
        let doc = json!({"name": "Alice", "age": 30, "city": "NYC", "_id": "x"});
        let projection = HashMap::from([("name".to_string(), 1), ("age".to_string(), 1)]);

        let result = apply_projection(&doc, &projection);
        assert!(result.get("name").is_some());
        assert!(result.get("age").is_some());
        assert!(result.get("_id").is_none()); // not explicitly named
        assert!(result.get("city").is_none());
    }

    #[test]
    fn test_projection_include_explicit_id() {
        let doc = json!({"name": "Alice", "_id": "x"});
        let projection = HashMap::from([("name".to_string(), 1), ("_id".to_string(), 1)]);

        let result = apply_projection(&doc, &projection);
        assert!(result.get("_id").is_some());
    }

    #[test]
    fn test_projection_exclude_mode() {
        let doc = json!({"name": "Alice", "age": 30, "city": "NYC", "_id": "x"});
        let projection = HashMap::from([("city".to_string(), 0)]);

        let result = apply_projection(&doc, &projection);
        assert!(result.get("name").is_some());
        assert!(result.get("age").is_some());
        assert!(result.get("_id").is_some());
        assert!(result.get("city").is_none());
    }

    #[test]
    fn test_mixed_projection_rejected() {
        let projection = HashMap::from([("name".to_string(), 1), ("city".to_string(), 0)]);
        let err = validate_projection(&projection).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::QueryShape);
    }

    #[test]
    fn test_mixed_projection_with_metadata_exclusion_allowed() {
        // _id:0 alongside other inclusions is the conventional Mongo idiom and is not
        // a "non-metadata" exclusion, so it must not trip the rejection.
        let projection = HashMap::from([("name".to_string(), 1), ("_id".to_string(), 0)]);
        assert!(validate_projection(&projection).is_ok());
    }

    #[test]
    fn test_sort_single_field() {
        let mut docs = vec![json!({"age": 30}), json!({"age": 25}), json!({"age": 35})];
        apply_sort(&mut docs, &[("age".to_string(), 1)]);
        assert_eq!(docs[0]["age"], 25);
        assert_eq!(docs[1]["age"], 30);
        assert_eq!(docs[2]["age"], 35);
    }

    #[test]
    fn test_sort_descending() {
        let mut docs = vec![json!({"age": 30}), json!({"age": 25}), json!({"age": 35})];
        apply_sort(&mut docs, &[("age".to_string(), -1)]);
        assert_eq!(docs[0]["age"], 35);
        assert_eq!(docs[2]["age"], 25);
    }

    #[test]
    fn test_sort_multi_field() {
        let mut docs = vec![
            json!({"age": 30, "name": "Bob"}),
            json!({"age": 25, "name": "Alice"}),
            json!({"age": 30, "name": "Carol"}),
        ];
        apply_sort(
            &mut docs,
            &[("age".to_string(), 1), ("name".to_string(), -1)],
        );
        assert_eq!(docs[0]["name"], "Alice");
        assert_eq!(docs[1]["name"], "Carol");
        assert_eq!(docs[2]["name"], "Bob");
    }

    #[test]
    fn test_limit_skip() {
        let docs = vec![
            json!({"n": 1}),
            json!({"n": 2}),
            json!({"n": 3}),
            json!({"n": 4}),
            json!({"n": 5}),
        ];
        let result = apply_limit_skip(docs, Some(2), Some(1));
        assert_eq!(result.len(), 2);
        assert_eq!(result[0]["n"], 2);
        assert_eq!(result[1]["n"], 3);
    }

    #[test]
    fn test_skip_beyond_length() {
        let docs = vec![json!({"n": 1}), json!({"n": 2})];
        let result = apply_limit_skip(docs, None, Some(10));
        assert_eq!(result.len(), 0);
    }

    #[test]
    fn test_projection_dot_notation() {
        let doc = json!({
            "_id": "x",
            "name": "Alice",
            "address": {"city": "NYC", "street": "123 Main St"}
        });
        let projection = HashMap::from([("address.city".to_string(), 1), ("name".to_string(), 1)]);
        let result = apply_projection(&doc, &projection);
        assert!(result.get("_id").is_none());
        assert!(result.get("name").is_some());
        assert_eq!(result.get("address.city"), Some(&json!("NYC")));
        assert!(result.get("address").is_none());
    }

    #[test]
    fn test_sort_dot_notation_with_missing_field() {
        let mut docs = vec![
            json!({"name": "Alice", "address": {"zip": 10000}}),
            json!({"name": "Bob"}),
            json!({"name": "Charlie", "address": {"zip": 30000}}),
        ];
        apply_sort(&mut docs, &[("address.zip".to_string(), 1)]);
        assert_eq!(docs[0]["name"], "Bob");
        assert_eq!(docs[1]["name"], "Alice");
        assert_eq!(docs[2]["name"], "Charlie");
    }
}
