// src/query/fingerprint.rs
//! Canonical string fingerprint for a query: filter key/value pairs in sorted key
//! order, plus a delimited suffix for limit/skip/sort/projection and the owning
//! collection's write-generation counter. Two queries differing only in irrelevant
//! key order must fingerprint identically; a generation bump invalidates every
//! fingerprint computed against the old generation without an eager sweep.

use crate::find_options::FindOptions;
use serde_json::Value;

pub fn build(collection: &str, generation: u64, filter: &Value, options: &FindOptions) -> String {
    let mut out = String::new();
    out.push_str(collection);
    out.push('#');
    out.push_str(&generation.to_string());
    out.push('|');
    out.push_str(&canonical_filter(filter));

    out.push_str("|limit=");
    out.push_str(&options.limit.map(|l| l.to_string()).unwrap_or_default());

    out.push_str("|skip=");
    out.push_str(&options.skip.map(|s| s.to_string()).unwrap_or_default());

    out.push_str("|sort=");
    if let Some(sort) = &options.sort {
        let parts: Vec<String> = sort.iter().map(|(f, d)| format!("{}:{}", f, d)).collect();
        out.push_str(&parts.join(","));
    }

    out.push_str("|proj=");
    if let Some(proj) = &options.projection {
        let mut keys: Vec<&String> = proj.keys().collect();
        keys.sort();
        let parts: Vec<String> = keys
            .iter()
            .map(|k| format!("{}:{}", k, proj[*k]))
            .collect();
        out.push_str(&parts.join(","));
    }

    out
}

/// Canonical string form of a filter: object keys sorted recursively, values
/// rendered through `serde_json`'s stable structural serialization.
fn canonical_filter(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .iter()
                .map(|k| format!("{}:{}", k, canonical_filter(&map[*k])))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonical_filter).collect();
            format!("[{}]", parts.join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_affect_fingerprint() {
        let a = json!({"age": {"$gte": 25}, "active": true});
        let b = json!({"active": true, "age": {"$gte": 25}});
        let opts = FindOptions::new();
        assert_eq!(build("users", 0, &a, &opts), build("users", 0, &b, &opts));
    }

    #[test]
    fn generation_bump_changes_fingerprint() {
        let filter = json!({"active": true});
        let opts = FindOptions::new();
        assert_ne!(
            build("users", 0, &filter, &opts),
            build("users", 1, &filter, &opts)
        );
    }

    #[test]
    fn different_collections_fingerprint_differently() {
        let filter = json!({});
        let opts = FindOptions::new();
        assert_ne!(
            build("users", 0, &filter, &opts),
            build("posts", 0, &filter, &opts)
        );
    }

    #[test]
    fn limit_skip_sort_projection_are_part_of_the_fingerprint() {
        let filter = json!({});
        let opts_a = FindOptions::new().with_limit(10);
        let opts_b = FindOptions::new().with_limit(20);
        assert_ne!(
            build("users", 0, &filter, &opts_a),
            build("users", 0, &filter, &opts_b)
        );
    }
}
