// src/query/operators.rs
//! Query operator registry: the Strategy pattern, one struct per operator, dispatched
//! through `matches_filter`. Operator set is the closed wire contract: `$eq $ne $gt
//! $gte $lt $lte $in $nin $and $or $nor $not $exists $regex`.

use crate::document::Document;
use crate::error::{MongoLiteError, Result};
use crate::value_utils::compare_values;
use lazy_static::lazy_static;
use lru::LruCache;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;

lazy_static! {
    /// Compiled-regex cache, keyed by pattern; avoids recompiling on every `$regex` match.
    static ref REGEX_CACHE: Mutex<LruCache<String, Regex>> =
        Mutex::new(LruCache::new(NonZeroUsize::new(100).unwrap()));
}

fn get_or_compile_regex(pattern: &str) -> Result<Regex> {
    {
        let mut cache = REGEX_CACHE.lock().unwrap();
        if let Some(regex) = cache.get(pattern) {
            return Ok(regex.clone());
        }
    }

    let regex = Regex::new(pattern).map_err(|e| {
        MongoLiteError::InvalidQuery(format!("invalid regex pattern '{}': {}", pattern, e))
    })?;

    REGEX_CACHE.lock().unwrap().put(pattern.to_string(), regex.clone());
    Ok(regex)
}

fn regex_match(text: &str, pattern: &str) -> Result<bool> {
    Ok(get_or_compile_regex(pattern)?.is_match(text))
}

/// Uniform interface every wire-contract operator implements.
pub trait OperatorMatcher: Send + Sync {
    fn name(&self) -> &'static str;

    /// `doc_value` is `None` when the field is absent. `document` is only `Some` for
    /// top-level logical operators that need to recurse into `matches_filter`.
    fn matches(
        &self,
        doc_value: Option<&Value>,
        filter_value: &Value,
        document: Option<&Document>,
    ) -> Result<bool>;
}

pub struct EqOperator;

impl OperatorMatcher for EqOperator {
    fn name(&self) -> &'static str {
        "$eq"
    }

    fn matches(
        &self,
        doc_value: Option<&Value>,
        filter_value: &Value,
        _document: Option<&Document>,
    ) -> Result<bool> {
        match doc_value {
            None => Ok(false),
            Some(v) => {
                if v == filter_value {
                    return Ok(true);
                }
                if let Value::Array(arr) = v {
                    Ok(arr.iter().any(|elem| elem == filter_value))
                } else {
                    Ok(false)
                }
            }
        }
    }
}

pub struct NeOperator;

impl OperatorMatcher for NeOperator {
    fn name(&self) -> &'static str {
        "$ne"
    }

    fn matches(
        &self,
        doc_value: Option<&Value>,
        filter_value: &Value,
        _document: Option<&Document>,
    ) -> Result<bool> {
        match doc_value {
            None => Ok(true),
            Some(v) => {
                if v == filter_value {
                    return Ok(false);
                }
                if let Value::Array(arr) = v {
                    Ok(!arr.iter().any(|elem| elem == filter_value))
                } else {
                    Ok(true)
                }
            }
        }
    }
}

pub struct GtOperator;

impl OperatorMatcher for GtOperator {
    fn name(&self) -> &'static str {
        "$gt"
    }

    fn matches(
        &self,
        doc_value: Option<&Value>,
        filter_value: &Value,
        _document: Option<&Document>,
    ) -> Result<bool> {
        compare_with_predicate(doc_value, filter_value, |ord| ord == std::cmp::Ordering::Greater)
    }
}

pub struct GteOperator;

impl OperatorMatcher for GteOperator {
    fn name(&self) -> &'static str {
        "$gte"
    }

    fn matches(
        &self,
        doc_value: Option<&Value>,
        filter_value: &Value,
        _document: Option<&Document>,
    ) -> Result<bool> {
        compare_with_predicate(doc_value, filter_value, |ord| {
            matches!(ord, std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
        })
    }
}

pub struct LtOperator;

impl OperatorMatcher for LtOperator {
    fn name(&self) -> &'static str {
        "$lt"
    }

    fn matches(
        &self,
        doc_value: Option<&Value>,
        filter_value: &Value,
        _document: Option<&Document>,
    ) -> Result<bool> {
        compare_with_predicate(doc_value, filter_value, |ord| ord == std::cmp::Ordering::Less)
    }
}

pub struct LteOperator;

impl OperatorMatcher for LteOperator {
    fn name(&self) -> &'static str {
        "$lte"
    }

    fn matches(
        &self,
        doc_value: Option<&Value>,
        filter_value: &Value,
        _document: Option<&Document>,
    ) -> Result<bool> {
        compare_with_predicate(doc_value, filter_value, |ord| {
            matches!(ord, std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
        })
    }
}

pub struct InOperator;

impl OperatorMatcher for InOperator {
    fn name(&self) -> &'static str {
        "$in"
    }

    fn matches(
        &self,
        doc_value: Option<&Value>,
        filter_value: &Value,
        _document: Option<&Document>,
    ) -> Result<bool> {
        match doc_value {
            None => Ok(false),
            Some(v) => {
                if let Value::Array(filter_arr) = filter_value {
                    if filter_arr.contains(v) {
                        return Ok(true);
                    }
                    if let Value::Array(doc_arr) = v {
                        Ok(doc_arr.iter().any(|elem| filter_arr.contains(elem)))
                    } else {
                        Ok(false)
                    }
                } else {
                    Err(MongoLiteError::InvalidQuery("$in operator requires an array".to_string()))
                }
            }
        }
    }
}

pub struct NinOperator;

impl OperatorMatcher for NinOperator {
    fn name(&self) -> &'static str {
        "$nin"
    }

    fn matches(
        &self,
        doc_value: Option<&Value>,
        filter_value: &Value,
        _document: Option<&Document>,
    ) -> Result<bool> {
        if let Value::Array(filter_arr) = filter_value {
            match doc_value {
                None => Ok(true),
                Some(v) => {
                    if filter_arr.contains(v) {
                        return Ok(false);
                    }
                    if let Value::Array(doc_arr) = v {
                        Ok(!doc_arr.iter().any(|elem| filter_arr.contains(elem)))
                    } else {
                        Ok(true)
                    }
                }
            }
        } else {
            Err(MongoLiteError::InvalidQuery("$nin operator requires an array".to_string()))
        }
    }
}

pub struct ExistsOperator;

impl OperatorMatcher for ExistsOperator {
    fn name(&self) -> &'static str {
        "$exists"
    }

    fn matches(
        &self,
        doc_value: Option<&Value>,
        filter_value: &Value,
        _document: Option<&Document>,
    ) -> Result<bool> {
        if let Value::Bool(should_exist) = filter_value {
            Ok(doc_value.is_some() == *should_exist)
        } else {
            Err(MongoLiteError::InvalidQuery("$exists operator requires a boolean".to_string()))
        }
    }
}

pub struct RegexOperator;

impl OperatorMatcher for RegexOperator {
    fn name(&self) -> &'static str {
        "$regex"
    }

    fn matches(
        &self,
        doc_value: Option<&Value>,
        filter_value: &Value,
        _document: Option<&Document>,
    ) -> Result<bool> {
        match doc_value {
            None => Ok(false),
            Some(Value::String(s)) => {
                if let Value::String(pattern) = filter_value {
                    regex_match(s, pattern)
                } else {
                    Err(MongoLiteError::InvalidQuery(
                        "$regex operator requires a string pattern".to_string(),
                    ))
                }
            }
            Some(Value::Array(arr)) => {
                if let Value::String(pattern) = filter_value {
                    for elem in arr {
                        if let Value::String(s) = elem {
                            if regex_match(s, pattern)? {
                                return Ok(true);
                            }
                        }
                    }
                    Ok(false)
                } else {
                    Err(MongoLiteError::InvalidQuery(
                        "$regex operator requires a string pattern".to_string(),
                    ))
                }
            }
            Some(_) => Ok(false),
        }
    }
}

pub struct AndOperator;

impl OperatorMatcher for AndOperator {
    fn name(&self) -> &'static str {
        "$and"
    }

    fn matches(
        &self,
        _doc_value: Option<&Value>,
        filter_value: &Value,
        document: Option<&Document>,
    ) -> Result<bool> {
        let doc = document.ok_or_else(|| {
            MongoLiteError::InvalidQuery("$and operator requires document context".to_string())
        })?;

        if let Value::Array(conditions) = filter_value {
            for condition in conditions {
                if !matches_filter(doc, condition)? {
                    return Ok(false);
                }
            }
            Ok(true)
        } else {
            Err(MongoLiteError::InvalidQuery("$and operator requires an array".to_string()))
        }
    }
}

pub struct OrOperator;

impl OperatorMatcher for OrOperator {
    fn name(&self) -> &'static str {
        "$or"
    }

    fn matches(
        &self,
        _doc_value: Option<&Value>,
        filter_value: &Value,
        document: Option<&Document>,
    ) -> Result<bool> {
        let doc = document.ok_or_else(|| {
            MongoLiteError::InvalidQuery("$or operator requires document context".to_string())
        })?;

        if let Value::Array(conditions) = filter_value {
            for condition in conditions {
                if matches_filter(doc, condition)? {
                    return Ok(true);
                }
            }
            Ok(false)
        } else {
            Err(MongoLiteError::InvalidQuery("$or operator requires an array".to_string()))
        }
    }
}

pub struct NorOperator;

impl OperatorMatcher for NorOperator {
    fn name(&self) -> &'static str {
        "$nor"
    }

    fn matches(
        &self,
        _doc_value: Option<&Value>,
        filter_value: &Value,
        document: Option<&Document>,
    ) -> Result<bool> {
        let doc = document.ok_or_else(|| {
            MongoLiteError::InvalidQuery("$nor operator requires document context".to_string())
        })?;

        if let Value::Array(conditions) = filter_value {
            for condition in conditions {
                if matches_filter(doc, condition)? {
                    return Ok(false);
                }
            }
            Ok(true)
        } else {
            Err(MongoLiteError::InvalidQuery("$nor operator requires an array".to_string()))
        }
    }
}

pub struct NotOperator;

impl OperatorMatcher for NotOperator {
    fn name(&self) -> &'static str {
        "$not"
    }

    fn matches(
        &self,
        doc_value: Option<&Value>,
        filter_value: &Value,
        document: Option<&Document>,
    ) -> Result<bool> {
        if document.is_some() {
            let result = matches_filter_value(doc_value, filter_value, document)?;
            Ok(!result)
        } else {
            Err(MongoLiteError::InvalidQuery("$not operator requires document context".to_string()))
        }
    }
}

lazy_static! {
    pub static ref OPERATOR_REGISTRY: HashMap<&'static str, Box<dyn OperatorMatcher>> = {
        let mut registry: HashMap<&'static str, Box<dyn OperatorMatcher>> = HashMap::new();

        registry.insert("$eq", Box::new(EqOperator));
        registry.insert("$ne", Box::new(NeOperator));
        registry.insert("$gt", Box::new(GtOperator));
        registry.insert("$gte", Box::new(GteOperator));
        registry.insert("$lt", Box::new(LtOperator));
        registry.insert("$lte", Box::new(LteOperator));

        registry.insert("$in", Box::new(InOperator));
        registry.insert("$nin", Box::new(NinOperator));

        registry.insert("$exists", Box::new(ExistsOperator));
        registry.insert("$regex", Box::new(RegexOperator));

        registry.insert("$and", Box::new(AndOperator));
        registry.insert("$or", Box::new(OrOperator));
        registry.insert("$nor", Box::new(NorOperator));
        registry.insert("$not", Box::new(NotOperator));

        registry
    };
}

fn compare_with_predicate<F>(doc_value: Option<&Value>, filter_value: &Value, predicate: F) -> Result<bool>
where
    F: Fn(std::cmp::Ordering) -> bool,
{
    match doc_value {
        None => Ok(false),
        Some(v) => {
            if let Some(ordering) = compare_values(v, filter_value) {
                if predicate(ordering) {
                    return Ok(true);
                }
            }
            if let Value::Array(arr) = v {
                Ok(arr
                    .iter()
                    .any(|elem| compare_values(elem, filter_value).map(&predicate).unwrap_or(false)))
            } else {
                Ok(false)
            }
        }
    }
}

/// Evaluate a single field's filter value (used by `$not` to recurse into the inner
/// operator object without re-entering the top-level `matches_filter` loop).
fn matches_filter_value(
    doc_value: Option<&Value>,
    filter_value: &Value,
    document: Option<&Document>,
) -> Result<bool> {
    if let Value::Object(filter_obj) = filter_value {
        for (op_name, op_value) in filter_obj {
            if op_name.starts_with('$') {
                if let Some(operator) = OPERATOR_REGISTRY.get(op_name.as_str()) {
                    if !operator.matches(doc_value, op_value, document)? {
                        return Ok(false);
                    }
                } else {
                    return Err(MongoLiteError::InvalidQuery(format!("unknown operator: {}", op_name)));
                }
            } else {
                return Err(MongoLiteError::InvalidQuery("unexpected field in filter value".to_string()));
            }
        }
        Ok(true)
    } else {
        Ok(doc_value == Some(filter_value))
    }
}

/// Evaluate `filter` against `document`: empty filter matches everything; top-level
/// `$and/$or/$nor` keys dispatch to their operators with document context; everything
/// else is a field-level condition, either an operator object or an implicit `$eq`.
pub fn matches_filter(document: &Document, filter: &Value) -> Result<bool> {
    if filter.as_object().map(|o| o.is_empty()).unwrap_or(false) {
        return Ok(true);
    }

    let filter_obj = filter
        .as_object()
        .ok_or_else(|| MongoLiteError::InvalidQuery("filter must be an object".to_string()))?;

    for (key, value) in filter_obj {
        if key.starts_with('$') {
            if let Some(operator) = OPERATOR_REGISTRY.get(key.as_str()) {
                if !operator.matches(None, value, Some(document))? {
                    return Ok(false);
                }
            } else {
                return Err(MongoLiteError::InvalidQuery(format!("unknown operator: {}", key)));
            }
        } else {
            let doc_value = document.get(key);

            if let Value::Object(condition_obj) = value {
                for (op_name, op_value) in condition_obj {
                    if op_name.starts_with('$') {
                        if let Some(operator) = OPERATOR_REGISTRY.get(op_name.as_str()) {
                            if !operator.matches(doc_value.as_ref(), op_value, Some(document))? {
                                return Ok(false);
                            }
                        } else {
                            return Err(MongoLiteError::InvalidQuery(format!(
                                "unknown operator: {}",
                                op_name
                            )));
                        }
                    } else {
                        return Err(MongoLiteError::InvalidQuery(
                            "unexpected non-operator key in field condition".to_string(),
                        ));
                    }
                }
            } else if !EqOperator.matches(doc_value.as_ref(), value, Some(document))? {
                return Ok(false);
            }
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentId;
    use serde_json::json;
    use std::collections::HashMap as StdHashMap;

    fn create_test_document(fields: Vec<(&str, Value)>) -> Document {
        let mut field_map = StdHashMap::new();
        for (k, v) in fields {
            field_map.insert(k.to_string(), v);
        }
        Document::new(DocumentId::new(), field_map)
    }

    #[test]
    fn registry_contains_exactly_the_wire_contract_operators() {
        let expected = [
            "$eq", "$ne", "$gt", "$gte", "$lt", "$lte", "$in", "$nin", "$and", "$or", "$nor",
            "$not", "$exists", "$regex",
        ];
        assert_eq!(OPERATOR_REGISTRY.len(), expected.len());
        for op in expected {
            assert!(OPERATOR_REGISTRY.contains_key(op), "missing operator {}", op);
        }
    }

    #[test]
    fn gte_and_lt_operators() {
        assert!(GteOperator.matches(Some(&json!(5)), &json!(5), None).unwrap());
        assert!(!GteOperator.matches(None, &json!(5), None).unwrap());
        assert!(LtOperator.matches(Some(&json!(3)), &json!(5), None).unwrap());
        assert!(!LtOperator.matches(Some(&json!(5)), &json!(5), None).unwrap());
    }

    #[test]
    fn ne_treats_missing_field_as_not_equal() {
        assert!(NeOperator.matches(None, &json!(5), None).unwrap());
        assert!(!NeOperator.matches(Some(&json!(5)), &json!(5), None).unwrap());
    }

    #[test]
    fn in_and_nin_against_array_elements() {
        assert!(InOperator
            .matches(Some(&json!("b")), &json!(["a", "b", "c"]), None)
            .unwrap());
        assert!(NinOperator.matches(None, &json!(["a", "b"]), None).unwrap());
        assert!(!NinOperator
            .matches(Some(&json!("a")), &json!(["a", "b"]), None)
            .unwrap());
    }

    #[test]
    fn exists_requires_boolean_filter_value() {
        assert!(ExistsOperator.matches(Some(&json!(1)), &json!(true), None).unwrap());
        assert!(ExistsOperator.matches(None, &json!(false), None).unwrap());
        assert!(ExistsOperator.matches(Some(&json!(1)), &json!("x"), None).is_err());
    }

    #[test]
    fn regex_matches_strings() {
        assert!(RegexOperator
            .matches(Some(&json!("hello world")), &json!("^hello"), None)
            .unwrap());
        assert!(!RegexOperator
            .matches(Some(&json!("goodbye")), &json!("^hello"), None)
            .unwrap());
    }

    #[test]
    fn matches_filter_implicit_eq_and_top_level_and() {
        let doc = create_test_document(vec![("age", json!(25)), ("city", json!("NYC"))]);
        assert!(matches_filter(&doc, &json!({"city": "NYC"})).unwrap());
        assert!(matches_filter(
            &doc,
            &json!({"$and": [{"age": {"$gte": 18}}, {"city": "NYC"}]})
        )
        .unwrap());
    }

    #[test]
    fn matches_filter_or_nor_not() {
        let doc = create_test_document(vec![("age", json!(15))]);
        assert!(matches_filter(&doc, &json!({"$or": [{"age": {"$lt": 18}}, {"age": {"$gt": 65}}]})).unwrap());
        assert!(!matches_filter(&doc, &json!({"$nor": [{"age": {"$lt": 18}}]})).unwrap());
        assert!(matches_filter(&doc, &json!({"age": {"$not": {"$gte": 18}}})).unwrap());
    }

    #[test]
    fn matches_filter_rejects_unknown_operator() {
        let doc = create_test_document(vec![]);
        assert!(matches_filter(&doc, &json!({"age": {"$foo": 1}})).is_err());
    }

    #[test]
    fn matches_filter_empty_matches_everything() {
        let doc = create_test_document(vec![("x", json!(1))]);
        assert!(matches_filter(&doc, &json!({})).unwrap());
    }
}
