// src/query_builder.rs
//! Chainable filter/options builder over a [`Collection`](crate::collection::Collection),
//! in the same fluent style as the teacher's `FindOptions::with_*` methods, generalized to
//! also accumulate a filter tree instead of only options.

use crate::collection::Collection;
use crate::error::Result;
use crate::find_options::FindOptions;
use crate::query_planner::FindResult;
use serde_json::{Map, Value};

pub struct QueryBuilder<'a> {
    collection: &'a Collection,
    filter: Map<String, Value>,
    and_clauses: Vec<Value>,
    or_clauses: Vec<Value>,
    options: FindOptions,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(collection: &'a Collection) -> Self {
        QueryBuilder {
            collection,
            filter: Map::new(),
            and_clauses: Vec::new(),
            or_clauses: Vec::new(),
            options: FindOptions::new(),
        }
    }

    /// Top-level constraint: `where_eq("age", 30)` or `where_op("age", "$gt", 18)`.
    pub fn where_eq(mut self, field: &str, value: Value) -> Self {
        self.filter.insert(field.to_string(), value);
        self
    }

    pub fn where_op(mut self, field: &str, op: &str, value: Value) -> Self {
        let mut ops = Map::new();
        ops.insert(op.to_string(), value);
        self.filter.insert(field.to_string(), Value::Object(ops));
        self
    }

    /// Append a clause to the filter's `$and` conjunction list.
    pub fn and(mut self, field: &str, op: &str, value: Value) -> Self {
        self.and_clauses.push(operator_clause(field, op, value));
        self
    }

    /// Append a clause to the filter's `$or` disjunction list.
    pub fn or(mut self, field: &str, op: &str, value: Value) -> Self {
        self.or_clauses.push(operator_clause(field, op, value));
        self
    }

    pub fn sort(mut self, field: &str, direction: i32) -> Self {
        self.options.sort.get_or_insert_with(Vec::new).push((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.options = self.options.with_limit(limit);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.options = self.options.with_skip(skip);
        self
    }

    pub fn project(mut self, projection: std::collections::HashMap<String, i32>) -> Result<Self> {
        self.options = self.options.with_projection(projection)?;
        Ok(self)
    }

    fn build_filter(&self) -> Value {
        let mut filter = self.filter.clone();
        if !self.and_clauses.is_empty() {
            filter.insert("$and".to_string(), Value::Array(self.and_clauses.clone()));
        }
        if !self.or_clauses.is_empty() {
            filter.insert("$or".to_string(), Value::Array(self.or_clauses.clone()));
        }
        Value::Object(filter)
    }

    pub fn execute(self) -> Result<FindResult> {
        let filter = self.build_filter();
        self.collection.find(&filter, &self.options)
    }

    pub fn find_one(self) -> Result<Option<Value>> {
        let filter = self.build_filter();
        self.collection.find_one(&filter)
    }

    pub fn count(self) -> Result<usize> {
        Ok(self.execute()?.total)
    }

    pub fn exists(self) -> Result<bool> {
        Ok(self.find_one()?.is_some())
    }

    pub fn find_one_and_update(self, update: Value) -> Result<Option<Value>> {
        let filter = self.build_filter();
        self.collection.update_one(&filter, &update)
    }

    pub fn find_one_and_delete(self) -> Result<Option<Value>> {
        let filter = self.build_filter();
        self.collection.delete_one(&filter)
    }
}

fn operator_clause(field: &str, op: &str, value: Value) -> Value {
    let mut ops = Map::new();
    ops.insert(op.to_string(), value);
    let mut clause = Map::new();
    clause.insert(field.to_string(), Value::Object(ops));
    Value::Object(clause)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::config::CollectionConfig;
    use serde_json::json;

    fn test_collection() -> Collection {
        Collection::new_in_memory("people".to_string(), CollectionConfig::default())
    }

    #[test]
    fn where_eq_builds_a_plain_equality_filter() {
        let coll = test_collection();
        coll.insert_one(json!({"name": "Alice", "age": 30})).unwrap();
        coll.insert_one(json!({"name": "Bob", "age": 40})).unwrap();

        let result = QueryBuilder::new(&coll).where_eq("name", json!("Alice")).execute().unwrap();
        assert_eq!(result.total, 1);
    }

    #[test]
    fn and_clauses_combine_with_conjunction() {
        let coll = test_collection();
        coll.insert_one(json!({"name": "Alice", "age": 30})).unwrap();
        coll.insert_one(json!({"name": "Alice", "age": 50})).unwrap();

        let result = QueryBuilder::new(&coll)
            .where_eq("name", json!("Alice"))
            .and("age", "$gte", json!(40))
            .execute()
            .unwrap();
        assert_eq!(result.total, 1);
    }

    #[test]
    fn count_and_exists_delegate_to_execute_and_find_one() {
        let coll = test_collection();
        coll.insert_one(json!({"name": "Alice"})).unwrap();

        assert_eq!(QueryBuilder::new(&coll).where_eq("name", json!("Alice")).count().unwrap(), 1);
        assert!(QueryBuilder::new(&coll).where_eq("name", json!("Alice")).exists().unwrap());
        assert!(!QueryBuilder::new(&coll).where_eq("name", json!("Ghost")).exists().unwrap());
    }

    #[test]
    fn find_one_and_update_applies_and_returns_the_updated_document() {
        let coll = test_collection();
        coll.insert_one(json!({"name": "Alice", "age": 30})).unwrap();

        let updated = QueryBuilder::new(&coll)
            .where_eq("name", json!("Alice"))
            .find_one_and_update(json!({"age": 31}))
            .unwrap()
            .unwrap();
        assert_eq!(updated["age"], 31);
    }

    #[test]
    fn find_one_and_delete_removes_the_document() {
        let coll = test_collection();
        coll.insert_one(json!({"name": "Alice"})).unwrap();

        let deleted = QueryBuilder::new(&coll)
            .where_eq("name", json!("Alice"))
            .find_one_and_delete()
            .unwrap();
        assert!(deleted.is_some());
        assert!(QueryBuilder::new(&coll).where_eq("name", json!("Alice")).find_one().unwrap().is_none());
    }
}
