// src/schema.rs
//! Schema validator: defaults -> required -> type -> constraints -> custom predicate,
//! dispatched through a `strict`/`warn`/`ignore` mode.

use crate::error::{MongoLiteError, Result};
use crate::log_warn;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaMode {
    Strict,
    Warn,
    Ignore,
}

impl Default for SchemaMode {
    fn default() -> Self {
        SchemaMode::Strict
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl SchemaType {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "string" => Some(Self::String),
            "number" | "integer" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            _ => None,
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            SchemaType::String => value.is_string(),
            SchemaType::Number => value.is_number(),
            SchemaType::Boolean => value.is_boolean(),
            SchemaType::Object => value.is_object(),
            SchemaType::Array => value.is_array(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Number => "number",
            SchemaType::Boolean => "boolean",
            SchemaType::Object => "object",
            SchemaType::Array => "array",
        }
    }
}

/// A single field's compiled constraints, applied in the order: type, min/max,
/// pattern, enum, then the custom predicate.
#[derive(Clone)]
pub struct PropertySchema {
    pub schema_type: SchemaType,
    pub default: Option<Value>,
    pub enum_values: Option<Vec<Value>>,
    pub pattern: Option<Regex>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub predicate: Option<Arc<dyn Fn(&Value) -> bool + Send + Sync>>,
    /// Declares this field should be indexed (with a uniqueness constraint, if `unique`
    /// is also set) when the schema is installed on a collection with `auto_index` on.
    pub index: bool,
    pub unique: bool,
}

impl std::fmt::Debug for PropertySchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertySchema")
            .field("schema_type", &self.schema_type)
            .field("default", &self.default)
            .field("enum_values", &self.enum_values)
            .field("has_pattern", &self.pattern.is_some())
            .field("min", &self.min)
            .field("max", &self.max)
            .field("min_items", &self.min_items)
            .field("max_items", &self.max_items)
            .field("has_predicate", &self.predicate.is_some())
            .field("index", &self.index)
            .field("unique", &self.unique)
            .finish()
    }
}

impl PropertySchema {
    pub fn new(schema_type: SchemaType) -> Self {
        Self {
            schema_type,
            default: None,
            enum_values: None,
            pattern: None,
            min: None,
            max: None,
            min_items: None,
            max_items: None,
            predicate: None,
            index: false,
            unique: false,
        }
    }
}

/// Preconfigured field descriptors for common formats. The validator itself never
/// special-cases these by name; they are just convenient `PropertySchema` factories.
pub mod templates {
    use super::{PropertySchema, SchemaType};

    pub fn email() -> PropertySchema {
        let mut s = PropertySchema::new(SchemaType::String);
        s.pattern = Some(regex::Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
        s
    }

    pub fn url() -> PropertySchema {
        let mut s = PropertySchema::new(SchemaType::String);
        s.pattern = Some(regex::Regex::new(r"^https?://[^\s]+$").unwrap());
        s
    }

    pub fn phone() -> PropertySchema {
        let mut s = PropertySchema::new(SchemaType::String);
        s.pattern = Some(regex::Regex::new(r"^\+?[0-9()\-\s]{7,20}$").unwrap());
        s
    }

    pub fn uuid() -> PropertySchema {
        let mut s = PropertySchema::new(SchemaType::String);
        s.pattern = Some(
            regex::Regex::new(
                r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
            )
            .unwrap(),
        );
        s
    }

    pub fn bounded_string(min_len: f64, max_len: f64) -> PropertySchema {
        let mut s = PropertySchema::new(SchemaType::String);
        s.min = Some(min_len);
        s.max = Some(max_len);
        s
    }

    pub fn bounded_number(min: f64, max: f64) -> PropertySchema {
        let mut s = PropertySchema::new(SchemaType::Number);
        s.min = Some(min);
        s.max = Some(max);
        s
    }
}

/// A compiled, ready-to-apply schema for a collection.
#[derive(Clone, Debug)]
pub struct CompiledSchema {
    pub mode: SchemaMode,
    pub(crate) required: Vec<String>,
    pub(crate) properties: HashMap<String, PropertySchema>,
}

impl CompiledSchema {
    pub fn from_value(schema: &Value) -> Result<Self> {
        Self::from_value_with_mode(schema, SchemaMode::Strict)
    }

    pub fn from_value_with_mode(schema: &Value, mode: SchemaMode) -> Result<Self> {
        let obj = schema.as_object().ok_or_else(|| {
            MongoLiteError::SchemaError("schema must be a JSON object".to_string())
        })?;

        if let Some(schema_type) = obj.get("type") {
            let type_str = schema_type.as_str().ok_or_else(|| {
                MongoLiteError::SchemaError("schema type must be a string".to_string())
            })?;
            if type_str != "object" {
                return Err(MongoLiteError::SchemaError(
                    "only object schemas are supported".to_string(),
                ));
            }
        }

        let mut required = Vec::new();
        if let Some(required_value) = obj.get("required") {
            let arr = required_value.as_array().ok_or_else(|| {
                MongoLiteError::SchemaError("required must be an array of field names".to_string())
            })?;
            for entry in arr {
                let field = entry.as_str().ok_or_else(|| {
                    MongoLiteError::SchemaError("required entries must be strings".to_string())
                })?;
                required.push(field.to_string());
            }
        }

        let mut properties = HashMap::new();
        if let Some(props) = obj.get("properties") {
            let props_obj = props.as_object().ok_or_else(|| {
                MongoLiteError::SchemaError("properties must be an object".to_string())
            })?;
            for (field, spec) in props_obj {
                let type_value = spec.get("type").ok_or_else(|| {
                    MongoLiteError::SchemaError(format!("property '{}' is missing a type", field))
                })?;
                let type_str = type_value.as_str().ok_or_else(|| {
                    MongoLiteError::SchemaError(format!(
                        "property '{}' type must be a string",
                        field
                    ))
                })?;
                let parsed_type = SchemaType::from_str(type_str).ok_or_else(|| {
                    MongoLiteError::SchemaError(format!(
                        "unsupported type '{}' for field '{}'",
                        type_str, field
                    ))
                })?;

                let mut prop_schema = PropertySchema::new(parsed_type);

                if let Some(default_value) = spec.get("default") {
                    prop_schema.default = Some(default_value.clone());
                }

                if let Some(enum_value) = spec.get("enum") {
                    let enum_arr = enum_value.as_array().ok_or_else(|| {
                        MongoLiteError::SchemaError(format!(
                            "property '{}' enum must be an array",
                            field
                        ))
                    })?;
                    prop_schema.enum_values = Some(enum_arr.clone());
                }

                if let Some(pattern_value) = spec.get("pattern") {
                    let pattern_str = pattern_value.as_str().ok_or_else(|| {
                        MongoLiteError::SchemaError(format!(
                            "property '{}' pattern must be a string",
                            field
                        ))
                    })?;
                    let regex = Regex::new(pattern_str).map_err(|e| {
                        MongoLiteError::SchemaError(format!(
                            "property '{}' has an invalid regex pattern: {}",
                            field, e
                        ))
                    })?;
                    prop_schema.pattern = Some(regex);
                }

                if let Some(min_value) = spec.get("min") {
                    prop_schema.min = min_value.as_f64();
                }
                if let Some(max_value) = spec.get("max") {
                    prop_schema.max = max_value.as_f64();
                }

                if let Some(min_value) = spec.get("minItems") {
                    let min = min_value.as_u64().ok_or_else(|| {
                        MongoLiteError::SchemaError(format!(
                            "property '{}' minItems must be a non-negative integer",
                            field
                        ))
                    })?;
                    prop_schema.min_items = Some(min as usize);
                }
                if let Some(max_value) = spec.get("maxItems") {
                    let max = max_value.as_u64().ok_or_else(|| {
                        MongoLiteError::SchemaError(format!(
                            "property '{}' maxItems must be a non-negative integer",
                            field
                        ))
                    })?;
                    prop_schema.max_items = Some(max as usize);
                }

                if let Some(unique_value) = spec.get("unique") {
                    prop_schema.unique = unique_value.as_bool().unwrap_or(false);
                }
                if let Some(index_value) = spec.get("index") {
                    prop_schema.index = index_value.as_bool().unwrap_or(false);
                }
                // A unique field is implicitly indexed.
                if prop_schema.unique {
                    prop_schema.index = true;
                }

                properties.insert(field.clone(), prop_schema);
            }
        }

        Ok(Self {
            mode,
            required,
            properties,
        })
    }

    /// Fields this schema declares `index` or `unique` on, as `(field, unique)` pairs —
    /// the caller (`Collection`) consults this to create the backing indexes when
    /// `auto_index` is on.
    pub fn indexed_fields(&self) -> Vec<(String, bool)> {
        let mut fields: Vec<(String, bool)> = self
            .properties
            .iter()
            .filter(|(_, prop)| prop.index || prop.unique)
            .map(|(field, prop)| (field.clone(), prop.unique))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        fields
    }

    /// Attach a custom predicate to an already-compiled field. Returns false from the
    /// predicate to reject the document.
    pub fn with_predicate(
        mut self,
        field: &str,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        if let Some(prop) = self.properties.get_mut(field) {
            prop.predicate = Some(Arc::new(predicate));
        }
        self
    }

    /// Apply defaults for any missing field that declares one. Mutates `value` in place.
    pub fn apply_defaults(&self, value: &mut Value) {
        let Some(obj) = value.as_object_mut() else {
            return;
        };
        for (field, prop) in &self.properties {
            if !obj.contains_key(field) {
                if let Some(default) = &prop.default {
                    obj.insert(field.clone(), default.clone());
                }
            }
        }
    }

    /// Validate `value`, honoring the mode: `strict` returns the first error, `warn`
    /// logs every violation and always succeeds, `ignore` skips type/constraint/pattern/
    /// enum/predicate checks (steps 3-5) but still enforces required fields (step 2).
    pub fn validate(&self, collection: &str, value: &Value) -> Result<()> {
        if self.mode == SchemaMode::Ignore {
            return self.check_required(value);
        }

        let result = self.check_required(value).and_then(|()| self.check_properties(value));
        match result {
            Ok(()) => Ok(()),
            Err(e) => match self.mode {
                SchemaMode::Strict => Err(e),
                SchemaMode::Warn => {
                    log_warn!("schema violation in '{}': {}", collection, e);
                    Ok(())
                }
                SchemaMode::Ignore => unreachable!(),
            },
        }
    }

    /// Step 2: every declared required field must be present. Runs regardless of mode.
    fn check_required(&self, value: &Value) -> Result<()> {
        let obj = value
            .as_object()
            .ok_or_else(|| MongoLiteError::SchemaError("document must be a JSON object".to_string()))?;

        for field in &self.required {
            if !obj.contains_key(field) {
                return Err(MongoLiteError::SchemaError(format!(
                    "missing required field '{}'",
                    field
                )));
            }
        }
        Ok(())
    }

    /// Steps 3-5: type, min/max/pattern/enum/array-size, then the custom predicate.
    /// Skipped entirely in `ignore` mode.
    fn check_properties(&self, value: &Value) -> Result<()> {
        let obj = value
            .as_object()
            .ok_or_else(|| MongoLiteError::SchemaError("document must be a JSON object".to_string()))?;

        for (field, prop) in &self.properties {
            let Some(field_value) = obj.get(field) else {
                continue;
            };

            if !prop.schema_type.matches(field_value) {
                return Err(MongoLiteError::SchemaError(format!(
                    "field '{}' expected type {}",
                    field,
                    prop.schema_type.as_str()
                )));
            }

            if let Some(min) = prop.min {
                let actual = match field_value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => Some(s.chars().count() as f64),
                    _ => None,
                };
                if let Some(actual) = actual {
                    if actual < min {
                        return Err(MongoLiteError::SchemaError(format!(
                            "field '{}' is below the minimum of {}",
                            field, min
                        )));
                    }
                }
            }

            if let Some(max) = prop.max {
                let actual = match field_value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => Some(s.chars().count() as f64),
                    _ => None,
                };
                if let Some(actual) = actual {
                    if actual > max {
                        return Err(MongoLiteError::SchemaError(format!(
                            "field '{}' exceeds the maximum of {}",
                            field, max
                        )));
                    }
                }
            }

            if let Some(pattern) = &prop.pattern {
                if let Some(s) = field_value.as_str() {
                    if !pattern.is_match(s) {
                        return Err(MongoLiteError::SchemaError(format!(
                            "field '{}' does not match the required pattern",
                            field
                        )));
                    }
                }
            }

            if let Some(enum_values) = &prop.enum_values {
                if !enum_values.contains(field_value) {
                    return Err(MongoLiteError::SchemaError(format!(
                        "field '{}' value is not among the allowed enum values",
                        field
                    )));
                }
            }

            if let Some(arr) = field_value.as_array() {
                if let Some(min) = prop.min_items {
                    if arr.len() < min {
                        return Err(MongoLiteError::SchemaError(format!(
                            "field '{}' has {} items, minimum required is {}",
                            field,
                            arr.len(),
                            min
                        )));
                    }
                }
                if let Some(max) = prop.max_items {
                    if arr.len() > max {
                        return Err(MongoLiteError::SchemaError(format!(
                            "field '{}' has {} items, maximum allowed is {}",
                            field,
                            arr.len(),
                            max
                        )));
                    }
                }
            }

            if let Some(predicate) = &prop.predicate {
                if !predicate(field_value) {
                    return Err(MongoLiteError::SchemaError(format!(
                        "field '{}' failed custom validation",
                        field
                    )));
                }
            }
        }

        Ok(())
    }
}
