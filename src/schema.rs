//! Typed builder for the output schemas declared on structured requests.
//!
//! Schemas are assembled from Rust values and rendered to a JSON-schema
//! `serde_json::Value` only at the gateway boundary.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::gateway::ResponseSchema;

/// Column names containing any of these substrings are typed as numbers.
static NUMERIC_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)id|year|age|count|quantity|number|price|value|score|rate|amount")
        .expect("numeric hint pattern is valid")
});

/// A declared output type.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    String,
    Number,
    Integer,
    Boolean,
    Array(Box<Schema>),
    Object(ObjectSchema),
}

impl Schema {
    pub fn array(item: Schema) -> Self {
        Schema::Array(Box::new(item))
    }

    /// Render as a JSON-schema fragment.
    pub fn to_json(&self) -> Value {
        match self {
            Schema::String => json!({ "type": "string" }),
            Schema::Number => json!({ "type": "number" }),
            Schema::Integer => json!({ "type": "integer" }),
            Schema::Boolean => json!({ "type": "boolean" }),
            Schema::Array(item) => json!({ "type": "array", "items": item.to_json() }),
            Schema::Object(obj) => obj.to_json(),
        }
    }
}

/// An object with ordered, named properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    properties: Vec<(String, Schema)>,
    required: Vec<String>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property the response must contain.
    pub fn required(mut self, name: impl Into<String>, schema: Schema) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.properties.push((name, schema));
        self
    }

    /// Add a property the response may omit.
    pub fn optional(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.properties.push((name.into(), schema));
        self
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(name, _)| name.as_str())
    }

    pub fn property(&self, name: &str) -> Option<&Schema> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, schema)| schema)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    pub fn to_json(&self) -> Value {
        let mut properties = Map::new();
        for (name, schema) in &self.properties {
            properties.insert(name.clone(), schema.to_json());
        }
        json!({
            "type": "object",
            "properties": Value::Object(properties),
            "required": self.required,
            "additionalProperties": false,
        })
    }

    /// Wrap as a named response schema for a [`crate::gateway::ChatRequest`].
    pub fn into_response_schema(self, name: &str) -> ResponseSchema {
        ResponseSchema::new(name, self.to_json())
    }
}

// =============================================================================
// Feature rows
// =============================================================================

/// Value type of one test-bench feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeatureType {
    String,
    Number,
}

impl FeatureType {
    pub fn for_column(column: &str) -> Self {
        if is_numeric_hint(column) {
            FeatureType::Number
        } else {
            FeatureType::String
        }
    }

    fn schema(self) -> Schema {
        match self {
            FeatureType::String => Schema::String,
            FeatureType::Number => Schema::Number,
        }
    }
}

/// Whether a column name suggests numeric values.
pub fn is_numeric_hint(column: &str) -> bool {
    NUMERIC_HINT.is_match(column)
}

/// Schema for a synthetic feature row: one required property per feature.
pub fn feature_row_schema<'a>(features: impl IntoIterator<Item = &'a str>) -> ObjectSchema {
    features
        .into_iter()
        .fold(ObjectSchema::new(), |schema, name| {
            schema.required(name, FeatureType::for_column(name).schema())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_hint_matches_substrings_case_insensitively() {
        assert!(is_numeric_hint("Price"));
        assert!(is_numeric_hint("customer_id"));
        assert!(is_numeric_hint("TOTAL_AMOUNT"));
        assert!(is_numeric_hint("Heart Rate"));
        assert!(is_numeric_hint("Page Views Count"));
        assert!(!is_numeric_hint("Category"));
        assert!(!is_numeric_hint("region"));
        assert!(!is_numeric_hint("date"));
    }

    #[test]
    fn feature_types_follow_hint() {
        assert_eq!(FeatureType::for_column("Price"), FeatureType::Number);
        assert_eq!(FeatureType::for_column("Category"), FeatureType::String);
    }

    #[test]
    fn feature_row_schema_requires_every_feature() {
        let schema = feature_row_schema(["Price", "Category"]);
        assert_eq!(schema.property("Price"), Some(&Schema::Number));
        assert_eq!(schema.property("Category"), Some(&Schema::String));
        assert!(schema.is_required("Price"));
        assert!(schema.is_required("Category"));

        let rendered = schema.to_json();
        assert_eq!(rendered["properties"]["Price"]["type"], "number");
        assert_eq!(rendered["required"], json!(["Price", "Category"]));
        assert_eq!(rendered["additionalProperties"], false);
    }

    #[test]
    fn nested_schema_renders() {
        let schema = ObjectSchema::new()
            .required("metrics", Schema::Object(ObjectSchema::new().required("MSE", Schema::Number)))
            .optional("grid", Schema::array(Schema::array(Schema::Integer)));
        let rendered = schema.to_json();
        assert_eq!(rendered["properties"]["metrics"]["properties"]["MSE"]["type"], "number");
        assert_eq!(rendered["properties"]["grid"]["items"]["items"]["type"], "integer");
        assert_eq!(rendered["required"], json!(["metrics"]));
    }
}
