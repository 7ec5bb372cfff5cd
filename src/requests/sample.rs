//! Synthetic test-bench rows.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::dataset::{data_rows, feature_columns};
use crate::prompts::SAMPLE_ROW;
use crate::schema::feature_row_schema;

use super::{GenerativeClient, Operation, RequestError};

/// Data rows embedded as context (rows 2-4 of the file).
const CONTEXT_ROWS: usize = 3;

/// One generated feature value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Number(n) => write!(f, "{n}"),
            FeatureValue::Text(s) => f.write_str(s),
        }
    }
}

impl FeatureValue {
    /// Lenient conversion: numbers and strings map directly, booleans are
    /// stringified, null and nested values are dropped.
    fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(FeatureValue::Number(n)),
            Value::String(s) => Some(FeatureValue::Text(s)),
            Value::Bool(b) => Some(FeatureValue::Text(b.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// Feature name to generated value, in header order.
pub type FeatureRow = IndexMap<String, FeatureValue>;

/// Keep only `features`, in their order.
fn select_features(mut raw: IndexMap<String, Value>, features: &[&str]) -> FeatureRow {
    let mut row = FeatureRow::with_capacity(features.len());
    for name in features {
        if let Some(value) = raw.shift_remove(*name).and_then(FeatureValue::from_json) {
            row.insert((*name).to_string(), value);
        }
    }
    if !raw.is_empty() {
        debug!(
            dropped = ?raw.keys().collect::<Vec<_>>(),
            "sample row carried keys outside the feature set"
        );
    }
    row
}

impl GenerativeClient {
    /// Generate one plausible row of feature values, excluding `target`.
    pub async fn generate_sample_row(
        &self,
        columns: &[String],
        raw_content: &str,
        target: &str,
    ) -> Result<FeatureRow, RequestError> {
        let features: Vec<&str> = feature_columns(columns, target).collect();

        let column_list = columns.join(", ");
        let rows = data_rows(raw_content, CONTEXT_ROWS);
        let feature_list = features.join(", ");
        let prompt = SAMPLE_ROW.render(&[
            ("columns", &column_list),
            ("rows", &rows),
            ("features", &feature_list),
            ("target", target),
        ]);

        let schema = feature_row_schema(features.iter().copied());
        let raw: IndexMap<String, Value> = self
            .complete_structured(
                Operation::GenerateSampleRow,
                prompt,
                schema.into_response_schema("sample_row"),
            )
            .await?;
        Ok(select_features(raw, &features))
    }
}
