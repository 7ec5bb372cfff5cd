//! Synthetic performance metrics.
//!
//! The numbers are illustrative artifacts produced by the service. Nothing
//! here checks them against data.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::classifier::TaskCategory;
use crate::prompts::{METRICS_CLASSIFICATION, METRICS_REGRESSION};
use crate::schema::{ObjectSchema, Schema};

use super::{GenerativeClient, Operation, RequestError};

const CLASSIFICATION_METRICS: &[&str] = &["Accuracy", "Precision", "Recall", "F1-Score"];
const REGRESSION_METRICS: &[&str] = &["R-squared", "MSE", "MAE"];

/// A single metric: usually a number, occasionally a formatted string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Number(n) => write!(f, "{n:.4}"),
            MetricValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub metrics: IndexMap<String, MetricValue>,
    /// `[[TN, FP], [FN, TP]]`, classification only.
    #[serde(default)]
    pub confusion_matrix: Option<[[u64; 2]; 2]>,
}

fn metrics_schema(category: TaskCategory) -> ObjectSchema {
    let names = match category {
        TaskCategory::Classification => CLASSIFICATION_METRICS,
        TaskCategory::Regression | TaskCategory::Other => REGRESSION_METRICS,
    };
    let metrics = names
        .iter()
        .fold(ObjectSchema::new(), |schema, name| schema.required(*name, Schema::Number));

    let schema = ObjectSchema::new().required("metrics", Schema::Object(metrics));
    match category {
        TaskCategory::Classification => schema.required(
            "confusionMatrix",
            Schema::array(Schema::array(Schema::Integer)),
        ),
        _ => schema,
    }
}

impl GenerativeClient {
    pub async fn generate_metrics(
        &self,
        model: &str,
        goal: &str,
        category: TaskCategory,
    ) -> Result<MetricsReport, RequestError> {
        let template = match category {
            TaskCategory::Classification => METRICS_CLASSIFICATION,
            TaskCategory::Regression | TaskCategory::Other => METRICS_REGRESSION,
        };
        let prompt = template.render(&[("model", model), ("goal", goal)]);

        let mut report: MetricsReport = self
            .complete_structured(
                Operation::GenerateMetrics,
                prompt,
                metrics_schema(category).into_response_schema("performance_metrics"),
            )
            .await?;

        if category != TaskCategory::Classification {
            report.confusion_matrix = None;
        }
        Ok(report)
    }
}
