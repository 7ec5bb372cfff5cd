//! Session data model: everything the rendering layer reads.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::classifier::TaskCategory;
use crate::dataset::DatasetDescriptor;
use crate::requests::{MetricsReport, ModelSuggestions, RequestError};

/// The five stages of a workflow pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStage {
    #[default]
    UploadingFile,
    CollectingGoal,
    ProcessingGoal,
    SelectingModel,
    ShowingResults,
}

impl WorkflowStage {
    pub const ALL: [WorkflowStage; 5] = [
        WorkflowStage::UploadingFile,
        WorkflowStage::CollectingGoal,
        WorkflowStage::ProcessingGoal,
        WorkflowStage::SelectingModel,
        WorkflowStage::ShowingResults,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStage::UploadingFile => "UPLOADING_FILE",
            WorkflowStage::CollectingGoal => "COLLECTING_GOAL",
            WorkflowStage::ProcessingGoal => "PROCESSING_GOAL",
            WorkflowStage::SelectingModel => "SELECTING_MODEL",
            WorkflowStage::ShowingResults => "SHOWING_RESULTS",
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The service could not be reached or rejected the call.
    Provider,
    /// The service answered with text that did not fit the declared schema.
    MalformedResponse,
}

/// A request failure as stored in a result slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&RequestError> for RequestFailure {
    fn from(err: &RequestError) -> Self {
        let kind = if err.is_malformed() {
            FailureKind::MalformedResponse
        } else {
            FailureKind::Provider
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// Outcome of one results-view request. `None` while pending or not yet asked.
pub type ResultSlot<T> = Option<Result<T, RequestFailure>>;

/// State of one workflow pass.
///
/// Created fresh at start and on reset; mutated only by
/// [`crate::workflow::Workflow`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub stage: WorkflowStage,
    pub dataset: Option<DatasetDescriptor>,
    pub goal: String,
    pub task_category: TaskCategory,
    /// Empty unless the dataset is tabular and a target was identified.
    pub target_column: String,
    pub suggestions: Option<ModelSuggestions>,
    pub selected_model: String,
    /// Feature column to user-entered value, in header order.
    pub test_bench_inputs: IndexMap<String, String>,
    pub explanation: ResultSlot<String>,
    pub metrics: ResultSlot<MetricsReport>,
    pub prediction: ResultSlot<String>,
    pub last_error: Option<String>,
}

impl SessionState {
    pub fn is_tabular(&self) -> bool {
        self.dataset.as_ref().is_some_and(DatasetDescriptor::is_tabular)
    }

    /// Column names of the accepted dataset, or empty.
    pub fn column_names(&self) -> &[String] {
        self.dataset
            .as_ref()
            .map(|d| d.column_names.as_slice())
            .unwrap_or(&[])
    }

    /// Test-bench fields that are still blank.
    pub fn missing_inputs(&self) -> Vec<String> {
        self.test_bench_inputs
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(column, _)| column.clone())
            .collect()
    }
}
