//! Markdown workflow explanations.

use crate::dataset::{self, DatasetKind, RawContent};
use crate::prompts::{EXPLAIN_GENERIC, EXPLAIN_TABULAR};

use super::{GenerativeClient, Operation, RequestError};

/// Header plus up to four data rows embedded in the tabular prompt.
const SAMPLE_LINES: usize = 5;

/// Inputs for [`GenerativeClient::explain_workflow`].
#[derive(Debug, Clone, Copy)]
pub struct ExplainInput<'a> {
    pub goal: &'a str,
    pub model: &'a str,
    pub kind: DatasetKind,
    /// Header columns; empty when unknown.
    pub column_names: &'a [String],
    pub raw_content: Option<&'a RawContent>,
}

impl<'a> ExplainInput<'a> {
    /// The CSV text, when the enriched tabular prompt applies.
    fn tabular_text(&self) -> Option<&'a str> {
        if self.kind != DatasetKind::Tabular || self.column_names.is_empty() {
            return None;
        }
        self.raw_content.and_then(RawContent::as_text)
    }
}

impl GenerativeClient {
    /// Ask for a staged explanation of the workflow. The text is returned as-is.
    pub async fn explain_workflow(&self, input: ExplainInput<'_>) -> Result<String, RequestError> {
        let prompt = match input.tabular_text() {
            Some(text) => {
                let columns = input.column_names.join(", ");
                let sample = dataset::head(text, SAMPLE_LINES);
                EXPLAIN_TABULAR.render(&[
                    ("goal", input.goal),
                    ("model", input.model),
                    ("columns", &columns),
                    ("sample", &sample),
                ])
            }
            None => EXPLAIN_GENERIC.render(&[
                ("goal", input.goal),
                ("model", input.model),
                ("dataset_kind", input.kind.as_str()),
            ]),
        };

        self.complete_text(
            Operation::ExplainWorkflow,
            prompt,
            self.config.explanation_max_tokens,
        )
        .await
    }
}
