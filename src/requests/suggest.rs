//! Model suggestions for a goal.

use serde::{Deserialize, Serialize};

use crate::dataset::DatasetKind;
use crate::prompts::SUGGEST_MODELS;
use crate::schema::{ObjectSchema, Schema};

use super::{GenerativeClient, Operation, RequestError};

/// Models proposed for the user's goal.
///
/// `recommended` is expected to appear in `options` and `more_models` is
/// expected not to repeat either; both are left to the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSuggestions {
    pub recommended: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub more_models: Vec<String>,
}

impl ModelSuggestions {
    /// Whether `model` was offered anywhere in the suggestions.
    pub fn offers(&self, model: &str) -> bool {
        self.recommended == model
            || self.options.iter().any(|m| m == model)
            || self.more_models.iter().any(|m| m == model)
    }
}

fn suggestions_schema() -> ObjectSchema {
    ObjectSchema::new()
        .required("recommended", Schema::String)
        .required("options", Schema::array(Schema::String))
        .required("moreModels", Schema::array(Schema::String))
}

impl GenerativeClient {
    pub async fn suggest_models(
        &self,
        goal: &str,
        kind: DatasetKind,
    ) -> Result<ModelSuggestions, RequestError> {
        let prompt = SUGGEST_MODELS.render(&[("goal", goal), ("dataset_kind", kind.as_str())]);
        self.complete_structured(
            Operation::SuggestModels,
            prompt,
            suggestions_schema().into_response_schema("model_suggestions"),
        )
        .await
    }
}
