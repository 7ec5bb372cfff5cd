//! Keyword triage of the user's goal into a coarse task category.

use serde::{Deserialize, Serialize};

const CLASSIFICATION_KEYWORDS: &[&str] = &["classify", "categorize", "identify"];
const REGRESSION_KEYWORDS: &[&str] = &["predict", "forecast", "estimate"];

/// Coarse kind of modelling task implied by a goal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskCategory {
    Classification,
    Regression,
    #[default]
    Other,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Classification => "classification",
            TaskCategory::Regression => "regression",
            TaskCategory::Other => "other",
        }
    }
}

/// Classify a goal by case-insensitive keyword match.
///
/// Classification keywords are checked first, so a goal mentioning both
/// "classify" and "predict" is a classification task.
pub fn classify_task(goal: &str) -> TaskCategory {
    let goal = goal.to_lowercase();
    if CLASSIFICATION_KEYWORDS.iter().any(|k| goal.contains(k)) {
        TaskCategory::Classification
    } else if REGRESSION_KEYWORDS.iter().any(|k| goal.contains(k)) {
        TaskCategory::Regression
    } else {
        TaskCategory::Other
    }
}
