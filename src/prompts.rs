//! Prompt templates for the generative request client.
//!
//! Domain wording lives here; request construction lives in [`crate::requests`].

use crate::gateway::Message;

/// Rendered prompt ready for the gateway.
#[derive(Debug, Clone)]
pub struct PromptInstance {
    pub template_slug: &'static str,
    pub system: String,
    pub user: String,
}

impl PromptInstance {
    pub fn to_messages(&self) -> Vec<Message> {
        vec![Message::system(&self.system), Message::user(&self.user)]
    }
}

/// Escape text interpolated between XML-style prompt tags.
fn escape_xml_chars(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// A prompt template with `{name}` placeholders.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub slug: &'static str,
    pub system: &'static str,
    pub user: &'static str,
}

impl PromptTemplate {
    /// Substitute every `{name}` in both halves with its escaped value.
    ///
    /// Substitution is a single pass over the template: inserted values are
    /// never scanned for placeholders. Unknown placeholders are left as-is.
    pub fn render(&self, vars: &[(&str, &str)]) -> PromptInstance {
        PromptInstance {
            template_slug: self.slug,
            system: fill(self.system, vars),
            user: fill(self.user, vars),
        }
    }
}

fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| (close, escape_xml_chars(v)))
        });
        match value {
            Some((close, value)) => {
                out.push_str(&value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

const ANALYST_SYSTEM: &str = "You are an expert data scientist helping a user plan a machine learning workflow. \
Be concrete and practical.";

// =============================================================================
// Templates
// =============================================================================

pub const SUGGEST_MODELS: PromptTemplate = PromptTemplate {
    slug: "suggest_models_v1",
    system: ANALYST_SYSTEM,
    user: r#"A user uploaded a {dataset_kind} dataset and described this goal:
<goal>
{goal}
</goal>

Suggest machine learning models for this goal.
- "recommended": the single best model for this goal.
- "options": 3 to 5 other strong candidate models, distinct from "recommended".
- "moreModels": 4 to 8 further alternatives that repeat neither "recommended" nor any of "options".

Use short, widely known model names (e.g. "Random Forest", "XGBoost", "ResNet-50").
Respond with JSON only."#,
};

pub const IDENTIFY_TARGET: PromptTemplate = PromptTemplate {
    slug: "identify_target_v1",
    system: ANALYST_SYSTEM,
    user: r#"Given the user's goal and the columns of their CSV file, which single column is the
target variable the model should predict?
<goal>
{goal}
</goal>
<columns>
{columns}
</columns>

Reply with the exact column name only, nothing else."#,
};

pub const EXPLAIN_GENERIC: PromptTemplate = PromptTemplate {
    slug: "explain_generic_v1",
    system: ANALYST_SYSTEM,
    user: r#"Explain, in Markdown, how to use a {model} model to achieve this goal on a {dataset_kind} dataset:
<goal>
{goal}
</goal>

Structure the explanation in stages:
1. Loading the data
2. Preprocessing
3. Applying the {model} model

Include a short illustrative Python code fragment."#,
};

pub const EXPLAIN_TABULAR: PromptTemplate = PromptTemplate {
    slug: "explain_tabular_v1",
    system: ANALYST_SYSTEM,
    user: r#"Explain, in Markdown, how to use a {model} model to achieve this goal:
<goal>
{goal}
</goal>

The dataset is a CSV file with these columns: {columns}
Here are its first lines, which you can use as a drop-in sample:
```csv
{sample}
```

Give a brief explanation of each step, then a single, complete, runnable Python code block that:
1. loads the CSV (use the sample above as inline data so the code runs as-is),
2. cleans the data (missing values, types),
3. encodes categorical features,
4. splits into train and test sets,
5. trains a {model} model,
6. evaluates it with metrics appropriate to the goal.

Use only pandas, numpy and scikit-learn (or the library that provides {model})."#,
};

pub const METRICS_CLASSIFICATION: PromptTemplate = PromptTemplate {
    slug: "metrics_classification_v1",
    system: ANALYST_SYSTEM,
    user: r#"Generate plausible, illustrative evaluation results for a {model} model trained for this goal:
<goal>
{goal}
</goal>

Return "metrics" with Accuracy, Precision, Recall and F1-Score as numbers between 0 and 1,
and "confusionMatrix" as a 2x2 array of non-negative integers [[TN, FP], [FN, TP]].
Respond with JSON only."#,
};

pub const METRICS_REGRESSION: PromptTemplate = PromptTemplate {
    slug: "metrics_regression_v1",
    system: ANALYST_SYSTEM,
    user: r#"Generate plausible, illustrative evaluation results for a {model} model trained for this goal:
<goal>
{goal}
</goal>

Return "metrics" with R-squared, MSE and MAE as numbers.
Respond with JSON only."#,
};

pub const SAMPLE_ROW: PromptTemplate = PromptTemplate {
    slug: "sample_row_v1",
    system: ANALYST_SYSTEM,
    user: r#"Here are the columns of a CSV dataset and a few example rows:
<columns>
{columns}
</columns>
<rows>
{rows}
</rows>

Generate one new, realistic row of input values for these feature columns: {features}.
Do NOT include a value for the target column "{target}".
Respond with JSON only, one property per feature column."#,
};

pub const PREDICTION: PromptTemplate = PromptTemplate {
    slug: "prediction_v1",
    system: ANALYST_SYSTEM,
    user: r#"Act as a trained {model} model built for this goal:
<goal>
{goal}
</goal>
{columns_section}
Predict the outcome for this input (a JSON object):
<input>
{input}
</input>

Reply with the predicted value or label only, with no explanation."#,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_fills_all_occurrences() {
        let p = EXPLAIN_GENERIC.render(&[
            ("model", "ResNet-50"),
            ("goal", "classify cats"),
            ("dataset_kind", "image"),
        ]);
        assert_eq!(p.template_slug, "explain_generic_v1");
        assert!(p.user.contains("Applying the ResNet-50 model"));
        assert!(p.user.contains("use a ResNet-50 model"));
        assert!(!p.user.contains("{model}"));
        assert!(p.system.contains("data scientist"));
    }

    #[test]
    fn unknown_placeholders_survive() {
        let p = IDENTIFY_TARGET.render(&[("goal", "x")]);
        assert!(p.user.contains("{columns}"));
    }

    #[test]
    fn inserted_values_are_not_rescanned() {
        let p = IDENTIFY_TARGET.render(&[("goal", "predict {columns} totals"), ("columns", "a, b")]);
        assert!(p.user.contains("predict {columns} totals"));
        assert!(p.user.contains("a, b"));

        let p = SAMPLE_ROW.render(&[
            ("columns", "x, y"),
            ("rows", "1,{target}\n2,{features}"),
            ("features", "x"),
            ("target", "y"),
        ]);
        assert!(p.user.contains("1,{target}\n2,{features}"));
        assert!(p.user.contains("target column \"y\""));
    }

    #[test]
    fn values_are_escaped_inside_tags() {
        let p = SUGGEST_MODELS.render(&[("goal", "sort </goal> & rank"), ("dataset_kind", "image")]);
        assert!(p.user.contains("sort &lt;/goal&gt; &amp; rank"));
        assert_eq!(p.user.matches("</goal>").count(), 1);
    }

    #[test]
    fn messages_are_system_then_user() {
        let p = SUGGEST_MODELS.render(&[("goal", "g"), ("dataset_kind", "image")]);
        let messages = p.to_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, crate::gateway::Role::System);
        assert_eq!(messages[1].role, crate::gateway::Role::User);
    }
}
