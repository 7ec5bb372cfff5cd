//! Fabricated predictions for test-bench input.

use crate::prompts::PREDICTION;

use super::{GenerativeClient, Operation, RequestError};

fn columns_section(columns: Option<&[String]>) -> String {
    match columns {
        Some(columns) if !columns.is_empty() => {
            format!("The model was trained on a dataset with these columns: {}.\n", columns.join(", "))
        }
        _ => String::new(),
    }
}

impl GenerativeClient {
    /// Ask for a prediction on `input_json`. The answer is opaque and only trimmed.
    pub async fn generate_prediction(
        &self,
        goal: &str,
        model: &str,
        input_json: &str,
        columns: Option<&[String]>,
    ) -> Result<String, RequestError> {
        let section = columns_section(columns);
        let prompt = PREDICTION.render(&[
            ("model", model),
            ("goal", goal),
            ("columns_section", &section),
            ("input", input_json),
        ]);
        let answer = self
            .complete_text(Operation::GeneratePrediction, prompt, self.config.max_tokens)
            .await?;
        Ok(answer.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_section_is_optional() {
        assert_eq!(columns_section(None), "");
        assert_eq!(columns_section(Some(&[])), "");
        let cols = vec!["a".to_string(), "b".to_string()];
        assert!(columns_section(Some(&cols)).contains("a, b"));
    }
}
