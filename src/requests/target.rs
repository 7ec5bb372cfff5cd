//! Target-column identification for tabular datasets.

use tracing::debug;

use crate::prompts::IDENTIFY_TARGET;

use super::{GenerativeClient, Operation, RequestError};

const QUOTES: &[char] = &['"', '\'', '`'];

/// Map a free-text answer onto one of `columns`.
///
/// Surrounding whitespace and quotes are stripped. An answer that is not a
/// column name falls back to the last column. Returns an empty string only
/// when `columns` is empty.
pub fn resolve_target_column(raw: &str, columns: &[String]) -> String {
    let cleaned = raw.trim().trim_matches(QUOTES).trim();
    if columns.iter().any(|c| c == cleaned) {
        return cleaned.to_string();
    }

    let fallback = columns.last().cloned().unwrap_or_default();
    debug!(
        answer = %cleaned,
        fallback = %fallback,
        "target column not in header; using last column"
    );
    fallback
}

impl GenerativeClient {
    pub async fn identify_target_column(
        &self,
        goal: &str,
        columns: &[String],
    ) -> Result<String, RequestError> {
        if columns.is_empty() {
            return Ok(String::new());
        }

        let column_list = columns.join(", ");
        let prompt = IDENTIFY_TARGET.render(&[("goal", goal), ("columns", &column_list)]);
        let answer = self
            .complete_text(Operation::IdentifyTargetColumn, prompt, self.config.max_tokens)
            .await?;
        Ok(resolve_target_column(&answer, columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn accepts_exact_and_quoted_answers() {
        let columns = cols(&["date", "region", "amount"]);
        assert_eq!(resolve_target_column("amount", &columns), "amount");
        assert_eq!(resolve_target_column("  \"region\"\n", &columns), "region");
        assert_eq!(resolve_target_column("'date'", &columns), "date");
    }

    #[test]
    fn hallucinated_answer_falls_back_to_last_column() {
        let columns = cols(&["date", "region", "amount"]);
        assert_eq!(resolve_target_column("revenue", &columns), "amount");
        assert_eq!(resolve_target_column("The target is amount", &columns), "amount");
        assert_eq!(resolve_target_column("", &columns), "amount");
    }

    #[test]
    fn empty_header_resolves_to_empty() {
        assert_eq!(resolve_target_column("anything", &[]), "");
    }

    proptest! {
        #[test]
        fn result_is_always_a_column(
            columns in prop::collection::vec("[a-zA-Z_ ]{1,12}", 1..8),
            answer in ".{0,30}",
        ) {
            let resolved = resolve_target_column(&answer, &columns);
            prop_assert!(columns.contains(&resolved));
        }

        #[test]
        fn quoted_column_round_trips(columns in prop::collection::vec("[a-z_]{1,12}", 1..8), idx in 0usize..8) {
            let pick = &columns[idx % columns.len()];
            let answer = format!(" \"{pick}\" ");
            prop_assert_eq!(&resolve_target_column(&answer, &columns), pick);
        }
    }
}
