//! Decoding of the model's free-form text reply.
//!
//! The model is asked for bare JSON but regularly wraps it in prose or code
//! fences. Decoding is two-staged: the whole text strictly, then the span from
//! the first `[` to the last `]`. Nothing smarter is attempted; a reply that
//! echoes several bracketed spans can still be mis-sliced.

use crate::models::MathResult;

/// Decode the reply into results.
///
/// On failure the error from the strict pass is returned, even when the
/// salvage pass was attempted.
pub fn parse_results(text: &str) -> Result<Vec<MathResult>, serde_json::Error> {
    let strict_err = match serde_json::from_str::<Vec<MathResult>>(text) {
        Ok(results) => return Ok(results),
        Err(e) => e,
    };

    let Some(span) = bracketed_span(text) else {
        tracing::debug!(error = %strict_err, "Reply has no bracketed span to salvage");
        return Err(strict_err);
    };

    match serde_json::from_str::<Vec<MathResult>>(span) {
        Ok(results) => {
            tracing::debug!(
                skipped_bytes = text.len() - span.len(),
                "Recovered results from bracketed span"
            );
            Ok(results)
        }
        Err(salvage_err) => {
            tracing::debug!(
                error = %salvage_err,
                "Bracketed span is not a valid result array"
            );
            Err(strict_err)
        }
    }
}

/// Slice from the first `[` through the last `]`, inclusive.
fn bracketed_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strict_single_object_array() {
        let results = parse_results(r#"[{"expr":"2+2","result":4}]"#).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].expression, "2+2");
        assert_eq!(results[0].result, json!(4));
        assert!(!results[0].assign);
    }

    #[test]
    fn prose_around_the_array_is_ignored() {
        let clean = r#"[{"expr":"x","result":2,"assign":true},{"expr":"y","result":5,"assign":true}]"#;
        let noisy = format!(
            "Sure! Here is the solution:\n```json\n{}\n```\nLet me know if you need more.",
            clean
        );

        assert_eq!(parse_results(&noisy).unwrap(), parse_results(clean).unwrap());
    }

    #[test]
    fn abstract_concept_with_string_result() {
        let results =
            parse_results(r#"[{"expr": "a heart with an arrow", "result": "love"}]"#).unwrap();
        assert_eq!(results[0].result, json!("love"));
    }

    #[test]
    fn empty_array_is_success() {
        assert!(parse_results("[]").unwrap().is_empty());
    }

    #[test]
    fn no_brackets_is_a_decode_error() {
        let err = parse_results("I could not read the drawing.").unwrap_err();
        assert!(err.is_syntax());
    }

    #[test]
    fn reversed_brackets_are_not_salvaged() {
        assert!(parse_results("] nothing here [").is_err());
    }

    #[test]
    fn failed_salvage_reports_the_strict_error() {
        let text = "answer: [not json]";
        let strict = serde_json::from_str::<Vec<MathResult>>(text).unwrap_err();
        let err = parse_results(text).unwrap_err();
        assert_eq!(err.to_string(), strict.to_string());
    }

    #[test]
    fn bracketed_span_is_inclusive() {
        assert_eq!(bracketed_span("ab[1,[2]]cd"), Some("[1,[2]]"));
        assert_eq!(bracketed_span("[]"), Some("[]"));
        assert_eq!(bracketed_span("no span"), None);
    }
}
