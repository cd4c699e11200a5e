//! Calculation results and the HTTP response shape built from them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One expression/value pair recognised in a drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathResult {
    /// The model spells this key `expr`; clients receive `expression`.
    #[serde(
        rename(serialize = "expression", deserialize = "expr"),
        alias = "expression"
    )]
    pub expression: String,

    /// A number for arithmetic, a string for abstract-concept answers.
    pub result: Value,

    /// Whether the pair binds a variable (`x = 4`, solved systems).
    #[serde(default, skip_serializing_if = "is_false")]
    pub assign: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Flat body used when exactly one result was recognised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleCalculation {
    pub expression: String,
    pub result: Value,
}

/// Body of a successful `/calculate` call.
///
/// A lone result is flattened to `{expression, result}`; zero or several are
/// returned as the full array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CalculationResponse {
    Single(SingleCalculation),
    Many(Vec<MathResult>),
}

impl From<Vec<MathResult>> for CalculationResponse {
    fn from(mut results: Vec<MathResult>) -> Self {
        if results.len() == 1 {
            if let Some(only) = results.pop() {
                return CalculationResponse::Single(SingleCalculation {
                    expression: only.expression,
                    result: only.result,
                });
            }
        }
        CalculationResponse::Many(results)
    }
}

impl CalculationResponse {
    pub fn len(&self) -> usize {
        match self {
            CalculationResponse::Single(_) => 1,
            CalculationResponse::Many(results) => results.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn model_keys_are_decoded() {
        let result: MathResult =
            serde_json::from_str(r#"{"expr": "x", "result": 2, "assign": true}"#).unwrap();
        assert_eq!(result.expression, "x");
        assert_eq!(result.result, json!(2));
        assert!(result.assign);
    }

    #[test]
    fn assign_defaults_to_false_and_expression_alias_is_accepted() {
        let result: MathResult =
            serde_json::from_str(r#"{"expression": "love", "result": "patriotism"}"#).unwrap();
        assert_eq!(result.expression, "love");
        assert!(!result.assign);
    }

    #[test]
    fn single_result_is_flattened() {
        let response = CalculationResponse::from(vec![MathResult {
            expression: "2+2".to_string(),
            result: json!(4),
            assign: false,
        }]);

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"expression": "2+2", "result": 4})
        );
    }

    #[test]
    fn single_assignment_drops_the_assign_flag() {
        let response = CalculationResponse::from(vec![MathResult {
            expression: "x".to_string(),
            result: json!(4),
            assign: true,
        }]);

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"expression": "x", "result": 4})
        );
    }

    #[test]
    fn several_results_stay_an_array() {
        let response = CalculationResponse::from(vec![
            MathResult {
                expression: "x".to_string(),
                result: json!(2),
                assign: true,
            },
            MathResult {
                expression: "y".to_string(),
                result: json!(5),
                assign: true,
            },
        ]);

        assert_eq!(response.len(), 2);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!([
                {"expression": "x", "result": 2, "assign": true},
                {"expression": "y", "result": 5, "assign": true}
            ])
        );
    }

    #[test]
    fn no_results_is_an_empty_array() {
        let response = CalculationResponse::from(Vec::new());
        assert!(response.is_empty());
        assert_eq!(serde_json::to_string(&response).unwrap(), "[]");
    }
}
