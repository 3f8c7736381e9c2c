//! Response shape validation
//!
//! The endpoint is never trusted: a body is only admitted to the transcript
//! after it has been checked against the `{"response": "<string>"}` contract.

use serde_json::Value;

use crate::error::{QueryError, ShapeError};

/// Bot text shown when the request could not be completed.
pub const UNREACHABLE_DIAGNOSTIC: &str = "Error: Unable to get response from server.";

/// Bot text shown when the server answered with something we can't read.
pub const FORMAT_DIAGNOSTIC: &str = "Error: Unexpected response format from server.";

/// Extract the trimmed answer text from a decoded body.
pub fn validate_response(body: &Value) -> Result<String, ShapeError> {
    let object = body.as_object().ok_or(ShapeError::NotAnObject)?;
    let field = object.get("response").ok_or(ShapeError::MissingField)?;
    let text = field.as_str().ok_or(ShapeError::NotAString)?.trim();

    if text.is_empty() {
        return Err(ShapeError::Empty);
    }

    Ok(text.to_string())
}

/// Outcome of one turn, before it becomes a bot message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Answer(String),
    BadShape(ShapeError),
    Failed(String),
}

impl TurnOutcome {
    pub fn from_result(result: Result<Value, QueryError>) -> Self {
        match result {
            Ok(body) => match validate_response(&body) {
                Ok(text) => TurnOutcome::Answer(text),
                Err(reason) => TurnOutcome::BadShape(reason),
            },
            Err(e) => TurnOutcome::Failed(e.to_string()),
        }
    }

    /// Text of the bot message this outcome turns into.
    pub fn bot_text(&self) -> &str {
        match self {
            TurnOutcome::Answer(text) => text.as_str(),
            TurnOutcome::BadShape(_) => FORMAT_DIAGNOSTIC,
            TurnOutcome::Failed(_) => UNREACHABLE_DIAGNOSTIC,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_response_is_trimmed() {
        let body = json!({ "response": "  hello  " });
        assert_eq!(validate_response(&body), Ok("hello".to_string()));
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let body = json!({ "response": "ok", "cached": true });
        assert_eq!(validate_response(&body), Ok("ok".to_string()));
    }

    #[test]
    fn test_missing_field() {
        let body = json!({ "error": "Query is required" });
        assert_eq!(validate_response(&body), Err(ShapeError::MissingField));
    }

    #[test]
    fn test_non_string_field_is_not_coerced() {
        assert_eq!(validate_response(&json!({ "response": 42 })), Err(ShapeError::NotAString));
        assert_eq!(validate_response(&json!({ "response": null })), Err(ShapeError::NotAString));
        assert_eq!(
            validate_response(&json!({ "response": { "text": "hi" } })),
            Err(ShapeError::NotAString)
        );
    }

    #[test]
    fn test_non_object_body() {
        assert_eq!(validate_response(&json!("hello")), Err(ShapeError::NotAnObject));
        assert_eq!(validate_response(&json!(["hello"])), Err(ShapeError::NotAnObject));
    }

    #[test]
    fn test_blank_response_rejected() {
        assert_eq!(validate_response(&json!({ "response": "   " })), Err(ShapeError::Empty));
    }

    #[test]
    fn test_outcome_texts() {
        let answer = TurnOutcome::from_result(Ok(json!({ "response": " hi " })));
        assert_eq!(answer.bot_text(), "hi");
        assert_eq!(answer, TurnOutcome::Answer("hi".to_string()));

        let bad = TurnOutcome::from_result(Ok(json!({ "response": 7 })));
        assert_eq!(bad, TurnOutcome::BadShape(ShapeError::NotAString));
        assert_eq!(bad.bot_text(), FORMAT_DIAGNOSTIC);

        let failed = TurnOutcome::from_result(Err(QueryError::Status(500)));
        assert_eq!(failed.bot_text(), UNREACHABLE_DIAGNOSTIC);
        assert_ne!(FORMAT_DIAGNOSTIC, UNREACHABLE_DIAGNOSTIC);
    }
}
