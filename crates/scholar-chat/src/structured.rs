//! Validation of schema-constrained model output.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::ChatError;

/// A typed shape the model is asked to produce.
pub trait StructuredShape: DeserializeOwned {
    /// Short name used in user-facing messages ("quiz", "feedback", ...).
    const LABEL: &'static str;

    /// JSON schema declared to the model.
    fn schema() -> Value;

    /// Constraints the type itself cannot express.
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

impl<T: StructuredShape> StructuredShape for Vec<T> {
    const LABEL: &'static str = T::LABEL;

    fn schema() -> Value {
        json!({ "type": "ARRAY", "items": T::schema() })
    }

    fn check(&self) -> Result<(), String> {
        if self.is_empty() {
            return Err("expected at least one item".to_string());
        }
        for (i, item) in self.iter().enumerate() {
            item.check().map_err(|e| format!("item {}: {}", i, e))?;
        }
        Ok(())
    }
}

/// Outcome of validating one structured response.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredResult<T> {
    Ok(T),
    FormatError { raw_text: String, cause: String },
}

impl<T> StructuredResult<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, StructuredResult::Ok(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            StructuredResult::Ok(v) => Some(v),
            StructuredResult::FormatError { .. } => None,
        }
    }
}

impl<T: StructuredShape> StructuredResult<T> {
    pub fn into_result(self) -> Result<T, ChatError> {
        match self {
            StructuredResult::Ok(v) => Ok(v),
            StructuredResult::FormatError { raw_text, cause } => Err(ChatError::InvalidFormat {
                label: T::LABEL,
                raw: raw_text,
                cause,
            }),
        }
    }
}

pub struct StructuredValidator;

impl StructuredValidator {
    /// Parse `raw` as `T`. Any deviation yields `FormatError`, never a partial value.
    pub fn validate<T: StructuredShape>(raw: &str) -> StructuredResult<T> {
        let parsed = serde_json::from_str::<T>(raw.trim())
            .map_err(|e| e.to_string())
            .and_then(|v| v.check().map(|()| v));

        match parsed {
            Ok(value) => StructuredResult::Ok(value),
            Err(cause) => {
                tracing::warn!(shape = T::LABEL, cause = %cause, "Structured response rejected");
                tracing::debug!(shape = T::LABEL, raw = %raw, "Rejected structured response text");
                StructuredResult::FormatError {
                    raw_text: raw.to_string(),
                    cause,
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pair {
        left: u32,
        right: u32,
    }

    impl StructuredShape for Pair {
        const LABEL: &'static str = "pair";

        fn schema() -> Value {
            json!({ "type": "OBJECT" })
        }

        fn check(&self) -> Result<(), String> {
            if self.left > self.right {
                return Err("left must not exceed right".into());
            }
            Ok(())
        }
    }

    #[test]
    fn test_valid_object() {
        let r = StructuredValidator::validate::<Pair>(r#"{"left":1,"right":2}"#);
        assert_eq!(r, StructuredResult::Ok(Pair { left: 1, right: 2 }));
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        let r = StructuredValidator::validate::<Pair>("\n  {\"left\":1,\"right\":1}  \n");
        assert!(r.is_ok());
    }

    #[test]
    fn test_not_json_is_format_error() {
        match StructuredValidator::validate::<Pair>("not json") {
            StructuredResult::FormatError { raw_text, cause } => {
                assert_eq!(raw_text, "not json");
                assert!(!cause.is_empty());
            }
            other => panic!("expected FormatError, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_field_is_format_error() {
        let r = StructuredValidator::validate::<Pair>(r#"{"left":1}"#);
        assert!(!r.is_ok());
    }

    #[test]
    fn test_check_failure_is_format_error() {
        let r = StructuredValidator::validate::<Pair>(r#"{"left":5,"right":2}"#);
        match r {
            StructuredResult::FormatError { cause, .. } => assert!(cause.contains("left")),
            _ => panic!("expected FormatError"),
        }
    }

    #[test]
    fn test_vec_checks_each_item() {
        let r = StructuredValidator::validate::<Vec<Pair>>(
            r#"[{"left":1,"right":2},{"left":3,"right":1}]"#,
        );
        match r {
            StructuredResult::FormatError { cause, .. } => assert!(cause.starts_with("item 1")),
            _ => panic!("expected FormatError"),
        }
    }

    #[test]
    fn test_empty_vec_is_rejected() {
        assert!(!StructuredValidator::validate::<Vec<Pair>>("[]").is_ok());
    }

    #[test]
    fn test_vec_schema_wraps_item() {
        let schema = <Vec<Pair>>::schema();
        assert_eq!(schema["type"], "ARRAY");
        assert_eq!(schema["items"]["type"], "OBJECT");
        assert_eq!(<Vec<Pair>>::LABEL, "pair");
    }

    #[test]
    fn test_into_result_maps_label() {
        let err = StructuredValidator::validate::<Pair>("oops")
            .into_result()
            .unwrap_err();
        assert_eq!(
            err.user_message(),
            "The AI returned an invalid pair format. Please try again."
        );
    }
}
