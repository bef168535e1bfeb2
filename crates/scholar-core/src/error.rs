use thiserror::Error;

/// Top-level error type for the Scholar core.
///
/// The first three variants are the user-facing taxonomy: a missing credential,
/// a failed remote call, and input rejected before any network work. Structured
/// responses that miss their declared shape are reported by the chat layer.
/// Nothing is retried automatically; retry is always a fresh user action.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScholarError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ScholarError {
    /// Whether the same request could succeed if the user tries again.
    ///
    /// Configuration and input problems need the user to change something first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScholarError::Remote(_))
    }
}

impl From<toml::de::Error> for ScholarError {
    fn from(err: toml::de::Error) -> Self {
        ScholarError::Configuration(err.to_string())
    }
}

impl From<toml::ser::Error> for ScholarError {
    fn from(err: toml::ser::Error) -> Self {
        ScholarError::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for ScholarError {
    fn from(err: serde_json::Error) -> Self {
        ScholarError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Scholar operations.
pub type Result<T> = std::result::Result<T, ScholarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(ScholarError, &str)> = vec![
            (
                ScholarError::Configuration("no API key".to_string()),
                "Configuration error: no API key",
            ),
            (
                ScholarError::Remote("status 500".to_string()),
                "Remote error: status 500",
            ),
            (
                ScholarError::Input("prompt is empty".to_string()),
                "Input error: prompt is empty",
            ),
            (
                ScholarError::Speech("engine unavailable".to_string()),
                "Speech error: engine unavailable",
            ),
            (
                ScholarError::Serialization("bad json".to_string()),
                "Serialization error: bad json",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ScholarError::Remote("x".into()).is_retryable());
        assert!(!ScholarError::Configuration("x".into()).is_retryable());
        assert!(!ScholarError::Input("x".into()).is_retryable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ScholarError = io_err.into();
        assert!(matches!(err, ScholarError::Io(_)));
        assert!(err.to_string().starts_with("I/O error:"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let bad: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: ScholarError = bad.unwrap_err().into();
        assert!(matches!(err, ScholarError::Configuration(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let bad: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ invalid }");
        let err: ScholarError = bad.unwrap_err().into();
        assert!(matches!(err, ScholarError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
