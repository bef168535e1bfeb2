//! Error types for the chat flows.

use scholar_core::ScholarError;

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("a response is still being written")]
    TurnInFlight,
    #[error("invalid {label} format: {cause}")]
    InvalidFormat {
        label: &'static str,
        raw: String,
        cause: String,
    },
    #[error(transparent)]
    Core(#[from] ScholarError),
}

impl ChatError {
    /// Text a panel shows in place of a result.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::EmptyMessage => "Please enter a message first.".to_string(),
            ChatError::MessageTooLong(max) => {
                format!("Your message is too long (limit {} characters).", max)
            }
            ChatError::TurnInFlight => "Please wait for the current answer to finish.".to_string(),
            ChatError::InvalidFormat { label, .. } => {
                format!("The AI returned an invalid {} format. Please try again.", label)
            }
            ChatError::Core(ScholarError::Configuration(_)) => {
                "The AI service is not configured. Set an API key and try again.".to_string()
            }
            ChatError::Core(ScholarError::Remote(msg)) => {
                format!("The AI request failed: {}", msg)
            }
            ChatError::Core(ScholarError::Input(msg)) => msg.clone(),
            ChatError::Core(other) => other.to_string(),
        }
    }

    /// Whether the same request could succeed if the user tries again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::InvalidFormat { .. } => true,
            ChatError::Core(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            ChatError::MessageTooLong(8000).to_string(),
            "message exceeds maximum length of 8000 characters"
        );
        assert_eq!(
            ChatError::TurnInFlight.to_string(),
            "a response is still being written"
        );
    }

    #[test]
    fn test_invalid_format_user_message() {
        let err = ChatError::InvalidFormat {
            label: "quiz",
            raw: "not json".into(),
            cause: "expected value at line 1 column 1".into(),
        };
        assert_eq!(
            err.user_message(),
            "The AI returned an invalid quiz format. Please try again."
        );
        assert!(err.is_retryable());
        // Raw text never leaks into the displayed message.
        assert!(!err.user_message().contains("not json"));
    }

    #[test]
    fn test_core_error_is_transparent() {
        let err: ChatError = ScholarError::Remote("HTTP 503".into()).into();
        assert_eq!(err.to_string(), "Remote error: HTTP 503");
        assert!(err.user_message().contains("HTTP 503"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_configuration_is_not_retryable() {
        let err: ChatError = ScholarError::Configuration("missing key".into()).into();
        assert!(!err.is_retryable());
        assert!(err.user_message().contains("not configured"));
    }

    #[test]
    fn test_errors_implement_debug() {
        let dbg = format!("{:?}", ChatError::TurnInFlight);
        assert!(dbg.contains("TurnInFlight"));
    }
}
