//! Error taxonomy for command dispatch.

use thiserror::Error;

/// How a command invocation can fail.
///
/// Validation failures block dispatch entirely and never reach the history;
/// every other variant is captured on the entry and rendered inline.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Input was rejected before any request was sent.
    #[error("{0}")]
    InvalidInput(String),
    /// The backend answered `success: false` with a message.
    #[error("{0}")]
    Backend(String),
    /// The request never completed (connect, send, or body read).
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    /// The response body was not the documented shape.
    #[error("invalid response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl CommandError {
    /// True when the failure happened before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, CommandError::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_not_recorded() {
        assert!(CommandError::InvalidInput("empty".into()).is_validation());
        assert!(!CommandError::Backend("boom".into()).is_validation());
    }

    #[test]
    fn test_backend_message_passthrough() {
        let err = CommandError::Backend("invalid word: 123".into());
        assert_eq!(err.to_string(), "invalid word: 123");
    }
}
