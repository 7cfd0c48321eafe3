//! Common result and error types for the Stanza build core.

/// An internal error indicating a bug in Stanza, not a user input problem.
///
/// These errors should never occur during normal operation. If one does
/// occur, it means a caller broke an API contract, such as compiling the
/// same representation twice in one run.
#[derive(Debug, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = InternalError::new("rep compiled twice");
        assert_eq!(format!("{err}"), "internal error: rep compiled twice");
    }

    #[test]
    fn from_string() {
        let err: InternalError = "from string".to_string().into();
        assert_eq!(err.message, "from string");
    }
}
