//! Error types for the optval engine.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the optval engine.
#[derive(Error, Debug)]
pub enum Error {
    /// Out-of-domain or malformed caller input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A transcendental step produced a non-finite value.
    #[error("Degenerate computation: {0}")]
    DegenerateComputation(String),

    /// A required feature column is missing from the merged row.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a degenerate computation error.
    pub fn degenerate(msg: impl Into<String>) -> Self {
        Error::DegenerateComputation(msg.into())
    }

    /// Create a schema mismatch error.
    pub fn schema_mismatch(msg: impl Into<String>) -> Self {
        Error::SchemaMismatch(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Whether the error was caused by the caller's input rather than the math.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::SchemaMismatch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_input("strike must be positive");
        assert_eq!(err.to_string(), "Invalid input: strike must be positive");

        let err = Error::degenerate("q2 is NaN");
        assert_eq!(err.to_string(), "Degenerate computation: q2 is NaN");
    }

    #[test]
    fn test_caller_error_classification() {
        assert!(Error::invalid_input("x").is_caller_error());
        assert!(Error::schema_mismatch("x").is_caller_error());
        assert!(!Error::degenerate("x").is_caller_error());
        assert!(!Error::config("x").is_caller_error());
    }
}
