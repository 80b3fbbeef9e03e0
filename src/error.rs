//! Error types for deck_versions

use thiserror::Error;

/// Unified error type for deck store, diff and import operations
#[derive(Debug, Error)]
pub enum DeckError {
    /// Bad user input (empty deck name, missing commander, bad branch name, ...)
    #[error("Validation error: {0}")]
    Validation(String),
    /// Unknown deck, branch or version
    #[error("Not found: {0}")]
    NotFound(String),
    /// Snapshot retrieval failed in the underlying storage
    #[error("Failed to load {target}: {message}")]
    Load { target: String, message: String },
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Failed to encode or decode a snapshot
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeckError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        DeckError::Validation(msg.into())
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        DeckError::NotFound(msg.into())
    }

    pub fn load(target: impl Into<String>, err: impl std::fmt::Display) -> Self {
        DeckError::Load {
            target: target.into(),
            message: err.to_string(),
        }
    }

    /// True for errors caused by user input rather than storage
    pub fn is_validation(&self) -> bool {
        matches!(self, DeckError::Validation(_))
    }

    /// Raw error text for a "show details" view
    pub fn detail(&self) -> String {
        match self {
            DeckError::Load { message, .. } => message.clone(),
            other => format!("{:?}", other),
        }
    }
}

/// Result alias for deck_versions operations
pub type Result<T> = std::result::Result<T, DeckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_exposes_raw_message_as_detail() {
        let err = DeckError::load("1.0.0@main", "database disk image is malformed");
        assert_eq!(err.detail(), "database disk image is malformed");
        assert_eq!(
            err.to_string(),
            "Failed to load 1.0.0@main: database disk image is malformed"
        );
    }

    #[test]
    fn validation_errors_are_flagged() {
        assert!(DeckError::validation("empty").is_validation());
        assert!(!DeckError::not_found("deck").is_validation());
    }
}
