//! Common error types for tgsync

use thiserror::Error;

/// Common result type for tgsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the tgsync crates
#[derive(Error, Debug)]
pub enum Error {
    /// No backing file (or other resource) exists
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed TextGrid content
    #[error("TextGrid parse error: {0}")]
    Parse(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Round trip requested on a unit that is already out for editing
    #[error("TextGrid is locked: {0}")]
    AlreadyLocked(String),

    /// Operation requires a lock that is not held
    #[error("TextGrid is not locked: {0}")]
    NotLocked(String),

    /// External tool unreachable or reported an error
    #[error("External tool error: {0}")]
    ExternalTool(String),

    /// Callback arrived but the hand-off file was missing or unparsable
    #[error("Reconciliation skipped: {0}")]
    ReconciliationSkipped(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for the "no backing file" condition, which callers expecting
    /// optional state treat as absence rather than failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
