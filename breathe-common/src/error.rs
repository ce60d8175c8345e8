//! Common error types for Breathe services

use thiserror::Error;

/// Common result type for Breathe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared across the report pipeline and its collaborators
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or malformed required input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Identity could not be resolved to a known user
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Same image content already submitted by a different user
    #[error("Duplicate conflict: {0}")]
    DuplicateConflict(String),

    /// Scorer call failed or timed out. Distinct from a low-confidence
    /// result: a scorer failure is not evidence of no pollution.
    #[error("Scorer unavailable: {0}")]
    ScorerUnavailable(String),

    /// Repository or content-store write failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Requested content path escapes its partition root
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
