//! Common error types for JamSync

use thiserror::Error;

/// Common result type for JamSync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across JamSync crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Session socket frame that matches no known event schema
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Stored row could not be decoded into the sheet model
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}
