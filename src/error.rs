//! Error types for LodeKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using LodeError
pub type Result<T> = std::result::Result<T, LodeError>;

/// Unified error type for LodeKV operations
#[derive(Debug, Error)]
pub enum LodeError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Operation against a key holding the wrong kind of value")]
    WrongType,

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
