//! Error types for target-state persistence.

use thiserror::Error;

/// Result type alias for target-state operations.
pub type TargetsResult<T> = Result<T, TargetsError>;

/// Errors that can occur while loading or publishing the target file.
#[derive(Debug, Error)]
pub enum TargetsError {
    #[error("failed to read target file: {0}")]
    Read(String),

    #[error("failed to parse target file: {0}")]
    Parse(String),

    #[error("failed to serialize target state: {0}")]
    Serialize(String),

    #[error("failed to write target file: {0}")]
    Write(String),
}
