//! Error types for rusts-core

use thiserror::Error;

/// Core error types
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Empty series name")]
    EmptySeriesName,

    #[error("Invalid step for series '{name}': {step}")]
    InvalidStep { name: String, step: i32 },
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
