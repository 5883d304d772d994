//! Expression error types

use thiserror::Error;

/// Errors raised while parsing an expression.
///
/// Positions are byte offsets into the original input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Invalid numeric literal '{literal}' at {position}: {reason}")]
    InvalidNumber {
        literal: String,
        position: usize,
        reason: String,
    },

    /// Calls nested deeper than the parser allows
    #[error("Expression nested deeper than {max_depth} calls at {position}")]
    TooDeep { position: usize, max_depth: usize },

    /// Input ended before the argument list was closed
    #[error("Missing comma or closing paren at {position}")]
    MissingComma { position: usize },

    #[error("Unexpected character '{ch}' at {position}")]
    UnexpectedCharacter { ch: char, position: usize },

    #[error("Empty expression")]
    EmptyExpression,

    #[error("Unexpected trailing input at {position}: '{remainder}'")]
    TrailingInput { position: usize, remainder: String },
}

/// Errors raised by the windowed running mean
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("Window capacity must be at least 1")]
    ZeroCapacity,

    #[error("Mean of an empty window")]
    Empty,
}

/// Errors raised while evaluating an expression tree
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Function {function} expects {expected} argument(s), got {actual}")]
    ArityMismatch {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error(
        "Argument {argument} of {function} must be a single sample, got {series} series with {samples} sample(s)"
    )]
    NonScalarArgument {
        function: String,
        argument: usize,
        series: usize,
        samples: usize,
    },

    #[error("Invalid window size: {value}")]
    InvalidWindowSize { value: f64 },

    #[error("Function {function} resolved no input series")]
    EmptyAggregate { function: String },

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for evaluation
pub type Result<T> = std::result::Result<T, EvalError>;
