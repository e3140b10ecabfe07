//! Error types for program parsing and generator configuration.

use thiserror::Error;

use crate::program::Value;

/// Error parsing a program from its text form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("program has no threads")]
    Empty,

    #[error("line {line}: expected a `T<n>:` thread label")]
    MissingThreadLabel { line: usize },

    #[error("line {line}: expected thread T{expected}, found T{found}")]
    ThreadIndex {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: unknown variable `{name}`")]
    UnknownVariable { line: usize, name: String },

    #[error("line {line}: invalid value `{text}`")]
    InvalidValue { line: usize, text: String },

    #[error("line {line}: load writes r{found} but its slot is r{expected}")]
    RegisterMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: invalid operation `{text}`")]
    InvalidOperation { line: usize, text: String },
}

/// Error in a generator configuration or cursor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be between 1 and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: usize,
        max: usize,
    },

    #[error("at least one store value is required")]
    NoStoreValues,

    #[error("store value {0} is listed twice")]
    DuplicateStoreValue(Value),

    #[error("program space is too large to enumerate")]
    TooLarge,

    #[error("cursor does not belong to this configuration: {0}")]
    InvalidCursor(String),
}
