use crate::core::layout::LayoutError;
use crate::core::models::request::UnsupportedDerivativeError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: ParseErrorKind },
    #[error(transparent)]
    Derivative(#[from] UnsupportedDerivativeError),
    #[error("Truncated input: expected {expected} atom lines, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
    #[error("Section '{section}' has {found} rows, expected {expected}")]
    Shape {
        section: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Invalid fixed-width record on line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: LayoutError,
    },
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ParseErrorKind {
    #[error("Invalid integer for {field} (value: '{value}')")]
    InvalidInt { field: &'static str, value: String },
    #[error("Invalid real for {field} (value: '{value}')")]
    InvalidFloat { field: &'static str, value: String },
    #[error("Expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("Number of atoms must be at least 1 (value: {0})")]
    InvalidAtomCount(i64),
}
