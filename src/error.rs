//! Error types for clustering and data preparation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad cluster count, round cap or dataset contents.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Two shapes that must agree do not.
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Unknown table format name.
    #[error("Format error: {0}")]
    Format(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// A cell that cannot be turned into a number.
    #[error("Non-numeric value {value:?} at row {row}, column {column}")]
    NotNumeric {
        row: usize,
        column: String,
        value: String,
    },
}

impl Error {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn dimension_mismatch(expected: usize, found: usize) -> Self {
        Self::DimensionMismatch { expected, found }
    }
}
