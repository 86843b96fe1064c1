//! Validation Error Types

use thiserror::Error;

/// Errors during transaction validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Field present with a non-numeric value
    #[error("Field {field} must be a number, got {found}")]
    InvalidType {
        field: &'static str,
        found: String,
    },

    /// Numeric value that is NaN or infinite
    #[error("Field {field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    /// Payload is not the expected shape
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Error located on a specific CSV data row (1-based, header excluded)
    #[error("Row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: Box<ValidationError>,
    },

    /// CSV could not be read
    #[error("CSV error: {0}")]
    Csv(String),

    /// Too many rows in a batch
    #[error("Batch has more than {limit} rows")]
    TooManyRows { limit: usize },
}

impl ValidationError {
    /// Field name the error refers to, if any
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::MissingField(field)
            | ValidationError::InvalidType { field, .. }
            | ValidationError::NonFinite { field, .. } => Some(field),
            ValidationError::Row { source, .. } => source.field(),
            _ => None,
        }
    }

    pub(crate) fn at_row(self, row: usize) -> Self {
        ValidationError::Row {
            row,
            source: Box::new(self),
        }
    }
}

impl From<csv::Error> for ValidationError {
    fn from(err: csv::Error) -> Self {
        ValidationError::Csv(err.to_string())
    }
}
