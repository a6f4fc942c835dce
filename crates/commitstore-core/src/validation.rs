use thiserror::Error;

/// Validation errors for core primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required string value was empty.
    #[error("{field} must not be empty")]
    Empty {
        /// Field name that failed validation.
        field: &'static str,
    },
    /// A value falls outside the range the field can represent.
    #[error("{field} ({value}) is out of range")]
    OutOfRange {
        /// Field name that is out of range.
        field: &'static str,
        /// Offending value.
        value: String,
    },
}
