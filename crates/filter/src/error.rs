//! Filter error types

use thiserror::Error;

/// Errors that can occur when parsing or evaluating a filter expression
#[derive(Debug, Error)]
pub enum FilterError {
    /// Malformed selection expression
    #[error("filter syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },

    /// Field does not exist in the event shape
    #[error("unknown field '{field}' in {context}")]
    UnknownField { field: String, context: String },

    /// JSON (de)serialization failure
    #[error("filter serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl FilterError {
    /// Create a syntax error
    #[inline]
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }

    /// Create an unknown-field error
    #[inline]
    pub fn unknown_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
            context: context.into(),
        }
    }
}
