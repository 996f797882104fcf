//! Error types for the domain layer.

use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_message_names_field() {
        let err = ValidationError::empty_field("name");
        assert_eq!(err.to_string(), "Field 'name' cannot be empty");
    }

    #[test]
    fn invalid_format_message_includes_reason() {
        let err = ValidationError::invalid_format("webhook.url", "must start with http");
        assert!(err.to_string().contains("webhook.url"));
        assert!(err.to_string().contains("must start with http"));
    }
}
