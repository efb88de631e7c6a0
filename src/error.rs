use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoanError {
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },
}

impl LoanError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        LoanError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Name of the input that failed validation.
    pub fn field(&self) -> &str {
        match self {
            LoanError::InvalidInput { field, .. } => field,
        }
    }
}

pub type Result<T> = std::result::Result<T, LoanError>;
