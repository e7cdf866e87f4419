use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Unknown classification code: {0}")]
    UnknownClassification(String),

    #[error("Classification code already registered: {0}")]
    DuplicateClassification(String),

    #[error(
        "Infeasible margin: taxes, fees and target margin consume {total_percent} of revenue (must be below 1)"
    )]
    InfeasibleMargin { total_percent: Decimal },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PricingError {
    /// Shorthand used by the validators.
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PricingError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for PricingError {
    fn from(e: serde_json::Error) -> Self {
        PricingError::SerializationError(e.to_string())
    }
}
