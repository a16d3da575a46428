use thiserror::Error;

pub type PricingResult<T> = Result<T, PricingError>;

/// Pricing failures. Raised before any mutation, so a failed quote never
/// leaves side effects behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("invalid pricing input: {reason}")]
    InvalidPricingInput { reason: String },
}

impl PricingError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidPricingInput {
            reason: reason.into(),
        }
    }
}
