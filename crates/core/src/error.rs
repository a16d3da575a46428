//! Validation errors for shared domain values.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Rejected value or intake.
///
/// Raised when a descriptor, identifier or lot intake is constructed;
/// allocation, ledger and sync failures have their own enums.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("management number '{0}' appears more than once")]
    DuplicateManagementNumber(String),

    #[error("{numbers} management numbers for {quantity} units")]
    TooManyManagementNumbers { numbers: usize, quantity: u32 },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
