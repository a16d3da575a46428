use thiserror::Error;

use lotkeeper_core::{DomainError, SaleId};
use lotkeeper_inventory::{AllocationError, LotStoreError};
use lotkeeper_ledger::EventLogError;
use lotkeeper_pricing::PricingError;

/// Fatal sale failures.
///
/// Pricing, allocation and request errors are raised before anything is
/// mutated. A `Ledger` error is raised after the lot commit and leaves the
/// stock decremented.
#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error("invalid sale request: {0}")]
    InvalidRequest(String),

    #[error("sale {0} is already finalized")]
    AlreadyFinalized(SaleId),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Ledger(#[from] EventLogError),
}

/// Lot registration failures.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] LotStoreError),

    #[error(transparent)]
    Ledger(#[from] EventLogError),
}
