//! Inventory lots and sale allocation.
//!
//! The lot store is pure data access. The allocator owns every business rule
//! about which lots may fulfil a sale line, and `Allocator::commit` is the only
//! code path that decrements lot quantities.

pub mod allocator;
pub mod error;
pub mod lot;
pub mod store;

pub use allocator::{
    Allocation, Allocator, CommitOutcome, LineConsumption, LotConsumption, PendingAllocation,
    ValidatedLine,
};
pub use error::{AllocationError, AllocationWarning, LotStoreError};
pub use lot::{InventoryLot, LotIntake, LotSource};
pub use store::{InMemoryLotStore, LotStore};
