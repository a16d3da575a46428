//! Shared domain vocabulary.
//!
//! Identifiers, product descriptors, condition ranks and counterpart identity
//! used by every other crate. Pure data, no infrastructure concerns.

pub mod counterpart;
pub mod descriptor;
pub mod error;
pub mod id;
pub mod rank;

pub use counterpart::{BuyerRef, Counterpart, CounterpartKind, LotSource};
pub use descriptor::ProductDescriptor;
pub use error::{DomainError, DomainResult};
pub use id::{InventoryIdentity, LotId, SaleId, UserId};
pub use rank::Rank;
