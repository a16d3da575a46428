//! Sale finalization and the wiring around it.
//!
//! `SaleEngine` ties the lot store, allocator, ledger and sync adapter
//! together. Configuration, snapshot persistence and the `lotkeeper` binary
//! live here too.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod request;
pub mod sale;
pub mod snapshot;

pub use collaborators::{
    ExchangeRateSource, FixedRate, IdentityProvider, InMemoryProductMaster, ProductInfo, ProductMaster, StaticIdentity,
};
pub use config::{CurrencyConfig, EngineConfig, StorageConfig, SyncConfig};
pub use error::{FinalizeError, IntakeError};
pub use request::{FinalizedSale, RequestLine, SaleContext, SalePreview, SaleRequest, SyncWarning};
pub use sale::{Collaborators, RegisteredLot, SaleEngine};
pub use snapshot::{Snapshot, SnapshotError};
