//! External inventory-service synchronisation.
//!
//! Outbound pushes are idempotency-keyed and retried with bounded backoff;
//! their outcome lands in the activity log, never in the caller's error path.

pub mod activity;
pub mod adapter;
pub mod error;
pub mod http;
pub mod retry;
pub mod service;
pub mod types;

pub use activity::{ActivityEntry, ActivityLog, ActivityStatus, InMemoryActivityLog, SyncAction};
pub use adapter::{PullOptions, PushOutcome, SyncAdapter, idempotency_key};
pub use error::{ActivityLogError, RemoteError, SyncError};
pub use http::HttpInventoryService;
pub use retry::{RetryFailure, RetryPolicy};
pub use service::InventoryService;
pub use types::{OutboundShipment, QuantityUpdate, RemoteItem, RemoteRecord, ShipmentLine};
