//! Ledger aggregation, compliance validation and legacy migration.
//!
//! Purchase and sale events are appended to an event log; ledger records are
//! disposable folds of those events, rebuilt on demand.

pub mod aggregator;
pub mod compliance;
pub mod event;
pub mod export;
pub mod legacy;
pub mod log;
pub mod query;
pub mod record;

pub use aggregator::{CorrectableSale, LedgerAggregator};
pub use compliance::{ComplianceViolation, MissingField, audit, validate};
pub use event::{LedgerEvent, PurchaseEvent, SaleEvent};
pub use export::{ExportError, export_csv};
pub use legacy::{LegacySaleRecord, LegacySaleV1, LegacySaleV2, LegacySaleV3, MigrationOutcome, migrate_legacy};
pub use log::{EventLogError, InMemoryLedgerEventLog, LedgerEventLog};
pub use query::{LedgerFilter, LedgerPage, LedgerRow, PageRequest, TransactionFilter};
pub use record::{LedgerFold, LedgerRecord, LedgerStatus};
