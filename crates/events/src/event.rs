use chrono::{DateTime, Utc};
use uuid::Uuid;

use lotkeeper_core::InventoryIdentity;

/// A recorded fact about one inventory identity.
///
/// Events are never edited. A mistake is fixed by appending a compensating
/// event, and the log treats a repeated `event_id` as already stored.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn event_id(&self) -> Uuid;

    /// Dotted type name, e.g. `ledger.sale.recorded`.
    fn event_type(&self) -> &'static str;

    /// Payload schema version.
    fn version(&self) -> u32;

    /// Business time, as opposed to the envelope's recording time.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Ledger record the event folds into.
    fn identity(&self) -> &InventoryIdentity;
}
