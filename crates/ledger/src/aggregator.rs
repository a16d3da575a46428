//! Ledger aggregator: append-only writes, on-demand record rebuilds.

use chrono::NaiveDate;
use tracing::{debug, info};

use uuid::Uuid;

use lotkeeper_core::{InventoryIdentity, SaleId};
use lotkeeper_events::{Event, EventEnvelope};
use lotkeeper_pricing::LedgerAmount;

use crate::compliance;
use crate::event::{LedgerEvent, PurchaseEvent, SaleEvent};
use crate::log::{EventLogError, LedgerEventLog};
use crate::query::{LedgerFilter, LedgerPage, LedgerRow, PageRequest, sort_records};
use crate::record::LedgerRecord;

/// A recorded sale together with the corrections already booked against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectableSale {
    pub original: SaleEvent,
    pub reversed_quantity: i64,
    pub reversed_shipping: LedgerAmount,
}

impl CorrectableSale {
    /// Units a further correction may still reverse.
    pub fn remaining_quantity(&self) -> i64 {
        self.original.quantity - self.reversed_quantity
    }

    pub fn remaining_shipping(&self) -> LedgerAmount {
        self.original.shipping_fee - self.reversed_shipping
    }
}

/// Owns the ledger event log. Records are never stored; every read folds
/// them from the events.
#[derive(Debug)]
pub struct LedgerAggregator<L: LedgerEventLog> {
    log: L,
}

impl<L: LedgerEventLog> LedgerAggregator<L> {
    pub fn new(log: L) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    /// Returns `false` when the event was already recorded.
    pub fn append_purchase(&self, event: PurchaseEvent) -> Result<bool, EventLogError> {
        if event.quantity == 0 {
            return Err(EventLogError::Rejected("purchase quantity must be positive".into()));
        }
        self.append(event.into())
    }

    /// Returns `false` when the event was already recorded.
    ///
    /// A compensating event must name an existing sale of the same identity,
    /// and all corrections of that sale together never exceed its quantity.
    pub fn append_sale(&self, event: SaleEvent) -> Result<bool, EventLogError> {
        if event.quantity == 0 {
            return Err(EventLogError::Rejected("sale quantity cannot be zero".into()));
        }
        if let Some(target) = event.corrects {
            if self.log.contains(event.event_id)? {
                return self.append(event.into());
            }
            if !event.is_compensating() {
                return Err(EventLogError::Rejected(format!(
                    "correction of sale {target} must carry a negative quantity"
                )));
            }
            let Some(sale) = self.correctable(&event.identity, target)? else {
                return Err(EventLogError::Rejected(format!(
                    "corrected sale {target} not found for {}",
                    event.identity
                )));
            };
            if -event.quantity > sale.remaining_quantity() {
                return Err(EventLogError::Rejected(format!(
                    "correction of {} units exceeds the {} units still recorded on sale {target}",
                    -event.quantity,
                    sale.remaining_quantity()
                )));
            }
        } else if event.is_compensating() {
            return Err(EventLogError::Rejected("compensating sale must reference the sale it corrects".into()));
        }
        self.append(event.into())
    }

    /// The non-compensating sale `event_id` of `identity` with the totals of
    /// every correction recorded against it.
    pub fn correctable(
        &self,
        identity: &InventoryIdentity,
        event_id: Uuid,
    ) -> Result<Option<CorrectableSale>, EventLogError> {
        let sales: Vec<SaleEvent> = self
            .log
            .load(identity)?
            .into_iter()
            .filter_map(|e| e.into_payload().as_sale().cloned())
            .collect();
        let Some(original) = sales
            .iter()
            .find(|s| s.event_id == event_id && !s.is_compensating())
            .cloned()
        else {
            return Ok(None);
        };
        let (reversed_quantity, reversed_shipping) = sales
            .iter()
            .filter(|s| s.corrects == Some(event_id))
            .fold((0, LedgerAmount::ZERO), |(qty, fee), s| (qty - s.quantity, fee - s.shipping_fee));
        Ok(Some(CorrectableSale {
            original,
            reversed_quantity,
            reversed_shipping,
        }))
    }

    /// Whether any sale event already carries `sale_id`.
    pub fn sale_recorded(&self, sale_id: SaleId) -> Result<bool, EventLogError> {
        Ok(self
            .log
            .load_all()?
            .iter()
            .any(|e| e.payload().as_sale().is_some_and(|s| s.sale_id == sale_id)))
    }

    fn append(&self, event: LedgerEvent) -> Result<bool, EventLogError> {
        let event_type = event.event_type();
        let identity = event.identity().clone();
        match self.log.append(event)? {
            Some(stored) => {
                debug!(%identity, event_type, sequence = stored.sequence_number(), "ledger event appended");
                Ok(true)
            }
            None => {
                debug!(%identity, event_type, "ledger event already recorded");
                Ok(false)
            }
        }
    }

    /// Append many events, skipping known ones. Returns how many were new.
    pub fn append_all(&self, events: impl IntoIterator<Item = LedgerEvent>) -> Result<usize, EventLogError> {
        let mut appended = 0;
        for event in events {
            let new = match event {
                LedgerEvent::Purchase(p) => self.append_purchase(p)?,
                LedgerEvent::Sale(s) => self.append_sale(s)?,
            };
            if new {
                appended += 1;
            }
        }
        Ok(appended)
    }

    pub fn rebuild(&self, identity: &InventoryIdentity) -> Result<Option<LedgerRecord>, EventLogError> {
        let events: Vec<LedgerEvent> = self
            .log
            .load(identity)?
            .into_iter()
            .map(EventEnvelope::into_payload)
            .collect();
        Ok(LedgerRecord::rebuild(identity, &events))
    }

    /// Every record, newest activity first.
    pub fn rebuild_all(&self) -> Result<Vec<LedgerRecord>, EventLogError> {
        let events: Vec<LedgerEvent> = self
            .log
            .load_all()?
            .into_iter()
            .map(EventEnvelope::into_payload)
            .collect();
        let mut grouped: std::collections::BTreeMap<InventoryIdentity, Vec<&LedgerEvent>> = Default::default();
        for e in &events {
            grouped.entry(e.identity().clone()).or_default().push(e);
        }
        let mut records: Vec<LedgerRecord> = grouped
            .iter()
            .filter_map(|(identity, evs)| LedgerRecord::rebuild(identity, evs.iter().copied()))
            .collect();
        sort_records(&mut records);
        Ok(records)
    }

    /// Filtered, paginated listing. Non-compliant records are included and
    /// carry their missing fields.
    pub fn query(
        &self,
        filter: &LedgerFilter,
        page: PageRequest,
        as_of: NaiveDate,
    ) -> Result<LedgerPage, EventLogError> {
        let rows: Vec<LedgerRow> = self
            .rebuild_all()?
            .into_iter()
            .filter(|r| filter.matches(r))
            .map(|record| {
                let missing = compliance::validate(&record, as_of);
                LedgerRow { record, missing }
            })
            .collect();
        let flagged = rows.iter().filter(|r| !r.is_compliant()).count();
        info!(matched = rows.len(), non_compliant = flagged, "ledger query");
        Ok(LedgerPage::slice(rows, page))
    }
}
