//! Append-only ledger event log.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use lotkeeper_core::InventoryIdentity;
use lotkeeper_events::{Event, EventEnvelope};

use crate::event::LedgerEvent;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventLogError {
    #[error("event rejected: {0}")]
    Rejected(String),

    #[error("event log unavailable: {0}")]
    Unavailable(String),
}

/// Ledger event persistence.
///
/// Appends are idempotent by `event_id`: re-appending a known event returns
/// `Ok(None)` and leaves the log unchanged. Sequence numbers start at 1 and
/// increase by one per stored event across the whole log.
pub trait LedgerEventLog: Send + Sync {
    fn append(&self, event: LedgerEvent) -> Result<Option<EventEnvelope<LedgerEvent>>, EventLogError>;

    fn contains(&self, event_id: Uuid) -> Result<bool, EventLogError>;

    /// Events for one identity in append order.
    fn load(&self, identity: &InventoryIdentity) -> Result<Vec<EventEnvelope<LedgerEvent>>, EventLogError>;

    /// Every event in append order.
    fn load_all(&self) -> Result<Vec<EventEnvelope<LedgerEvent>>, EventLogError>;

    /// Identities with at least one event, in first-append order.
    fn identities(&self) -> Result<Vec<InventoryIdentity>, EventLogError>;
}

impl<L> LedgerEventLog for Arc<L>
where
    L: LedgerEventLog + ?Sized,
{
    fn append(&self, event: LedgerEvent) -> Result<Option<EventEnvelope<LedgerEvent>>, EventLogError> {
        (**self).append(event)
    }

    fn contains(&self, event_id: Uuid) -> Result<bool, EventLogError> {
        (**self).contains(event_id)
    }

    fn load(&self, identity: &InventoryIdentity) -> Result<Vec<EventEnvelope<LedgerEvent>>, EventLogError> {
        (**self).load(identity)
    }

    fn load_all(&self) -> Result<Vec<EventEnvelope<LedgerEvent>>, EventLogError> {
        (**self).load_all()
    }

    fn identities(&self) -> Result<Vec<InventoryIdentity>, EventLogError> {
        (**self).identities()
    }
}

#[derive(Debug, Default)]
struct LogState {
    events: Vec<EventEnvelope<LedgerEvent>>,
    ids: HashSet<Uuid>,
    by_identity: HashMap<InventoryIdentity, Vec<usize>>,
    identity_order: Vec<InventoryIdentity>,
}

impl LogState {
    fn push(&mut self, envelope: EventEnvelope<LedgerEvent>) {
        let identity = envelope.payload().identity().clone();
        let idx = self.events.len();
        self.ids.insert(envelope.payload().event_id());
        match self.by_identity.get_mut(&identity) {
            Some(positions) => positions.push(idx),
            None => {
                self.identity_order.push(identity.clone());
                self.by_identity.insert(identity, vec![idx]);
            }
        }
        self.events.push(envelope);
    }

    fn next_sequence(&self) -> u64 {
        self.events.last().map(|e| e.sequence_number()).unwrap_or(0) + 1
    }
}

/// In-memory append-only ledger log.
#[derive(Debug, Default)]
pub struct InMemoryLedgerEventLog {
    state: RwLock<LogState>,
}

impl InMemoryLedgerEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a log from stored envelopes. Envelopes are taken in sequence
    /// order; later duplicates of an event id are dropped.
    pub fn from_envelopes(envelopes: impl IntoIterator<Item = EventEnvelope<LedgerEvent>>) -> Self {
        let mut sorted: Vec<_> = envelopes.into_iter().collect();
        sorted.sort_by_key(|e| e.sequence_number());

        let mut state = LogState::default();
        for envelope in sorted {
            if !state.ids.contains(&envelope.payload().event_id()) {
                state.push(envelope);
            }
        }
        Self {
            state: RwLock::new(state),
        }
    }
}

fn poisoned() -> EventLogError {
    EventLogError::Unavailable("lock poisoned".to_string())
}

impl LedgerEventLog for InMemoryLedgerEventLog {
    fn append(&self, event: LedgerEvent) -> Result<Option<EventEnvelope<LedgerEvent>>, EventLogError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        if state.ids.contains(&event.event_id()) {
            return Ok(None);
        }
        let envelope = EventEnvelope::new(state.next_sequence(), Utc::now(), event);
        state.push(envelope.clone());
        Ok(Some(envelope))
    }

    fn contains(&self, event_id: Uuid) -> Result<bool, EventLogError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.ids.contains(&event_id))
    }

    fn load(&self, identity: &InventoryIdentity) -> Result<Vec<EventEnvelope<LedgerEvent>>, EventLogError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state
            .by_identity
            .get(identity)
            .map(|positions| positions.iter().map(|i| state.events[*i].clone()).collect())
            .unwrap_or_default())
    }

    fn load_all(&self) -> Result<Vec<EventEnvelope<LedgerEvent>>, EventLogError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.events.clone())
    }

    fn identities(&self) -> Result<Vec<InventoryIdentity>, EventLogError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.identity_order.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::fixtures::{purchase, sale};
    use lotkeeper_core::LotId;

    #[test]
    fn append_assigns_increasing_sequence_numbers() {
        let log = InMemoryLedgerEventLog::new();
        let lot = LotId::new();
        let first = log.append(purchase(lot, 1, 2, 100).into()).unwrap().unwrap();
        let second = log.append(sale(lot, 2, 1, 150).into()).unwrap().unwrap();
        assert_eq!(first.sequence_number(), 1);
        assert_eq!(second.sequence_number(), 2);
    }

    #[test]
    fn duplicate_event_id_is_a_no_op() {
        let log = InMemoryLedgerEventLog::new();
        let event: LedgerEvent = purchase(LotId::new(), 1, 2, 100).into();
        assert!(log.append(event.clone()).unwrap().is_some());
        assert!(log.append(event).unwrap().is_none());
        assert_eq!(log.load_all().unwrap().len(), 1);
    }

    #[test]
    fn load_filters_by_identity() {
        let log = InMemoryLedgerEventLog::new();
        let (a, b) = (LotId::new(), LotId::new());
        log.append(purchase(a, 1, 1, 100).into()).unwrap();
        log.append(purchase(b, 1, 1, 100).into()).unwrap();
        log.append(sale(a, 2, 1, 150).into()).unwrap();

        assert_eq!(log.load(&a.into()).unwrap().len(), 2);
        assert_eq!(log.load(&b.into()).unwrap().len(), 1);
        assert_eq!(
            log.identities().unwrap(),
            vec![InventoryIdentity::from(a), InventoryIdentity::from(b)]
        );
    }

    #[test]
    fn restore_keeps_sequence_order() {
        let log = InMemoryLedgerEventLog::new();
        let lot = LotId::new();
        log.append(purchase(lot, 1, 1, 100).into()).unwrap();
        log.append(sale(lot, 2, 1, 150).into()).unwrap();

        let mut stored = log.load_all().unwrap();
        stored.reverse();
        let restored = InMemoryLedgerEventLog::from_envelopes(stored);
        let seqs: Vec<u64> = restored.load_all().unwrap().iter().map(|e| e.sequence_number()).collect();
        assert_eq!(seqs, vec![1, 2]);

        let next = restored.append(sale(lot, 3, 1, 150).into()).unwrap().unwrap();
        assert_eq!(next.sequence_number(), 3);
    }
}
