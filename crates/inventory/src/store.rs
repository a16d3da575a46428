//! Lot storage boundary.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use lotkeeper_core::LotId;

use crate::error::LotStoreError;
use crate::lot::InventoryLot;

/// Lot persistence. Pure data access: no business rules.
///
/// `transact` is the store's transactional boundary. The closure receives
/// copies of whichever requested lots exist; the copies are written back only
/// if it returns `Ok`, and lots left with no available units are removed in the
/// same step.
pub trait LotStore: Send + Sync {
    fn get(&self, id: LotId) -> Result<Option<InventoryLot>, LotStoreError>;

    fn list(&self) -> Result<Vec<InventoryLot>, LotStoreError>;

    fn insert(&self, lot: InventoryLot) -> Result<(), LotStoreError>;

    fn transact<T, E, F>(&self, ids: &[LotId], f: F) -> Result<T, E>
    where
        F: FnOnce(&mut BTreeMap<LotId, InventoryLot>) -> Result<T, E>,
        E: From<LotStoreError>;

    /// Lots with at least one available unit.
    fn list_available(&self) -> Result<Vec<InventoryLot>, LotStoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|lot| !lot.is_depleted())
            .collect())
    }
}

impl<S> LotStore for Arc<S>
where
    S: LotStore + ?Sized,
{
    fn get(&self, id: LotId) -> Result<Option<InventoryLot>, LotStoreError> {
        (**self).get(id)
    }

    fn list(&self) -> Result<Vec<InventoryLot>, LotStoreError> {
        (**self).list()
    }

    fn insert(&self, lot: InventoryLot) -> Result<(), LotStoreError> {
        (**self).insert(lot)
    }

    fn transact<T, E, F>(&self, ids: &[LotId], f: F) -> Result<T, E>
    where
        F: FnOnce(&mut BTreeMap<LotId, InventoryLot>) -> Result<T, E>,
        E: From<LotStoreError>,
    {
        (**self).transact(ids, f)
    }
}

/// In-memory lot store for tests, the CLI and snapshot-backed runs.
#[derive(Debug, Default)]
pub struct InMemoryLotStore {
    lots: RwLock<HashMap<LotId, InventoryLot>>,
}

impl InMemoryLotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from previously persisted lots.
    pub fn with_lots(lots: impl IntoIterator<Item = InventoryLot>) -> Self {
        Self {
            lots: RwLock::new(lots.into_iter().map(|l| (l.id(), l)).collect()),
        }
    }
}

fn poisoned() -> LotStoreError {
    LotStoreError::Unavailable("lock poisoned".to_string())
}

impl LotStore for InMemoryLotStore {
    fn get(&self, id: LotId) -> Result<Option<InventoryLot>, LotStoreError> {
        let lots = self.lots.read().map_err(|_| poisoned())?;
        Ok(lots.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<InventoryLot>, LotStoreError> {
        let lots = self.lots.read().map_err(|_| poisoned())?;
        let mut out: Vec<InventoryLot> = lots.values().cloned().collect();
        out.sort_by_key(|l| (l.registered_at(), l.id()));
        Ok(out)
    }

    fn insert(&self, lot: InventoryLot) -> Result<(), LotStoreError> {
        let mut lots = self.lots.write().map_err(|_| poisoned())?;
        if lots.contains_key(&lot.id()) {
            return Err(LotStoreError::Duplicate(lot.id()));
        }
        lots.insert(lot.id(), lot);
        Ok(())
    }

    fn transact<T, E, F>(&self, ids: &[LotId], f: F) -> Result<T, E>
    where
        F: FnOnce(&mut BTreeMap<LotId, InventoryLot>) -> Result<T, E>,
        E: From<LotStoreError>,
    {
        let mut lots = self.lots.write().map_err(|_| E::from(poisoned()))?;

        let mut working: BTreeMap<LotId, InventoryLot> = ids
            .iter()
            .filter_map(|id| lots.get(id).map(|l| (*id, l.clone())))
            .collect();

        let out = f(&mut working)?;

        for (id, lot) in working {
            if lot.is_depleted() {
                lots.remove(&id);
            } else {
                lots.insert(id, lot);
            }
        }
        Ok(out)
    }
}
