//! Inventory allocator: binds requested sale quantities to specific lots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use lotkeeper_core::LotId;
use lotkeeper_pricing::{LedgerAmount, SaleLine};

use crate::error::{AllocationError, AllocationWarning};
use crate::lot::InventoryLot;
use crate::store::LotStore;

/// A (lot, quantity) pairing attached to a sale line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub lot_id: LotId,
    pub quantity: u32,
}

/// Allocations being assembled for one sale line. Nothing is reserved in the
/// lot store while an allocation is pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAllocation {
    line: SaleLine,
    allocations: Vec<Allocation>,
}

impl PendingAllocation {
    pub fn new(line: SaleLine) -> Self {
        Self {
            line,
            allocations: Vec::new(),
        }
    }

    pub fn line(&self) -> &SaleLine {
        &self.line
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    /// Record `quantity` units from `lot_id`. Repeated calls for the same lot
    /// accumulate.
    pub fn allocate(&mut self, lot_id: LotId, quantity: u32) -> Result<(), AllocationError> {
        if quantity == 0 {
            return Err(AllocationError::ZeroQuantity { lot_id });
        }
        match self.allocations.iter_mut().find(|a| a.lot_id == lot_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(quantity),
            None => self.allocations.push(Allocation { lot_id, quantity }),
        }
        Ok(())
    }

    /// Drop any allocation from `lot_id`.
    pub fn release(&mut self, lot_id: LotId) {
        self.allocations.retain(|a| a.lot_id != lot_id);
    }

    pub fn allocated_quantity(&self) -> u32 {
        self.allocations
            .iter()
            .fold(0u32, |acc, a| acc.saturating_add(a.quantity))
    }

    /// Require the allocated quantity to equal the requested quantity exactly.
    pub fn validate(&self) -> Result<ValidatedLine, AllocationError> {
        let allocated = self.allocated_quantity();
        if allocated != self.line.quantity {
            return Err(AllocationError::AllocationMismatch {
                requested: self.line.quantity,
                allocated,
            });
        }
        Ok(ValidatedLine {
            line: self.line.clone(),
            allocations: self.allocations.clone(),
        })
    }
}

/// A sale line whose allocations sum exactly to the requested quantity.
///
/// Only obtainable through [`PendingAllocation::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLine {
    line: SaleLine,
    allocations: Vec<Allocation>,
}

impl ValidatedLine {
    pub fn line(&self) -> &SaleLine {
        &self.line
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }
}

/// Units consumed from one lot for one sale line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotConsumption {
    pub lot_id: LotId,
    pub external_id: Option<String>,
    pub quantity: u32,
    pub unit_cost: LedgerAmount,
    pub management_numbers: Vec<String>,
    /// Units left in the lot after this consumption.
    pub remaining: u32,
}

/// Everything one sale line consumed, in allocation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineConsumption {
    pub line: SaleLine,
    pub consumptions: Vec<LotConsumption>,
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub lines: Vec<LineConsumption>,
    pub warnings: Vec<AllocationWarning>,
    /// Lots that reached zero and left the store.
    pub depleted: Vec<LotId>,
}

/// Matches sale lines against lots and commits the result.
#[derive(Debug)]
pub struct Allocator<S: LotStore> {
    store: S,
}

impl<S: LotStore> Allocator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Available lots for the line's product, best condition first, then
    /// cheapest acquisition price. Registration time and id break any
    /// remaining tie so the order is total.
    pub fn list_candidates(&self, line: &SaleLine) -> Result<Vec<InventoryLot>, AllocationError> {
        let mut lots: Vec<InventoryLot> = self
            .store
            .list_available()?
            .into_iter()
            .filter(|lot| lot.descriptor().matches(&line.descriptor))
            .collect();
        lots.sort_by_key(|l| (l.rank(), l.acquisition_unit_price(), l.registered_at(), l.id()));
        Ok(lots)
    }

    pub fn begin(&self, line: SaleLine) -> PendingAllocation {
        PendingAllocation::new(line)
    }

    /// Fill the line greedily in candidate order. The result may fall short
    /// when stock is insufficient; `validate` reports that.
    pub fn auto_allocate(&self, line: SaleLine) -> Result<PendingAllocation, AllocationError> {
        let candidates = self.list_candidates(&line)?;
        let mut pending = PendingAllocation::new(line);
        let mut outstanding = pending.line().quantity;
        for lot in candidates {
            if outstanding == 0 {
                break;
            }
            let take = outstanding.min(lot.available());
            pending.allocate(lot.id(), take)?;
            outstanding -= take;
        }
        debug!(
            requested = pending.line().quantity,
            allocated = pending.allocated_quantity(),
            "auto allocation computed"
        );
        Ok(pending)
    }

    /// Preview check against the current store contents. Mutates nothing.
    pub fn check(&self, lines: &[ValidatedLine]) -> Result<(), AllocationError> {
        let demand = aggregate_demand(lines);
        let mut lots = BTreeMap::new();
        for id in demand.keys() {
            if let Some(lot) = self.store.get(*id)? {
                lots.insert(*id, lot);
            }
        }
        verify(&lots, lines, &demand)
    }

    /// The single mutation point for lot quantities.
    ///
    /// Re-reads every referenced lot inside the store's transaction and fails
    /// atomically with `InsufficientStock` if any allocation now exceeds what
    /// is available. On success, units and management numbers are drawn in
    /// line order, then allocation order.
    pub fn commit(&self, lines: &[ValidatedLine]) -> Result<CommitOutcome, AllocationError> {
        let demand = aggregate_demand(lines);
        let ids: Vec<LotId> = demand.keys().copied().collect();

        self.store.transact(&ids, |lots| {
            verify(lots, lines, &demand)?;

            let mut out_lines = Vec::with_capacity(lines.len());
            let mut warnings = Vec::new();

            for validated in lines {
                let mut consumptions = Vec::with_capacity(validated.allocations.len());
                for alloc in &validated.allocations {
                    let lot = lots.get_mut(&alloc.lot_id).ok_or(AllocationError::InsufficientStock {
                        lot_id: alloc.lot_id,
                        requested: alloc.quantity,
                        available: 0,
                    })?;
                    let drawn = lot.draw(alloc.quantity);
                    if let Some(w) = drawn.warning {
                        warn!(lot_id = %alloc.lot_id, "{w}");
                        warnings.push(w);
                    }
                    info!(
                        lot_id = %alloc.lot_id,
                        quantity = alloc.quantity,
                        remaining = lot.available(),
                        "lot units committed"
                    );
                    consumptions.push(LotConsumption {
                        lot_id: alloc.lot_id,
                        external_id: lot.external_id().map(str::to_string),
                        quantity: alloc.quantity,
                        unit_cost: lot.acquisition_unit_price(),
                        management_numbers: drawn.management_numbers,
                        remaining: lot.available(),
                    });
                }
                out_lines.push(LineConsumption {
                    line: validated.line.clone(),
                    consumptions,
                });
            }

            let depleted = lots
                .values()
                .filter(|l| l.is_depleted())
                .map(|l| l.id())
                .collect();

            Ok(CommitOutcome {
                lines: out_lines,
                warnings,
                depleted,
            })
        })
    }
}

fn aggregate_demand(lines: &[ValidatedLine]) -> BTreeMap<LotId, u32> {
    let mut demand: BTreeMap<LotId, u32> = BTreeMap::new();
    for line in lines {
        for alloc in &line.allocations {
            let entry = demand.entry(alloc.lot_id).or_default();
            *entry = entry.saturating_add(alloc.quantity);
        }
    }
    demand
}

fn verify(
    lots: &BTreeMap<LotId, InventoryLot>,
    lines: &[ValidatedLine],
    demand: &BTreeMap<LotId, u32>,
) -> Result<(), AllocationError> {
    for line in lines {
        for alloc in &line.allocations {
            let Some(lot) = lots.get(&alloc.lot_id) else {
                return Err(AllocationError::InsufficientStock {
                    lot_id: alloc.lot_id,
                    requested: demand.get(&alloc.lot_id).copied().unwrap_or(alloc.quantity),
                    available: 0,
                });
            };
            if !lot.descriptor().matches(&line.line.descriptor) {
                return Err(AllocationError::DescriptorMismatch {
                    lot_id: alloc.lot_id,
                });
            }
        }
    }
    for (lot_id, requested) in demand {
        let available = lots.get(lot_id).map(|l| l.available()).unwrap_or(0);
        if *requested > available {
            return Err(AllocationError::InsufficientStock {
                lot_id: *lot_id,
                requested: *requested,
                available,
            });
        }
    }
    Ok(())
}
