//! Sale engine: lot intake, sale preview and sale finalization.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use lotkeeper_core::{LotId, SaleId, UserId};
use lotkeeper_inventory::{
    AllocationError, Allocator, CommitOutcome, InventoryLot, LotIntake, LotStore, LotStoreError, PendingAllocation,
    ValidatedLine,
};
use lotkeeper_ledger::{
    LedgerAggregator, LedgerEvent, LedgerEventLog, LedgerFilter, LedgerPage, PageRequest, PurchaseEvent, SaleEvent,
};
use lotkeeper_pricing::{LedgerAmount, ProfitBreakdown, apportion, quote_sale};
use lotkeeper_sync::{
    ActivityLog, InventoryService, OutboundShipment, PushOutcome, QuantityUpdate, ShipmentLine, SyncAdapter,
};

use crate::collaborators::{ExchangeRateSource, IdentityProvider, ProductMaster};
use crate::error::{FinalizeError, IntakeError};
use crate::request::{FinalizedSale, SaleContext, SalePreview, SaleRequest, SyncWarning};

/// External collaborators, shared with the rest of the application.
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub products: Arc<dyn ProductMaster>,
    pub rates: Arc<dyn ExchangeRateSource>,
}

/// A lot as registered, with the outcome of its quantity push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredLot {
    pub lot: InventoryLot,
    pub sync: PushOutcome,
}

/// Wires the lot store, allocator, ledger and sync adapter together.
///
/// Finalization order: price, validate, commit lots, append ledger events,
/// push to the external service. Only the last step may fail without failing
/// the sale.
pub struct SaleEngine<S, L, V, A>
where
    S: LotStore,
    L: LedgerEventLog,
    V: InventoryService,
    A: ActivityLog,
{
    allocator: Allocator<S>,
    ledger: LedgerAggregator<L>,
    sync: SyncAdapter<V, A>,
    collaborators: Collaborators,
}

impl<S, L, V, A> SaleEngine<S, L, V, A>
where
    S: LotStore,
    L: LedgerEventLog,
    V: InventoryService,
    A: ActivityLog,
{
    pub fn new(store: S, log: L, sync: SyncAdapter<V, A>, collaborators: Collaborators) -> Self {
        Self {
            allocator: Allocator::new(store),
            ledger: LedgerAggregator::new(log),
            sync,
            collaborators,
        }
    }

    pub fn allocator(&self) -> &Allocator<S> {
        &self.allocator
    }

    pub fn ledger(&self) -> &LedgerAggregator<L> {
        &self.ledger
    }

    pub fn sync(&self) -> &SyncAdapter<V, A> {
        &self.sync
    }

    fn staff_name(&self, staff: Option<UserId>) -> Option<String> {
        let user = staff.or_else(|| self.collaborators.identity.current_user())?;
        Some(
            self.collaborators
                .identity
                .display_name(user)
                .unwrap_or_else(|| user.to_string()),
        )
    }

    /// Register a lot: store it, record the purchase, push its quantity.
    ///
    /// A lot without an external id adopts the remote id returned by a
    /// successful push.
    pub async fn register_lot(&self, mut intake: LotIntake) -> Result<RegisteredLot, IntakeError> {
        if intake.registered_by.is_none() {
            intake.registered_by = self.collaborators.identity.current_user();
        }
        let mut lot = InventoryLot::register(LotId::new(), intake, Utc::now())?;
        self.allocator.store().insert(lot.clone())?;

        self.ledger.append_purchase(PurchaseEvent {
            event_id: Uuid::now_v7(),
            identity: lot.id().into(),
            occurred_at: lot.registered_at(),
            descriptor: lot.descriptor().clone(),
            rank: Some(lot.rank()),
            quantity: lot.total_quantity(),
            unit_price: lot.acquisition_unit_price(),
            management_numbers: lot.management_numbers().to_vec(),
            source: lot.source(),
            counterpart: lot.counterpart().clone(),
            registered_by: lot.registered_by(),
        })?;
        info!(lot_id = %lot.id(), quantity = lot.total_quantity(), rank = %lot.rank(), "lot registered");

        let sync = self
            .sync
            .push_quantity(&QuantityUpdate {
                lot_id: lot.id(),
                external_id: lot.external_id().map(str::to_string),
                quantity: lot.available(),
                cause: "intake".to_string(),
            })
            .await;
        let remote_id = match &sync {
            PushOutcome::Synced { remote_id, .. } if lot.external_id().is_none() => Some(remote_id.clone()),
            _ => None,
        };
        if let Some(remote_id) = remote_id {
            let lot_id = lot.id();
            let linked = self.allocator.store().transact(&[lot_id], |lots| {
                Ok::<_, LotStoreError>(lots.get_mut(&lot_id).map(|stored| {
                    stored.set_external_id(remote_id);
                    stored.clone()
                }))
            });
            match linked {
                Ok(Some(stored)) => lot = stored,
                Ok(None) => warn!(%lot_id, "lot gone before its remote id was stored"),
                Err(e) => warn!(%lot_id, error = %e, "remote id not stored on lot"),
            }
        }
        Ok(RegisteredLot { lot, sync })
    }

    /// Snapshot the exchange rate and allocate a sale id.
    pub fn begin_sale(&self) -> Result<SaleContext, FinalizeError> {
        Ok(SaleContext {
            sale_id: SaleId::new(),
            rate: self.collaborators.rates.current_rate()?,
            started_at: Utc::now(),
        })
    }

    fn validate_request(&self, request: &SaleRequest) -> Result<Vec<ValidatedLine>, FinalizeError> {
        if request.buyer.name.trim().is_empty() {
            return Err(FinalizeError::InvalidRequest("buyer name is required".into()));
        }
        if request.channel.trim().is_empty() {
            return Err(FinalizeError::InvalidRequest("sales channel is required".into()));
        }
        let mut validated = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let mut pending = PendingAllocation::new(line.line.clone());
            for alloc in &line.allocations {
                pending.allocate(alloc.lot_id, alloc.quantity)?;
            }
            validated.push(pending.validate()?);
        }
        Ok(validated)
    }

    /// Price and check a sale against current stock. Mutates nothing.
    pub fn preview(&self, request: &SaleRequest) -> Result<SalePreview, FinalizeError> {
        let quote = quote_sale(&request.sale_lines(), request.context.rate, &request.shipping)?;
        let lines = self.validate_request(request)?;
        self.allocator.check(&lines)?;

        let mut cost = LedgerAmount::ZERO;
        for alloc in lines.iter().flat_map(|l| l.allocations()) {
            let lot = self.allocator.store().get(alloc.lot_id).map_err(AllocationError::from)?;
            if let Some(lot) = lot {
                cost = cost.checked_add(lot.acquisition_unit_price().checked_mul_qty(i64::from(alloc.quantity))?)?;
            }
        }
        let profit = ProfitBreakdown::compute(quote.total_ledger, cost, quote.shipping.seller_cost())?;
        Ok(SalePreview { quote, lines, profit })
    }

    /// Finalize a sale.
    ///
    /// Lots are committed first, then one sale event per consumed lot is
    /// appended, then the external service is updated. Sync failures are
    /// reported in `sync_warnings` and the activity log; they never fail the
    /// sale. A sale id already present in the ledger is refused before any
    /// lot is touched.
    pub async fn finalize(&self, request: &SaleRequest) -> Result<FinalizedSale, FinalizeError> {
        let sale_id = request.context.sale_id;
        let quote = quote_sale(&request.sale_lines(), request.context.rate, &request.shipping)?;
        let lines = self.validate_request(request)?;
        if self.ledger.sale_recorded(sale_id)? {
            warn!(%sale_id, "sale already finalized; request refused");
            return Err(FinalizeError::AlreadyFinalized(sale_id));
        }

        let outcome = self.allocator.commit(&lines)?;

        let occurred_at = Utc::now();
        let staff = self.staff_name(request.staff);
        let mut events = Vec::new();
        let mut cost = LedgerAmount::ZERO;

        for (consumed, priced) in outcome.lines.iter().zip(&quote.lines) {
            let weights: Vec<u64> = consumed.consumptions.iter().map(|c| u64::from(c.quantity)).collect();
            let shipping = apportion(priced.shipping_ledger, &weights)?;
            for (c, ship) in consumed.consumptions.iter().zip(shipping) {
                let qty = i64::from(c.quantity);
                cost = cost.checked_add(c.unit_cost.checked_mul_qty(qty)?)?;
                events.push(SaleEvent {
                    event_id: Uuid::now_v7(),
                    sale_id,
                    identity: c.lot_id.into(),
                    occurred_at,
                    descriptor: consumed.line.descriptor.clone(),
                    buyer: request.buyer.clone(),
                    quantity: qty,
                    unit_price_settlement: Some(priced.unit_settlement),
                    unit_price_ledger: priced.unit_ledger,
                    exchange_rate: Some(quote.rate),
                    shipping_fee: ship,
                    channel: request.channel.clone(),
                    staff: staff.clone(),
                    management_numbers: c.management_numbers.clone(),
                    unit_cost: Some(c.unit_cost),
                    origin_counterpart: None,
                    corrects: None,
                });
            }
        }

        for event in &events {
            if let Err(e) = self.ledger.append_sale(event.clone()) {
                error!(%sale_id, error = %e, "lots committed but ledger append failed; reconcile manually");
                return Err(e.into());
            }
        }

        let sync_warnings = self.push_sale(request, &outcome).await;

        let profit = ProfitBreakdown::compute(quote.total_ledger, cost, quote.shipping.seller_cost())?;
        info!(
            %sale_id,
            revenue = profit.revenue.units(),
            cost = profit.cost.units(),
            profit = profit.profit.units(),
            events = events.len(),
            synced = sync_warnings.is_empty(),
            "sale finalized"
        );

        Ok(FinalizedSale {
            sale_id,
            quote,
            events,
            profit,
            warnings: outcome.warnings,
            sync_warnings,
            depleted: outcome.depleted,
        })
    }

    async fn push_sale(
        &self,
        request: &SaleRequest,
        outcome: &CommitOutcome,
    ) -> Vec<SyncWarning> {
        let mut warnings = Vec::new();

        let shipment = OutboundShipment {
            sale_id: request.context.sale_id,
            buyer: request.buyer.clone(),
            shipped_at: Utc::now(),
            shipping_method: Some(request.shipping.method.clone()),
            lines: outcome
                .lines
                .iter()
                .flat_map(|l| {
                    let info = self.collaborators.products.lookup(&l.line.descriptor).unwrap_or_default();
                    l.consumptions.iter().map(move |c| ShipmentLine {
                        lot_id: c.lot_id,
                        external_id: c.external_id.clone(),
                        quantity: c.quantity,
                        management_numbers: c.management_numbers.clone(),
                        country_of_origin: info.country_of_origin.clone(),
                        category: info.category.clone(),
                    })
                })
                .collect(),
        };
        let pushed = self.sync.push_outbound(&shipment).await;
        if !pushed.is_synced() {
            warn!(sale_id = %request.context.sale_id, "outbound shipment not synced");
            warnings.push(SyncWarning {
                reference: shipment.reference(),
                outcome: pushed,
            });
        }

        // One push per lot, carrying its count after the whole sale.
        let mut final_counts: BTreeMap<LotId, (Option<String>, u32)> = BTreeMap::new();
        for c in outcome.lines.iter().flat_map(|l| &l.consumptions) {
            final_counts.insert(c.lot_id, (c.external_id.clone(), c.remaining));
        }
        for (lot_id, (external_id, quantity)) in final_counts {
            let update = QuantityUpdate {
                lot_id,
                external_id,
                quantity,
                cause: format!("sale:{}", request.context.sale_id),
            };
            let pushed = self.sync.push_quantity(&update).await;
            if !pushed.is_synced() {
                warnings.push(SyncWarning {
                    reference: update.reference(),
                    outcome: pushed,
                });
            }
        }
        warnings
    }

    /// Append a compensating event reversing `quantity` units of a recorded
    /// sale event. Earlier corrections of the same event count against the
    /// units that may still be reversed. Lot stock is not touched.
    pub fn correct_sale(&self, event_id: Uuid, quantity: u32) -> Result<SaleEvent, FinalizeError> {
        if quantity == 0 {
            return Err(FinalizeError::InvalidRequest("correction quantity must be positive".into()));
        }
        let identity = self
            .ledger
            .log()
            .load_all()?
            .into_iter()
            .map(|e| e.into_payload())
            .find_map(|e| match e {
                LedgerEvent::Sale(s) if s.event_id == event_id => Some(s.identity),
                _ => None,
            })
            .ok_or_else(|| FinalizeError::InvalidRequest(format!("sale event {event_id} not found")))?;
        let history = self
            .ledger
            .correctable(&identity, event_id)?
            .ok_or_else(|| FinalizeError::InvalidRequest(format!("sale event {event_id} is itself a correction")))?;
        let remaining = history.remaining_quantity();
        let qty = i64::from(quantity);
        if qty > remaining {
            return Err(FinalizeError::InvalidRequest(format!(
                "cannot reverse {quantity} units; {remaining} of {} remain on the sale",
                history.original.quantity
            )));
        }

        // Shipping still on the sale is split between the reversed and kept units.
        let share = apportion(history.remaining_shipping(), &[u64::from(quantity), (remaining - qty) as u64])?;
        let original = history.original;
        let reversal = SaleEvent {
            event_id: Uuid::now_v7(),
            occurred_at: Utc::now(),
            quantity: -qty,
            shipping_fee: -share[0],
            staff: self.staff_name(None),
            management_numbers: Vec::new(),
            corrects: Some(original.event_id),
            ..original
        };
        self.ledger.append_sale(reversal.clone())?;
        info!(event_id = %reversal.event_id, corrects = %event_id, quantity, "sale corrected");
        Ok(reversal)
    }

    pub fn query(&self, filter: &LedgerFilter, page: PageRequest, as_of: NaiveDate) -> Result<LedgerPage, FinalizeError> {
        Ok(self.ledger.query(filter, page, as_of)?)
    }
}
