//! Ledger records: one per inventory identity, folded from its events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lotkeeper_core::{Counterpart, InventoryIdentity, LotSource, ProductDescriptor, Rank};
use lotkeeper_events::{Event, Projection};
use lotkeeper_pricing::LedgerAmount;

use crate::event::{LedgerEvent, PurchaseEvent, SaleEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    InStock,
    Partial,
    Sold,
}

impl LedgerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerStatus::InStock => "in_stock",
            LedgerStatus::Partial => "partial",
            LedgerStatus::Sold => "sold",
        }
    }
}

/// Compliance-report unit for one inventory identity.
///
/// Counterpart fields come from the earliest purchase (or, for migrated
/// records without one, from the earliest sale that carries them) and survive
/// every rebuild regardless of how many sales exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub identity: InventoryIdentity,
    pub descriptor: Option<ProductDescriptor>,
    pub rank: Option<Rank>,
    pub source: Option<LotSource>,
    pub counterpart: Option<Counterpart>,
    pub first_purchase_at: Option<DateTime<Utc>>,
    pub last_sale_at: Option<DateTime<Utc>>,
    /// Per-unit price of the first purchase, else of the first sale.
    pub unit_price: Option<LedgerAmount>,
    pub purchased_quantity: i64,
    pub purchase_cost: LedgerAmount,
    pub sold_quantity: i64,
    pub revenue: LedgerAmount,
    /// Cost basis of the units sold.
    pub cost_of_sales: LedgerAmount,
    pub shipping: LedgerAmount,
    pub profit: LedgerAmount,
    pub status: LedgerStatus,
    /// Every management number seen on a purchase or sale, first-seen order.
    pub management_numbers: Vec<String>,
    pub buyers: Vec<String>,
    pub channels: Vec<String>,
    /// Business time of every event, ascending.
    pub event_dates: Vec<DateTime<Utc>>,
}

impl LedgerRecord {
    /// Fold `events` into the record for `identity`.
    ///
    /// Events for other identities are ignored. Input order does not matter:
    /// events are folded by (occurred_at, event_id). Returns `None` when no
    /// event belongs to `identity`.
    pub fn rebuild<'a, I>(identity: &InventoryIdentity, events: I) -> Option<LedgerRecord>
    where
        I: IntoIterator<Item = &'a LedgerEvent>,
    {
        let mut relevant: Vec<&LedgerEvent> = events
            .into_iter()
            .filter(|e| e.identity() == identity)
            .collect();
        if relevant.is_empty() {
            return None;
        }
        relevant.sort_by_key(|e| e.sort_key());

        let mut fold = LedgerFold::new(identity.clone());
        fold.apply_all(relevant);
        Some(fold.finish())
    }

    /// Ordering key for listings: last sale, else first purchase.
    pub fn activity_at(&self) -> Option<DateTime<Utc>> {
        self.last_sale_at.or(self.first_purchase_at)
    }

    pub fn transaction_at(&self) -> Option<DateTime<Utc>> {
        self.first_purchase_at.or(self.event_dates.first().copied())
    }

    pub fn remaining_quantity(&self) -> i64 {
        self.purchased_quantity - self.sold_quantity
    }
}

/// Running state of a record fold. Implements [`Projection`] over ledger
/// events; callers present events in canonical order.
#[derive(Debug, Clone)]
pub struct LedgerFold {
    identity: InventoryIdentity,
    purchase_descriptor: Option<ProductDescriptor>,
    sale_descriptor: Option<ProductDescriptor>,
    rank: Option<Rank>,
    source: Option<LotSource>,
    purchase_counterpart: Option<Counterpart>,
    sale_counterpart: Option<Counterpart>,
    first_purchase_at: Option<DateTime<Utc>>,
    last_sale_at: Option<DateTime<Utc>>,
    purchase_unit_price: Option<LedgerAmount>,
    sale_unit_price: Option<LedgerAmount>,
    purchased_quantity: i64,
    purchase_cost: LedgerAmount,
    sold_quantity: i64,
    revenue: LedgerAmount,
    known_cost: LedgerAmount,
    uncosted_quantity: i64,
    shipping: LedgerAmount,
    management_numbers: Vec<String>,
    buyers: Vec<String>,
    channels: Vec<String>,
    event_dates: Vec<DateTime<Utc>>,
}

impl LedgerFold {
    pub fn new(identity: InventoryIdentity) -> Self {
        Self {
            identity,
            purchase_descriptor: None,
            sale_descriptor: None,
            rank: None,
            source: None,
            purchase_counterpart: None,
            sale_counterpart: None,
            first_purchase_at: None,
            last_sale_at: None,
            purchase_unit_price: None,
            sale_unit_price: None,
            purchased_quantity: 0,
            purchase_cost: LedgerAmount::ZERO,
            sold_quantity: 0,
            revenue: LedgerAmount::ZERO,
            known_cost: LedgerAmount::ZERO,
            uncosted_quantity: 0,
            shipping: LedgerAmount::ZERO,
            management_numbers: Vec::new(),
            buyers: Vec::new(),
            channels: Vec::new(),
            event_dates: Vec::new(),
        }
    }

    fn apply_purchase(&mut self, e: &PurchaseEvent) {
        // Earliest purchase owns the identity fields.
        if self.first_purchase_at.is_none_or(|t| e.occurred_at < t) {
            self.first_purchase_at = Some(e.occurred_at);
            self.purchase_descriptor = Some(e.descriptor.clone());
            self.rank = e.rank;
            self.source = Some(e.source);
            self.purchase_counterpart = Some(e.counterpart.clone());
            self.purchase_unit_price = Some(e.unit_price);
        }
        let qty = i64::from(e.quantity);
        self.purchased_quantity += qty;
        self.purchase_cost = self.purchase_cost + LedgerAmount::new(e.unit_price.units().saturating_mul(qty));
        push_unique(&mut self.management_numbers, &e.management_numbers);
    }

    fn apply_sale(&mut self, e: &SaleEvent) {
        if self.last_sale_at.is_none_or(|t| e.occurred_at >= t) && !e.is_compensating() {
            self.last_sale_at = Some(e.occurred_at);
        }
        if self.sale_descriptor.is_none() {
            self.sale_descriptor = Some(e.descriptor.clone());
            self.sale_unit_price = Some(e.unit_price_ledger);
        }
        if self.sale_counterpart.is_none() {
            self.sale_counterpart = e.origin_counterpart.clone();
        }
        self.sold_quantity += e.quantity;
        self.revenue = self.revenue + e.revenue();
        self.shipping = self.shipping + e.shipping_fee;
        match e.unit_cost {
            Some(cost) => {
                self.known_cost = self.known_cost + LedgerAmount::new(cost.units().saturating_mul(e.quantity))
            }
            None => self.uncosted_quantity += e.quantity,
        }
        push_unique(&mut self.management_numbers, &e.management_numbers);
        if !e.is_compensating() {
            push_unique(&mut self.buyers, std::slice::from_ref(&e.buyer.name));
            push_unique(&mut self.channels, std::slice::from_ref(&e.channel));
        }
    }

    /// Units sold without a recorded cost are charged at the average
    /// purchase price, rounded half away from zero.
    fn cost_of_sales(&self) -> LedgerAmount {
        if self.uncosted_quantity == 0 || self.purchased_quantity <= 0 {
            return self.known_cost;
        }
        let num = i128::from(self.purchase_cost.units()) * i128::from(self.uncosted_quantity);
        let den = i128::from(self.purchased_quantity);
        let half = den / 2;
        let rounded = if num >= 0 { (num + half) / den } else { (num - half) / den };
        let implied = i64::try_from(rounded).unwrap_or(if num >= 0 { i64::MAX } else { i64::MIN });
        self.known_cost + LedgerAmount::new(implied)
    }

    pub fn finish(self) -> LedgerRecord {
        let cost_of_sales = self.cost_of_sales();
        let status = if self.sold_quantity <= 0 {
            LedgerStatus::InStock
        } else if self.sold_quantity >= self.purchased_quantity {
            LedgerStatus::Sold
        } else {
            LedgerStatus::Partial
        };
        let mut event_dates = self.event_dates;
        event_dates.sort();

        LedgerRecord {
            identity: self.identity,
            descriptor: self.purchase_descriptor.or(self.sale_descriptor),
            rank: self.rank,
            source: self.source,
            counterpart: self.purchase_counterpart.or(self.sale_counterpart),
            first_purchase_at: self.first_purchase_at,
            last_sale_at: self.last_sale_at,
            unit_price: self.purchase_unit_price.or(self.sale_unit_price),
            purchased_quantity: self.purchased_quantity,
            purchase_cost: self.purchase_cost,
            sold_quantity: self.sold_quantity,
            revenue: self.revenue,
            cost_of_sales,
            shipping: self.shipping,
            profit: self.revenue - cost_of_sales - self.shipping,
            status,
            management_numbers: self.management_numbers,
            buyers: self.buyers,
            channels: self.channels,
            event_dates,
        }
    }
}

impl Projection for LedgerFold {
    type Ev = LedgerEvent;

    fn apply(&mut self, event: &LedgerEvent) {
        if event.identity() != &self.identity {
            return;
        }
        self.event_dates.push(event.occurred_at());
        match event {
            LedgerEvent::Purchase(e) => self.apply_purchase(e),
            LedgerEvent::Sale(e) => self.apply_sale(e),
        }
    }
}

fn push_unique(into: &mut Vec<String>, values: &[String]) {
    for v in values {
        if !v.trim().is_empty() && !into.contains(v) {
            into.push(v.clone());
        }
    }
}
