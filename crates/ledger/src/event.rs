//! Ledger events: the append-only facts a ledger record is folded from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lotkeeper_core::{BuyerRef, Counterpart, InventoryIdentity, LotSource, ProductDescriptor, Rank, SaleId, UserId};
use lotkeeper_events::Event;
use lotkeeper_pricing::{ExchangeRate, LedgerAmount, SettlementAmount};

/// A lot registration (buyback or supplier intake).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseEvent {
    pub event_id: Uuid,
    pub identity: InventoryIdentity,
    pub occurred_at: DateTime<Utc>,
    pub descriptor: ProductDescriptor,
    #[serde(default)]
    pub rank: Option<Rank>,
    pub quantity: u32,
    pub unit_price: LedgerAmount,
    #[serde(default)]
    pub management_numbers: Vec<String>,
    pub source: LotSource,
    pub counterpart: Counterpart,
    #[serde(default)]
    pub registered_by: Option<UserId>,
}

/// One finalized disposition of units from a single identity.
///
/// A negative `quantity` is a compensating event; `corrects` then names the
/// sale event it reverses in full or in part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleEvent {
    pub event_id: Uuid,
    pub sale_id: SaleId,
    pub identity: InventoryIdentity,
    pub occurred_at: DateTime<Utc>,
    pub descriptor: ProductDescriptor,
    pub buyer: BuyerRef,
    pub quantity: i64,
    #[serde(default)]
    pub unit_price_settlement: Option<SettlementAmount>,
    pub unit_price_ledger: LedgerAmount,
    #[serde(default)]
    pub exchange_rate: Option<ExchangeRate>,
    /// Seller-borne shipping apportioned to this event.
    #[serde(default)]
    pub shipping_fee: LedgerAmount,
    pub channel: String,
    #[serde(default)]
    pub staff: Option<String>,
    #[serde(default)]
    pub management_numbers: Vec<String>,
    /// Acquisition cost per unit, when known.
    #[serde(default)]
    pub unit_cost: Option<LedgerAmount>,
    /// Seller identity carried on migrated records that have no purchase event.
    #[serde(default)]
    pub origin_counterpart: Option<Counterpart>,
    #[serde(default)]
    pub corrects: Option<Uuid>,
}

impl SaleEvent {
    pub fn is_compensating(&self) -> bool {
        self.quantity < 0
    }

    pub fn revenue(&self) -> LedgerAmount {
        LedgerAmount::new(self.unit_price_ledger.units().saturating_mul(self.quantity))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    Purchase(PurchaseEvent),
    Sale(SaleEvent),
}

impl LedgerEvent {
    pub fn as_sale(&self) -> Option<&SaleEvent> {
        match self {
            LedgerEvent::Sale(s) => Some(s),
            LedgerEvent::Purchase(_) => None,
        }
    }

    /// Canonical fold order: business time, then event id.
    pub fn sort_key(&self) -> (DateTime<Utc>, Uuid) {
        (self.occurred_at(), self.event_id())
    }
}

impl Event for LedgerEvent {
    fn event_id(&self) -> Uuid {
        match self {
            LedgerEvent::Purchase(e) => e.event_id,
            LedgerEvent::Sale(e) => e.event_id,
        }
    }

    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::Purchase(_) => "ledger.purchase.recorded",
            LedgerEvent::Sale(_) => "ledger.sale.recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::Purchase(e) => e.occurred_at,
            LedgerEvent::Sale(e) => e.occurred_at,
        }
    }

    fn identity(&self) -> &InventoryIdentity {
        match self {
            LedgerEvent::Purchase(e) => &e.identity,
            LedgerEvent::Sale(e) => &e.identity,
        }
    }
}

impl From<PurchaseEvent> for LedgerEvent {
    fn from(value: PurchaseEvent) -> Self {
        LedgerEvent::Purchase(value)
    }
}

impl From<SaleEvent> for LedgerEvent {
    fn from(value: SaleEvent) -> Self {
        LedgerEvent::Sale(value)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;
    use lotkeeper_core::LotId;

    pub fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap()
    }

    pub fn descriptor() -> ProductDescriptor {
        ProductDescriptor::new("Switch OLED").unwrap().with_color("White")
    }

    pub fn seller() -> Counterpart {
        Counterpart::individual("Taro Yamada")
            .with_address("1-2-3 Shibuya, Tokyo")
            .with_occupation("Engineer")
            .with_birth_date(chrono::NaiveDate::from_ymd_opt(1990, 6, 15).unwrap())
            .with_id_document("DL-12345")
    }

    pub fn purchase(lot: LotId, day: u32, quantity: u32, unit_price: i64) -> PurchaseEvent {
        PurchaseEvent {
            event_id: Uuid::now_v7(),
            identity: lot.into(),
            occurred_at: at(day),
            descriptor: descriptor(),
            rank: Some(Rank::A),
            quantity,
            unit_price: LedgerAmount::new(unit_price),
            management_numbers: (1..=quantity).map(|n| format!("M-{n:03}")).collect(),
            source: LotSource::CustomerBuyback,
            counterpart: seller(),
            registered_by: None,
        }
    }

    pub fn sale(lot: LotId, day: u32, quantity: i64, unit_price: i64) -> SaleEvent {
        SaleEvent {
            event_id: Uuid::now_v7(),
            sale_id: SaleId::new(),
            identity: lot.into(),
            occurred_at: at(day),
            descriptor: descriptor(),
            buyer: BuyerRef::named("Alice Smith"),
            quantity,
            unit_price_settlement: None,
            unit_price_ledger: LedgerAmount::new(unit_price),
            exchange_rate: None,
            shipping_fee: LedgerAmount::ZERO,
            channel: "ebay".to_string(),
            staff: None,
            management_numbers: Vec::new(),
            unit_cost: None,
            origin_counterpart: None,
            corrects: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use lotkeeper_core::LotId;

    #[test]
    fn compensating_sale_has_negative_revenue() {
        let s = sale(LotId::new(), 2, -2, 1000);
        assert!(s.is_compensating());
        assert_eq!(s.revenue(), LedgerAmount::new(-2000));
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let e: LedgerEvent = purchase(LotId::new(), 1, 1, 100).into();
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "purchase");
        let back: LedgerEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, e);
    }
}
