//! Migration of historical flat sale records.
//!
//! Three schema generations exist in old exports. Each upgrades explicitly to
//! the next; only the newest converts into a [`SaleEvent`].

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use lotkeeper_core::{BuyerRef, Counterpart, InventoryIdentity, LotId, ProductDescriptor, SaleId};
use lotkeeper_pricing::{ExchangeRate, LedgerAmount, SettlementAmount};

use crate::event::{LedgerEvent, SaleEvent};
use crate::record::LedgerRecord;

/// Namespace for deterministic ids of migrated events.
const LEGACY_NAMESPACE: Uuid = Uuid::from_u128(0x6c6f_746b_6565_7065_725f_6c65_6761_6379);

/// Oldest format: single unit, ledger-currency price only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacySaleV1 {
    pub item_id: String,
    pub item_name: String,
    pub price_yen: i64,
    pub sold_at: DateTime<Utc>,
    pub buyer_name: String,
    #[serde(default)]
    pub channel: String,
}

/// Adds quantity and the settlement-currency price with its rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacySaleV2 {
    pub item_id: String,
    pub item_name: String,
    pub quantity: i64,
    pub price_yen: i64,
    #[serde(default)]
    pub price_usd: Option<SettlementAmount>,
    #[serde(default)]
    pub rate: Option<ExchangeRate>,
    pub sold_at: DateTime<Utc>,
    pub buyer_name: String,
    #[serde(default)]
    pub channel: String,
}

/// Adds lot linkage, management numbers, shipping, staff and the seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacySaleV3 {
    #[serde(default)]
    pub lot_id: Option<LotId>,
    pub item_id: String,
    pub item_name: String,
    #[serde(default)]
    pub color: Option<String>,
    pub quantity: i64,
    pub price_yen: i64,
    #[serde(default)]
    pub price_usd: Option<SettlementAmount>,
    #[serde(default)]
    pub rate: Option<ExchangeRate>,
    pub sold_at: DateTime<Utc>,
    pub buyer_name: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub management_numbers: Vec<String>,
    #[serde(default)]
    pub shipping_fee_yen: i64,
    #[serde(default)]
    pub staff: Option<String>,
    #[serde(default)]
    pub counterpart: Option<Counterpart>,
}

impl LegacySaleV1 {
    pub fn upgrade(self) -> LegacySaleV2 {
        LegacySaleV2 {
            item_id: self.item_id,
            item_name: self.item_name,
            quantity: 1,
            price_yen: self.price_yen,
            price_usd: None,
            rate: None,
            sold_at: self.sold_at,
            buyer_name: self.buyer_name,
            channel: self.channel,
        }
    }
}

impl LegacySaleV2 {
    pub fn upgrade(self) -> LegacySaleV3 {
        LegacySaleV3 {
            lot_id: None,
            item_id: self.item_id,
            item_name: self.item_name,
            color: None,
            quantity: self.quantity,
            price_yen: self.price_yen,
            price_usd: self.price_usd,
            rate: self.rate,
            sold_at: self.sold_at,
            buyer_name: self.buyer_name,
            channel: self.channel,
            management_numbers: Vec::new(),
            shipping_fee_yen: 0,
            staff: None,
            counterpart: None,
        }
    }
}

impl LegacySaleV3 {
    pub fn identity(&self) -> InventoryIdentity {
        match self.lot_id {
            Some(lot) => InventoryIdentity::Lot(lot),
            None => InventoryIdentity::LegacyItem(self.item_id.trim().to_string()),
        }
    }

    /// The duplicate-detection tuple: item, price, timestamp, counterpart
    /// (buyer) and channel, compared exactly.
    fn dedup_key(&self) -> DedupKey {
        DedupKey {
            identity: self.identity(),
            price_yen: self.price_yen,
            sold_at: self.sold_at,
            buyer_name: self.buyer_name.clone(),
            channel: self.channel.clone(),
        }
    }

    fn into_event(self) -> SaleEvent {
        let key = self.dedup_key().id_name();
        let identity = self.identity();
        // Built without validation: a blank name is kept and later flagged.
        let descriptor = ProductDescriptor {
            console: self.item_name,
            software: None,
            color: self.color,
        };
        SaleEvent {
            event_id: Uuid::new_v5(&LEGACY_NAMESPACE, format!("event|{key}").as_bytes()),
            sale_id: SaleId::from_uuid(Uuid::new_v5(&LEGACY_NAMESPACE, format!("sale|{key}").as_bytes())),
            identity,
            occurred_at: self.sold_at,
            descriptor,
            buyer: BuyerRef::named(self.buyer_name),
            quantity: self.quantity,
            unit_price_settlement: self.price_usd,
            unit_price_ledger: LedgerAmount::new(self.price_yen),
            exchange_rate: self.rate,
            shipping_fee: LedgerAmount::new(self.shipping_fee_yen),
            channel: self.channel,
            staff: self.staff,
            management_numbers: self.management_numbers,
            unit_cost: None,
            origin_counterpart: self.counterpart,
            corrects: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    identity: InventoryIdentity,
    price_yen: i64,
    sold_at: DateTime<Utc>,
    buyer_name: String,
    channel: String,
}

impl DedupKey {
    /// Stable name for deterministic ids. Every field is length-prefixed so
    /// separators inside free text cannot make two keys collide.
    fn id_name(&self) -> String {
        [
            self.identity.to_string(),
            self.price_yen.to_string(),
            self.sold_at.to_rfc3339(),
            self.buyer_name.clone(),
            self.channel.clone(),
        ]
        .iter()
        .map(|field| format!("{}:{field}", field.len()))
        .collect::<Vec<_>>()
        .join("|")
    }
}

/// A historical record in any supported schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "schema", rename_all = "lowercase")]
pub enum LegacySaleRecord {
    V1(LegacySaleV1),
    V2(LegacySaleV2),
    V3(LegacySaleV3),
}

impl LegacySaleRecord {
    pub fn into_latest(self) -> LegacySaleV3 {
        match self {
            LegacySaleRecord::V1(r) => r.upgrade().upgrade(),
            LegacySaleRecord::V2(r) => r.upgrade(),
            LegacySaleRecord::V3(r) => r,
        }
    }
}

/// Output of a migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOutcome {
    /// Deduplicated events, ready to append to the ledger log.
    pub events: Vec<SaleEvent>,
    /// One record per originating lot/item, in identity order.
    pub records: Vec<LedgerRecord>,
    pub duplicates: usize,
    /// Rows skipped because their quantity was zero or negative.
    pub rejected: usize,
}

/// Group flat records by originating lot/item and fold each group into one
/// record, dropping exact duplicates of the (item, price, timestamp,
/// counterpart, channel) tuple. Event ids are derived from that tuple, so a
/// second run over the same input yields identical events. Rows without a
/// positive quantity are skipped and counted, never appended.
pub fn migrate_legacy(records: impl IntoIterator<Item = LegacySaleRecord>) -> MigrationOutcome {
    let mut seen = HashSet::new();
    let mut duplicates = 0;
    let mut rejected = 0;
    let mut groups: BTreeMap<InventoryIdentity, Vec<LedgerEvent>> = BTreeMap::new();
    let mut events = Vec::new();

    for record in records {
        let latest = record.into_latest();
        if latest.quantity <= 0 {
            warn!(
                item = %latest.identity(),
                quantity = latest.quantity,
                sold_at = %latest.sold_at,
                "legacy sale without a positive quantity skipped"
            );
            rejected += 1;
            continue;
        }
        let key = latest.dedup_key();
        if !seen.insert(key.clone()) {
            debug!(key = %key.id_name(), "duplicate legacy sale dropped");
            duplicates += 1;
            continue;
        }
        let event = latest.into_event();
        groups
            .entry(event.identity.clone())
            .or_default()
            .push(LedgerEvent::Sale(event.clone()));
        events.push(event);
    }

    let records: Vec<LedgerRecord> = groups
        .iter()
        .filter_map(|(identity, evs)| LedgerRecord::rebuild(identity, evs))
        .collect();

    info!(
        events = events.len(),
        records = records.len(),
        duplicates,
        rejected,
        "legacy sales migrated"
    );

    MigrationOutcome {
        events,
        records,
        duplicates,
        rejected,
    }
}
