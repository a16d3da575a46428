//! End-to-end sale flows against in-memory stores and a fake inventory service.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use lotkeeper_core::{BuyerRef, Counterpart, InventoryIdentity, LotId, ProductDescriptor, Rank};
use lotkeeper_engine::{
    Collaborators, FinalizeError, FixedRate, InMemoryProductMaster, ProductInfo, RequestLine, SaleEngine, SaleRequest,
    StaticIdentity,
};
use lotkeeper_inventory::{
    Allocation, AllocationError, InMemoryLotStore, LotIntake, LotSource, LotStore,
};
use lotkeeper_ledger::{
    InMemoryLedgerEventLog, LedgerEvent, LedgerEventLog, LedgerFilter, LedgerStatus, MissingField, PageRequest,
    export_csv,
};
use lotkeeper_pricing::{ExchangeRate, LedgerAmount, SaleLine, SettlementAmount, ShippingTerms};
use lotkeeper_sync::{
    ActivityLog, ActivityStatus, InMemoryActivityLog, InventoryService, OutboundShipment, QuantityUpdate, RemoteError,
    RemoteItem, RemoteRecord, RetryPolicy, SyncAction, SyncAdapter,
};

/// Records every push; fails all of them when `down` is set. Quantity
/// updates are applied once per idempotency key, as a real remote would.
#[derive(Default)]
struct FakeService {
    down: bool,
    outbound: Mutex<Vec<OutboundShipment>>,
    quantities: Mutex<Vec<QuantityUpdate>>,
    applied_keys: Mutex<HashSet<Uuid>>,
    remote_counts: Mutex<HashMap<LotId, u32>>,
}

impl FakeService {
    fn unreachable() -> Self {
        Self {
            down: true,
            ..Default::default()
        }
    }

    fn remote_count(&self, lot: LotId) -> Option<u32> {
        self.remote_counts.lock().unwrap().get(&lot).copied()
    }

    fn check(&self) -> Result<(), RemoteError> {
        if self.down {
            return Err(RemoteError::Network("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryService for FakeService {
    async fn create_outbound(&self, _key: Uuid, shipment: &OutboundShipment) -> Result<RemoteRecord, RemoteError> {
        self.check()?;
        self.outbound.lock().unwrap().push(shipment.clone());
        Ok(RemoteRecord {
            id: format!("OUT-{}", shipment.sale_id),
        })
    }

    async fn update_quantity(&self, key: Uuid, update: &QuantityUpdate) -> Result<RemoteRecord, RemoteError> {
        self.check()?;
        self.quantities.lock().unwrap().push(update.clone());
        if self.applied_keys.lock().unwrap().insert(key) {
            self.remote_counts.lock().unwrap().insert(update.lot_id, update.quantity);
        }
        Ok(RemoteRecord {
            id: format!("EXT-{}", update.lot_id),
        })
    }

    async fn list_page(&self, _page: u32, _page_size: u32) -> Result<Vec<RemoteItem>, RemoteError> {
        self.check()?;
        Ok(Vec::new())
    }
}

type TestEngine = SaleEngine<InMemoryLotStore, InMemoryLedgerEventLog, Arc<FakeService>, InMemoryActivityLog>;

fn test_descriptor() -> ProductDescriptor {
    ProductDescriptor::new("Switch OLED").unwrap().with_color("White")
}

fn test_seller() -> Counterpart {
    Counterpart::individual("Taro Yamada")
        .with_address("1-2-3 Shibuya, Tokyo")
        .with_occupation("Engineer")
        .with_birth_date(NaiveDate::from_ymd_opt(1985, 4, 1).unwrap())
        .with_id_document("DL-99881")
}

fn test_intake(rank: Rank, price: i64, quantity: u32, counterpart: Counterpart) -> LotIntake {
    LotIntake {
        descriptor: test_descriptor(),
        rank,
        acquisition_unit_price: LedgerAmount::new(price),
        quantity,
        management_numbers: (1..=quantity).map(|n| format!("M-{n:03}")).collect(),
        source: LotSource::CustomerBuyback,
        counterpart,
        external_id: None,
        registered_by: None,
    }
}

fn test_engine(service: Arc<FakeService>) -> TestEngine {
    let policy = RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
    };
    let collaborators = Collaborators {
        identity: Arc::new(StaticIdentity::anonymous()),
        products: Arc::new(InMemoryProductMaster::new().with(
            test_descriptor(),
            ProductInfo {
                country_of_origin: Some("JP".into()),
                category: Some("game console".into()),
            },
        )),
        rates: Arc::new(FixedRate(ExchangeRate::from_f64(150.0).unwrap())),
    };
    SaleEngine::new(
        InMemoryLotStore::new(),
        InMemoryLedgerEventLog::new(),
        SyncAdapter::new(service, InMemoryActivityLog::new(), policy),
        collaborators,
    )
}

fn test_request(engine: &TestEngine, quantity: u32, cents: i64, allocations: Vec<Allocation>) -> SaleRequest {
    SaleRequest {
        context: engine.begin_sale().unwrap(),
        buyer: BuyerRef::named("Alice Smith"),
        lines: vec![RequestLine {
            line: SaleLine::new(test_descriptor(), quantity, SettlementAmount::from_cents(cents)),
            allocations,
        }],
        shipping: ShippingTerms::none(),
        channel: "ebay".into(),
        staff: None,
    }
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

#[tokio::test]
async fn full_lot_sale_books_profit_and_removes_lot() {
    let service = Arc::new(FakeService::default());
    let engine = test_engine(service.clone());
    let lot = engine
        .register_lot(test_intake(Rank::A, 3_000, 5, test_seller()))
        .await
        .unwrap()
        .lot;

    let request = test_request(
        &engine,
        5,
        2_500,
        vec![Allocation {
            lot_id: lot.id(),
            quantity: 5,
        }],
    );

    let preview = engine.preview(&request).unwrap();
    assert_eq!(preview.profit.revenue, LedgerAmount::new(18_750));
    assert_eq!(preview.profit.cost, LedgerAmount::new(15_000));
    assert_eq!(engine.allocator().store().get(lot.id()).unwrap().unwrap().available(), 5);

    let sale = engine.finalize(&request).await.unwrap();
    assert_eq!(sale.profit.revenue, LedgerAmount::new(18_750));
    assert_eq!(sale.profit.cost, LedgerAmount::new(15_000));
    assert_eq!(sale.profit.profit, LedgerAmount::new(3_750));
    assert_eq!(sale.events.len(), 1);
    assert_eq!(sale.events[0].management_numbers.len(), 5);
    assert_eq!(sale.depleted, vec![lot.id()]);
    assert!(sale.fully_synced());

    assert!(engine.allocator().store().get(lot.id()).unwrap().is_none());
    assert!(engine.allocator().store().list_available().unwrap().is_empty());

    let record = engine
        .ledger()
        .rebuild(&InventoryIdentity::from(lot.id()))
        .unwrap()
        .unwrap();
    assert_eq!(record.revenue, LedgerAmount::new(18_750));
    assert_eq!(record.cost_of_sales, LedgerAmount::new(15_000));
    assert_eq!(record.profit, LedgerAmount::new(3_750));
    assert_eq!(record.status, LedgerStatus::Sold);

    let shipments = service.outbound.lock().unwrap();
    assert_eq!(shipments.len(), 1);
    assert_eq!(shipments[0].lines[0].country_of_origin.as_deref(), Some("JP"));
    let quantities = service.quantities.lock().unwrap();
    assert_eq!(quantities.last().map(|q| q.quantity), Some(0));
}

#[tokio::test]
async fn better_rank_is_offered_before_cheaper_lot() {
    let engine = test_engine(Arc::new(FakeService::default()));
    let rank_b = engine
        .register_lot(test_intake(Rank::B, 2_000, 3, test_seller()))
        .await
        .unwrap()
        .lot;
    let rank_a = engine
        .register_lot(test_intake(Rank::A, 3_000, 2, test_seller()))
        .await
        .unwrap()
        .lot;

    let line = SaleLine::new(test_descriptor(), 4, SettlementAmount::from_cents(2_500));
    let candidates: Vec<LotId> = engine
        .allocator()
        .list_candidates(&line)
        .unwrap()
        .iter()
        .map(|l| l.id())
        .collect();
    assert_eq!(candidates, vec![rank_a.id(), rank_b.id()]);

    let pending = engine.allocator().auto_allocate(line).unwrap();
    assert_eq!(
        pending.allocations(),
        &[
            Allocation {
                lot_id: rank_a.id(),
                quantity: 2
            },
            Allocation {
                lot_id: rank_b.id(),
                quantity: 2
            },
        ]
    );
}

#[tokio::test]
async fn sync_outage_does_not_fail_the_sale() {
    let engine = test_engine(Arc::new(FakeService::unreachable()));
    let lot = engine
        .register_lot(test_intake(Rank::A, 3_000, 5, test_seller()))
        .await
        .unwrap()
        .lot;

    let request = test_request(
        &engine,
        2,
        2_500,
        vec![Allocation {
            lot_id: lot.id(),
            quantity: 2,
        }],
    );
    let sale = engine.finalize(&request).await.unwrap();
    assert!(!sale.fully_synced());
    assert_eq!(sale.profit.profit, LedgerAmount::new(1_500));

    assert_eq!(engine.allocator().store().get(lot.id()).unwrap().unwrap().available(), 3);

    let sales: Vec<_> = engine
        .ledger()
        .log()
        .load_all()
        .unwrap()
        .into_iter()
        .filter_map(|e| e.into_payload().as_sale().cloned())
        .collect();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].sale_id, sale.sale_id);

    let sale_id = sale.sale_id.to_string();
    let entries = engine.sync().activity().list().unwrap();
    let errors: Vec<_> = entries
        .iter()
        .filter(|e| e.status == ActivityStatus::Error)
        .filter(|e| e.reference.contains(&sale_id) || e.details.contains(&sale_id))
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].action, SyncAction::CreateOutbound);
    assert_eq!(errors[0].reference, format!("sale:{sale_id}"));
    assert_eq!(errors[0].attempts, 2);
}

#[tokio::test]
async fn lot_split_across_lines_reaches_remote_with_final_count() {
    let service = Arc::new(FakeService::default());
    let engine = test_engine(service.clone());
    let lot = engine
        .register_lot(test_intake(Rank::A, 3_000, 5, test_seller()))
        .await
        .unwrap()
        .lot;
    assert_eq!(service.remote_count(lot.id()), Some(5));

    let mut request = test_request(
        &engine,
        1,
        2_500,
        vec![Allocation {
            lot_id: lot.id(),
            quantity: 1,
        }],
    );
    request.lines.push(RequestLine {
        line: SaleLine::new(test_descriptor(), 2, SettlementAmount::from_cents(2_500)),
        allocations: vec![Allocation {
            lot_id: lot.id(),
            quantity: 2,
        }],
    });
    let sale = engine.finalize(&request).await.unwrap();
    assert!(sale.fully_synced());

    let local = engine.allocator().store().get(lot.id()).unwrap().unwrap().available();
    assert_eq!(local, 2);
    assert_eq!(service.remote_count(lot.id()), Some(local));
    let pushes_for_sale = service
        .quantities
        .lock()
        .unwrap()
        .iter()
        .filter(|q| q.cause == format!("sale:{}", sale.sale_id))
        .count();
    assert_eq!(pushes_for_sale, 1);
}

#[tokio::test]
async fn intake_adopts_the_remote_id() {
    let engine = test_engine(Arc::new(FakeService::default()));
    let registered = engine
        .register_lot(test_intake(Rank::A, 3_000, 2, test_seller()))
        .await
        .unwrap();
    let expected = format!("EXT-{}", registered.lot.id());
    assert_eq!(registered.lot.external_id(), Some(expected.as_str()));
    let stored = engine.allocator().store().get(registered.lot.id()).unwrap().unwrap();
    assert_eq!(stored.external_id(), Some(expected.as_str()));

    let offline = test_engine(Arc::new(FakeService::unreachable()));
    let unsynced = offline
        .register_lot(test_intake(Rank::A, 3_000, 2, test_seller()))
        .await
        .unwrap();
    assert_eq!(unsynced.lot.external_id(), None);
}

#[tokio::test]
async fn finalizing_the_same_sale_twice_is_refused() {
    let engine = test_engine(Arc::new(FakeService::default()));
    let lot = engine
        .register_lot(test_intake(Rank::A, 3_000, 5, test_seller()))
        .await
        .unwrap()
        .lot;
    let request = test_request(
        &engine,
        2,
        2_500,
        vec![Allocation {
            lot_id: lot.id(),
            quantity: 2,
        }],
    );
    engine.finalize(&request).await.unwrap();

    match engine.finalize(&request).await {
        Err(FinalizeError::AlreadyFinalized(id)) => assert_eq!(id, request.context.sale_id),
        other => panic!("expected already finalized, got {other:?}"),
    }
    assert_eq!(engine.allocator().store().get(lot.id()).unwrap().unwrap().available(), 3);
    let sales = engine
        .ledger()
        .log()
        .load_all()
        .unwrap()
        .into_iter()
        .filter(|e| matches!(e.payload(), LedgerEvent::Sale(_)))
        .count();
    assert_eq!(sales, 1);
}

#[tokio::test]
async fn missing_birth_date_is_flagged_not_hidden() {
    let engine = test_engine(Arc::new(FakeService::default()));
    let seller = Counterpart::individual("Hanako Sato")
        .with_address("4-5-6 Umeda, Osaka")
        .with_occupation("Nurse")
        .with_id_document("PP-4410");
    let lot = engine
        .register_lot(test_intake(Rank::A, 3_000, 2, seller))
        .await
        .unwrap()
        .lot;
    let request = test_request(
        &engine,
        1,
        2_500,
        vec![Allocation {
            lot_id: lot.id(),
            quantity: 1,
        }],
    );
    engine.finalize(&request).await.unwrap();

    let page = engine
        .query(&LedgerFilter::default(), PageRequest::all(), as_of())
        .unwrap();
    assert_eq!(page.total, 1);
    let row = &page.rows[0];
    assert_eq!(row.record.identity, InventoryIdentity::from(lot.id()));
    assert_eq!(row.record.status, LedgerStatus::Partial);
    assert!(!row.is_compliant());
    assert_eq!(row.missing, vec![MissingField::Age]);

    let mut out = Vec::new();
    export_csv(&page.rows, as_of(), &mut out).unwrap();
    let csv = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with(&format!("lot:{}", lot.id())));
    assert!(lines[1].ends_with(",false,age"));
}

#[tokio::test]
async fn over_allocation_is_rejected_before_any_mutation() {
    let engine = test_engine(Arc::new(FakeService::default()));
    let lot = engine
        .register_lot(test_intake(Rank::A, 3_000, 2, test_seller()))
        .await
        .unwrap()
        .lot;
    let request = test_request(
        &engine,
        3,
        2_500,
        vec![Allocation {
            lot_id: lot.id(),
            quantity: 3,
        }],
    );

    match engine.finalize(&request).await {
        Err(FinalizeError::Allocation(AllocationError::InsufficientStock { available, .. })) => {
            assert_eq!(available, 2)
        }
        other => panic!("expected insufficient stock, got {other:?}"),
    }
    assert_eq!(engine.allocator().store().get(lot.id()).unwrap().unwrap().available(), 2);
    let sales = engine
        .ledger()
        .log()
        .load_all()
        .unwrap()
        .into_iter()
        .filter(|e| matches!(e.payload(), LedgerEvent::Sale(_)))
        .count();
    assert_eq!(sales, 0);
}

#[tokio::test]
async fn correction_nets_out_a_sale() {
    let engine = test_engine(Arc::new(FakeService::default()));
    let lot = engine
        .register_lot(test_intake(Rank::A, 3_000, 5, test_seller()))
        .await
        .unwrap()
        .lot;
    let request = test_request(
        &engine,
        2,
        2_500,
        vec![Allocation {
            lot_id: lot.id(),
            quantity: 2,
        }],
    );
    let sale = engine.finalize(&request).await.unwrap();

    let reversal = engine.correct_sale(sale.events[0].event_id, 1).unwrap();
    assert_eq!(reversal.quantity, -1);
    assert_eq!(reversal.corrects, Some(sale.events[0].event_id));

    let record = engine
        .ledger()
        .rebuild(&InventoryIdentity::from(lot.id()))
        .unwrap()
        .unwrap();
    assert_eq!(record.sold_quantity, 1);
    assert_eq!(record.revenue, LedgerAmount::new(3_750));
}

#[tokio::test]
async fn repeated_corrections_cannot_reverse_more_than_was_sold() {
    let engine = test_engine(Arc::new(FakeService::default()));
    let lot = engine
        .register_lot(test_intake(Rank::A, 3_000, 5, test_seller()))
        .await
        .unwrap()
        .lot;
    let mut request = test_request(
        &engine,
        3,
        2_500,
        vec![Allocation {
            lot_id: lot.id(),
            quantity: 3,
        }],
    );
    request.shipping = ShippingTerms::seller_paid("EMS", LedgerAmount::new(900));
    let sale = engine.finalize(&request).await.unwrap();
    let original = sale.events[0].event_id;

    let first = engine.correct_sale(original, 2).unwrap();
    assert_eq!(first.shipping_fee, LedgerAmount::new(-600));

    match engine.correct_sale(original, 2) {
        Err(FinalizeError::InvalidRequest(reason)) => assert!(reason.contains("1 of 3 remain")),
        other => panic!("expected rejection, got {other:?}"),
    }

    let last = engine.correct_sale(original, 1).unwrap();
    assert_eq!(last.shipping_fee, LedgerAmount::new(-300));
    assert!(engine.correct_sale(original, 1).is_err());

    let record = engine
        .ledger()
        .rebuild(&InventoryIdentity::from(lot.id()))
        .unwrap()
        .unwrap();
    assert_eq!(record.sold_quantity, 0);
    assert_eq!(record.revenue, LedgerAmount::ZERO);
    assert_eq!(record.shipping, LedgerAmount::ZERO);
}
