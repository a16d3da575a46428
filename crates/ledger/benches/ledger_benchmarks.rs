use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use lotkeeper_core::{BuyerRef, Counterpart, LotId, LotSource, ProductDescriptor, Rank, SaleId};
use lotkeeper_ledger::{
    InMemoryLedgerEventLog, LedgerAggregator, LedgerFilter, PageRequest, PurchaseEvent, SaleEvent, TransactionFilter,
};
use lotkeeper_pricing::LedgerAmount;
use uuid::Uuid;

fn seeded(lots: usize, sales_per_lot: u32) -> LedgerAggregator<InMemoryLedgerEventLog> {
    let agg = LedgerAggregator::new(InMemoryLedgerEventLog::new());
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let descriptor = ProductDescriptor {
        console: "Switch OLED".into(),
        software: None,
        color: Some("White".into()),
    };

    for i in 0..lots {
        let lot = LotId::new();
        let bought = start + Duration::hours(i as i64);
        agg.append_purchase(PurchaseEvent {
            event_id: Uuid::now_v7(),
            identity: lot.into(),
            occurred_at: bought,
            descriptor: descriptor.clone(),
            rank: Some(Rank::A),
            quantity: sales_per_lot,
            unit_price: LedgerAmount::new(3000),
            management_numbers: (0..sales_per_lot).map(|n| format!("M-{i}-{n}")).collect(),
            source: LotSource::CustomerBuyback,
            counterpart: Counterpart::individual(format!("Seller {i}")).with_address("Tokyo"),
            registered_by: None,
        })
        .unwrap();

        for n in 0..sales_per_lot {
            agg.append_sale(SaleEvent {
                event_id: Uuid::now_v7(),
                sale_id: SaleId::new(),
                identity: lot.into(),
                occurred_at: bought + Duration::days(i64::from(n) + 1),
                descriptor: descriptor.clone(),
                buyer: BuyerRef::named(format!("Buyer {n}")),
                quantity: 1,
                unit_price_settlement: None,
                unit_price_ledger: LedgerAmount::new(3750),
                exchange_rate: None,
                shipping_fee: LedgerAmount::new(200),
                channel: "ebay".into(),
                staff: None,
                management_numbers: vec![format!("M-{i}-{n}")],
                unit_cost: Some(LedgerAmount::new(3000)),
                origin_counterpart: None,
                corrects: None,
            })
            .unwrap();
        }
    }
    agg
}

fn bench_rebuild_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_rebuild_all");
    for lots in [100usize, 1_000] {
        let agg = seeded(lots, 3);
        group.throughput(Throughput::Elements(lots as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lots), &agg, |b, agg| {
            b.iter(|| black_box(agg.rebuild_all().unwrap()));
        });
    }
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let agg = seeded(1_000, 3);
    let as_of = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let mut group = c.benchmark_group("ledger_query");

    group.bench_function("all_rows", |b| {
        b.iter(|| black_box(agg.query(&LedgerFilter::default(), PageRequest::all(), as_of).unwrap()));
    });

    let filter = LedgerFilter {
        transaction: TransactionFilter::WithSale,
        party: Some("seller 42".into()),
        ..Default::default()
    };
    group.bench_function("text_filter_paged", |b| {
        b.iter(|| black_box(agg.query(&filter, PageRequest::new(1, 50), as_of).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_rebuild_all, bench_query);
criterion_main!(benches);
