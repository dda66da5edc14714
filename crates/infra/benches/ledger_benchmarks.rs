use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;

use stockroom_core::{CategoryId, UserId};
use stockroom_infra::{InMemoryInventoryStore, LedgerConfig, StockLedger};
use stockroom_inventory::{Item, MovementRequest, MovementType, NewCategory, NewItem};

type Ledger = StockLedger<Arc<InMemoryInventoryStore>>;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

fn seeded(rt: &tokio::runtime::Runtime, items: usize) -> (Ledger, CategoryId, Vec<Item>) {
    let ledger = StockLedger::new(Arc::new(InMemoryInventoryStore::new()), LedgerConfig::default());
    rt.block_on(async {
        let category = ledger
            .create_category(NewCategory {
                name: "Bench".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let mut created = Vec::with_capacity(items);
        for i in 0..items {
            let mut new_item = NewItem::new(format!("Item {i}"), category.id);
            new_item.initial_stock = 1_000_000;
            created.push(ledger.create_item(UserId::new(), new_item).await.unwrap());
        }
        (ledger, category.id, created)
    })
}

fn bench_record_movement(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("ledger_record_movement");
    group.throughput(Throughput::Elements(1));

    for history in [0usize, 10_000] {
        let (ledger, _, items) = seeded(&rt, 1);
        let item_id = items[0].id;
        rt.block_on(async {
            for _ in 0..history {
                let request = MovementRequest::new(item_id, UserId::new(), MovementType::Inflow, 1);
                ledger.record_movement(&request).await.unwrap();
            }
        });

        group.bench_with_input(BenchmarkId::from_parameter(history), &item_id, |b, item_id| {
            let user = UserId::new();
            let mut toggle = false;
            b.iter(|| {
                toggle = !toggle;
                let kind = if toggle { MovementType::Inflow } else { MovementType::Outflow };
                let request = MovementRequest::new(*item_id, user, kind, 1);
                rt.block_on(ledger.record_movement(black_box(&request))).unwrap()
            })
        });
    }
    group.finish();
}

fn bench_import(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("ledger_import_batch");

    for rows in [100usize, 1_000] {
        let mut csv = String::from("Name,Description,Current Stock,Min Stock,Location\n");
        for i in 0..rows {
            csv.push_str(&format!("Cable {i},Cat6,{},{},Shelf {}\n", i % 50, i % 5, i % 9));
        }
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &csv, |b, csv| {
            b.iter(|| {
                let (ledger, category_id, _) = seeded(&rt, 0);
                rt.block_on(ledger.import_batch(UserId::new(), black_box(csv), category_id))
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_audit(c: &mut Criterion) {
    let rt = runtime();
    let (ledger, _, items) = seeded(&rt, 1);
    let item_id = items[0].id;
    rt.block_on(async {
        for _ in 0..5_000 {
            let request = MovementRequest::new(item_id, UserId::new(), MovementType::Outflow, 1);
            ledger.record_movement(&request).await.unwrap();
        }
    });

    c.bench_function("ledger_audit_item_5000_movements", |b| {
        b.iter(|| rt.block_on(ledger.audit_item(black_box(item_id))).unwrap())
    });
}

criterion_group!(benches, bench_record_movement, bench_import, bench_audit);
criterion_main!(benches);
