use common::UserId;
use criterion::{Criterion, criterion_group, criterion_main};
use document_store::InMemoryDocumentStore;
use domain::{
    CartLine, CatalogEntry, DocumentCatalog, DocumentOrderRepository, InMemoryEventPublisher,
    Money, OrderService, PlaceOrder, StockPolicy,
    order::{check_line, validate_cart},
};

fn seeded_catalog(
    rt: &tokio::runtime::Runtime,
    products: usize,
) -> (DocumentCatalog<InMemoryDocumentStore>, Vec<CartLine>) {
    let catalog = DocumentCatalog::new(InMemoryDocumentStore::new());
    let producer = UserId::new();
    let lines = rt.block_on(async {
        let mut lines = Vec::with_capacity(products);
        for i in 0..products {
            let entry = CatalogEntry::new(
                producer,
                format!("Product {i}"),
                Money::from_cents(100 + i as i64),
                u32::MAX,
            );
            let stored = catalog.insert_entry(&entry).await.unwrap();
            lines.push(CartLine::new(stored.id, 1));
        }
        lines
    });
    (catalog, lines)
}

fn bench_check_line(c: &mut Criterion) {
    let entry = CatalogEntry::new(UserId::new(), "Bench", Money::from_cents(250), 100);
    let line = CartLine::new(entry.id, 3);

    c.bench_function("domain/check_line", |b| {
        b.iter(|| check_line(&line, Some(&entry)).unwrap());
    });
}

fn bench_validate_cart(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (catalog, lines) = seeded_catalog(&rt, 10);

    c.bench_function("domain/validate_cart_10_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                validate_cart(&catalog, &lines).await.unwrap();
            });
        });
    });
}

fn bench_place_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    for policy in [StockPolicy::Check, StockPolicy::Reserve] {
        let (catalog, lines) = seeded_catalog(&rt, 5);
        let repository = DocumentOrderRepository::new(InMemoryDocumentStore::new());
        let service = OrderService::new(repository, catalog, InMemoryEventPublisher::new())
            .with_stock_policy(policy);

        c.bench_function(&format!("domain/place_order_{policy}"), |b| {
            b.iter(|| {
                rt.block_on(async {
                    service
                        .place_order(PlaceOrder::new(UserId::new(), lines.clone()))
                        .await
                        .unwrap();
                });
            });
        });
    }
}

criterion_group!(
    benches,
    bench_check_line,
    bench_validate_cart,
    bench_place_order
);
criterion_main!(benches);
