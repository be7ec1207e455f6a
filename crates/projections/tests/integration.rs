//! Integration tests: OrderService placements → OrderViewProjector views.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use common::{ProductId, UserId};
use document_store::{InMemoryDocumentStore, Version};
use domain::{
    CartLine, CatalogEntry, CatalogLookup, DocumentCatalog, DocumentOrderRepository,
    DocumentUserDirectory, DomainError, InMemoryEventPublisher, Money, Order, OrderService,
    PlaceOrder, UserProfile,
};
use projections::OrderViewProjector;

type Catalog = DocumentCatalog<InMemoryDocumentStore>;
type Users = DocumentUserDirectory<InMemoryDocumentStore>;

/// Catalog wrapper counting product lookups.
#[derive(Clone)]
struct CountingCatalog {
    inner: Catalog,
    lookups: Arc<AtomicUsize>,
}

#[async_trait]
impl CatalogLookup for CountingCatalog {
    async fn get_product(&self, id: ProductId) -> Result<Option<CatalogEntry>, DomainError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.get_product(id).await
    }

    async fn decrement_stock(
        &self,
        id: ProductId,
        quantity: u32,
        expected_version: Option<Version>,
    ) -> Result<CatalogEntry, DomainError> {
        self.inner.decrement_stock(id, quantity, expected_version).await
    }

    async fn restock(&self, id: ProductId, quantity: u32) -> Result<CatalogEntry, DomainError> {
        self.inner.restock(id, quantity).await
    }

    async fn mark_sold(&self, id: ProductId) -> Result<CatalogEntry, DomainError> {
        self.inner.mark_sold(id).await
    }
}

struct Marketplace {
    catalog: Catalog,
    users: Users,
    service: OrderService<DocumentOrderRepository<InMemoryDocumentStore>, Catalog, InMemoryEventPublisher>,
}

impl Marketplace {
    fn new() -> Self {
        let store = InMemoryDocumentStore::new();
        let catalog = DocumentCatalog::new(store.clone());
        Self {
            users: DocumentUserDirectory::new(store.clone()),
            service: OrderService::new(
                DocumentOrderRepository::new(store),
                catalog.clone(),
                InMemoryEventPublisher::new(),
            ),
            catalog,
        }
    }

    async fn user(&self, name: &str) -> UserProfile {
        let profile = UserProfile::new(name, format!("{name}@example.com"), "0700123456");
        self.users.upsert_user(&profile).await.unwrap()
    }

    async fn product(&self, producer: UserId, title: &str, price: i64) -> CatalogEntry {
        let entry = CatalogEntry::new(producer, title, Money::from_cents(price), 50)
            .with_category("fruit");
        self.catalog.insert_entry(&entry).await.unwrap()
    }

    async fn order(&self, buyer: UserId, lines: &[(ProductId, u32)]) -> Order {
        let lines = lines
            .iter()
            .map(|&(id, quantity)| CartLine::new(id, quantity))
            .collect();
        self.service
            .place_order(PlaceOrder::new(buyer, lines))
            .await
            .unwrap()
    }

    fn projector(&self) -> OrderViewProjector<Catalog, Users> {
        OrderViewProjector::new(self.catalog.clone(), self.users.clone())
    }
}

#[tokio::test]
async fn view_joins_products_and_contacts() {
    let market = Marketplace::new();
    let farmer = market.user("njeri").await;
    let buyer = market.user("otieno").await;
    let mango = market.product(farmer.id, "Mango", 250).await;
    let order = market.order(buyer.id, &[(mango.id, 4)]).await;

    let view = market.projector().project(&order).await.unwrap();

    assert_eq!(view.id, order.id());
    assert_eq!(view.buyer.as_ref().map(|c| c.username.as_str()), Some("otieno"));
    assert_eq!(view.total_amount, Money::from_cents(1000));
    assert_eq!(view.items.len(), 1);

    let line = &view.items[0];
    let product = line.product.as_ref().unwrap();
    assert_eq!(product.title, "Mango");
    assert_eq!(product.category.as_deref(), Some("fruit"));
    assert_eq!(product.producer_id, farmer.id);
    assert_eq!(
        product.producer.as_ref().map(|c| c.email.as_str()),
        Some("njeri@example.com")
    );
    assert_eq!(line.line_total, Some(Money::from_cents(1000)));
    assert_eq!(view.missing_products(), 0);
}

#[tokio::test]
async fn deleted_products_and_users_resolve_to_none() {
    let market = Marketplace::new();
    let farmer = market.user("wambui").await;
    let kept = market.product(farmer.id, "Pawpaw", 100).await;
    let doomed = market.product(farmer.id, "Passion", 300).await;
    let ghost_buyer = UserId::new();
    let order = market
        .order(ghost_buyer, &[(kept.id, 1), (doomed.id, 2)])
        .await;
    market.catalog.delete_entry(doomed.id).await.unwrap();

    let view = market.projector().project(&order).await.unwrap();

    assert!(view.buyer.is_none());
    assert_eq!(view.missing_products(), 1);
    assert!(view.items[0].product.is_some());
    assert!(view.items[1].product.is_none());
    assert_eq!(view.items[1].line_total, None);
    assert_eq!(view.items[1].quantity, 2);
    assert_eq!(view.total_amount, Money::from_cents(700));
}

#[tokio::test]
async fn missing_producer_profile_keeps_the_product() {
    let market = Marketplace::new();
    let buyer = market.user("achieng").await;
    let orphan = market.product(UserId::new(), "Guava", 80).await;
    let order = market.order(buyer.id, &[(orphan.id, 1)]).await;

    let view = market.projector().project(&order).await.unwrap();

    let product = view.items[0].product.as_ref().unwrap();
    assert!(product.producer.is_none());
    assert_eq!(product.producer_id, orphan.owner_id);
}

#[tokio::test]
async fn project_all_looks_up_each_product_once() {
    let market = Marketplace::new();
    let farmer = market.user("mutua").await;
    let buyer = market.user("chebet").await;
    let a = market.product(farmer.id, "Banana", 20).await;
    let b = market.product(farmer.id, "Orange", 30).await;

    let mut orders = Vec::new();
    for _ in 0..5 {
        orders.push(market.order(buyer.id, &[(a.id, 1), (b.id, 2), (a.id, 1)]).await);
    }

    let lookups = Arc::new(AtomicUsize::new(0));
    let projector = OrderViewProjector::new(
        CountingCatalog {
            inner: market.catalog.clone(),
            lookups: lookups.clone(),
        },
        market.users.clone(),
    );

    let views = projector.project_all(&orders).await.unwrap();

    assert_eq!(views.len(), 5);
    assert!(views.iter().all(|v| v.items.len() == 3));
    assert_eq!(lookups.load(Ordering::SeqCst), 2);
    let ids: Vec<_> = views.iter().map(|v| v.id).collect();
    let expected: Vec<_> = orders.iter().map(Order::id).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn views_serialize_for_the_api() {
    let market = Marketplace::new();
    let farmer = market.user("kiprop").await;
    let apple = market.product(farmer.id, "Apple", 120).await;
    let order = market.order(UserId::new(), &[(apple.id, 1)]).await;

    let view = market.projector().project(&order).await.unwrap();
    let json = serde_json::to_value(&view).unwrap();

    assert_eq!(json["status"], "pending");
    assert_eq!(json["buyer"], serde_json::Value::Null);
    assert_eq!(json["items"][0]["product"]["title"], "Apple");
    assert_eq!(json["items"][0]["line_total"]["cents"], 120);
}
