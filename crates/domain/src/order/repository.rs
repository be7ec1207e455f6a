//! Order persistence over the document store.

use async_trait::async_trait;
use common::{OrderId, UserId};
use document_store::{
    Document, DocumentId, DocumentQuery, DocumentStore, Result, WriteOptions,
};

use super::Order;

/// Collection holding orders.
pub const ORDERS_COLLECTION: &str = "orders";

/// Storage for order aggregates.
///
/// Each call is a single atomic document operation. Orders come back with
/// `version()` set to the stored revision.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persists a new order in one insert.
    async fn insert(&self, order: &Order) -> Result<Order>;

    /// Loads an order by id.
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>>;

    /// Loads every order placed by a buyer, oldest first.
    async fn find_by_owner(&self, owner_id: UserId) -> Result<Vec<Order>>;

    /// Loads every order, oldest first.
    async fn find_all(&self) -> Result<Vec<Order>>;

    /// Replaces an order, expecting it to still be at `order.version()`.
    async fn update(&self, order: &Order) -> Result<Order>;

    /// Deletes an order, returning it if it existed.
    async fn delete(&self, id: OrderId) -> Result<Option<Order>>;
}

/// Order repository backed by the `orders` collection.
#[derive(Clone)]
pub struct DocumentOrderRepository<S> {
    store: S,
}

impl<S: DocumentStore> DocumentOrderRepository<S> {
    /// Creates a repository over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

fn document_id(id: OrderId) -> DocumentId {
    DocumentId::from_uuid(id.as_uuid())
}

fn decode(document: Document) -> Result<Order> {
    let order: Order = document.decode()?;
    Ok(order.with_version(document.version))
}

#[async_trait]
impl<S: DocumentStore> OrderRepository for DocumentOrderRepository<S> {
    async fn insert(&self, order: &Order) -> Result<Order> {
        let document = Document::encode(ORDERS_COLLECTION, document_id(order.id()), order)?;
        decode(self.store.insert(document).await?)
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        self.store
            .get(ORDERS_COLLECTION, document_id(id))
            .await?
            .map(decode)
            .transpose()
    }

    async fn find_by_owner(&self, owner_id: UserId) -> Result<Vec<Order>> {
        let query =
            DocumentQuery::collection(ORDERS_COLLECTION).field_eq("owner_id", owner_id.to_string());
        self.store.find(query).await?.into_iter().map(decode).collect()
    }

    async fn find_all(&self) -> Result<Vec<Order>> {
        self.store
            .find(DocumentQuery::collection(ORDERS_COLLECTION))
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    async fn update(&self, order: &Order) -> Result<Order> {
        let document = self
            .store
            .replace(
                ORDERS_COLLECTION,
                document_id(order.id()),
                serde_json::to_value(order)?,
                WriteOptions::expect_version(order.version()),
            )
            .await?;
        decode(document)
    }

    async fn delete(&self, id: OrderId) -> Result<Option<Order>> {
        self.store
            .delete(ORDERS_COLLECTION, document_id(id))
            .await?
            .map(decode)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;
    use crate::order::{CartLine, OrderStatus, ValidatedCart, check_line};
    use crate::value_objects::Money;
    use document_store::{InMemoryDocumentStore, StoreError, Version};

    fn order_for(owner_id: UserId) -> Order {
        let entry = CatalogEntry::new(UserId::new(), "Carrots", Money::from_cents(80), 9);
        let line = check_line(&CartLine::new(entry.id, 3), Some(&entry)).unwrap();
        Order::place(owner_id, &ValidatedCart::new(vec![line]).unwrap())
    }

    #[tokio::test]
    async fn insert_and_find_by_id() {
        let repo = DocumentOrderRepository::new(InMemoryDocumentStore::new());
        let order = order_for(UserId::new());

        let stored = repo.insert(&order).await.unwrap();
        assert_eq!(stored.version(), Version::first());

        let loaded = repo.find_by_id(order.id()).await.unwrap().unwrap();
        assert_eq!(loaded, stored);
        assert!(repo.find_by_id(OrderId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_by_owner_filters_on_owner() {
        let repo = DocumentOrderRepository::new(InMemoryDocumentStore::new());
        let alice = UserId::new();
        let first = repo.insert(&order_for(alice)).await.unwrap();
        repo.insert(&order_for(UserId::new())).await.unwrap();
        let third = repo.insert(&order_for(alice)).await.unwrap();

        let mine = repo.find_by_owner(alice).await.unwrap();
        let ids: Vec<_> = mine.iter().map(Order::id).collect();
        assert_eq!(ids, vec![first.id(), third.id()]);
        assert_eq!(repo.find_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn update_with_stale_version_conflicts() {
        let repo = DocumentOrderRepository::new(InMemoryDocumentStore::new());
        let stored = repo.insert(&order_for(UserId::new())).await.unwrap();

        let mut first = stored.clone();
        first.transition_to(OrderStatus::Confirmed, None).unwrap();
        let updated = repo.update(&first).await.unwrap();
        assert_eq!(updated.version(), Version::new(2));

        let mut second = stored;
        second.transition_to(OrderStatus::Cancelled, None).unwrap();
        let result = repo.update(&second).await;
        assert!(matches!(result, Err(StoreError::ConcurrencyConflict { .. })));

        let current = repo.find_by_id(updated.id()).await.unwrap().unwrap();
        assert_eq!(current.status(), OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn delete_returns_order() {
        let repo = DocumentOrderRepository::new(InMemoryDocumentStore::new());
        let stored = repo.insert(&order_for(UserId::new())).await.unwrap();

        let deleted = repo.delete(stored.id()).await.unwrap().unwrap();
        assert_eq!(deleted.id(), stored.id());
        assert!(repo.delete(stored.id()).await.unwrap().is_none());
    }
}
