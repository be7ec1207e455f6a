//! Catalog backed by the `products` collection of a document store.

use async_trait::async_trait;
use common::{ProductId, UserId};
use document_store::{
    Document, DocumentId, DocumentQuery, DocumentStore, StoreError, Version, WriteOptions,
};

use super::{CatalogEntry, CatalogError, CatalogLookup, ProductStatus};
use crate::error::DomainError;

/// Collection holding catalog entries.
pub const PRODUCTS_COLLECTION: &str = "products";

/// Attempts for unconditional stock writes that lose an optimistic race.
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Catalog entries stored as documents, one per listing.
///
/// Every write goes through an expected-version replace, so two writers
/// racing on the same listing never silently overwrite each other.
#[derive(Clone)]
pub struct DocumentCatalog<S> {
    store: S,
}

fn document_id(id: ProductId) -> DocumentId {
    DocumentId::from_uuid(id.as_uuid())
}

fn decode(document: Document) -> Result<CatalogEntry, DomainError> {
    let mut entry: CatalogEntry = document.decode()?;
    entry.version = document.version;
    Ok(entry)
}

fn take_stock(entry: &mut CatalogEntry, quantity: u32) -> Result<(), DomainError> {
    if !entry.can_supply(quantity) {
        return Err(CatalogError::InsufficientStock {
            product_id: entry.id,
            title: entry.title.clone(),
            requested: quantity,
            available: entry.available_quantity,
        }
        .into());
    }
    entry.available_quantity -= quantity;
    Ok(())
}

impl<S: DocumentStore> DocumentCatalog<S> {
    /// Creates a catalog over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Stores a new listing.
    pub async fn insert_entry(&self, entry: &CatalogEntry) -> Result<CatalogEntry, DomainError> {
        let document = Document::encode(PRODUCTS_COLLECTION, document_id(entry.id), entry)?;
        decode(self.store.insert(document).await?)
    }

    /// Loads a listing at its current version.
    pub async fn load(&self, id: ProductId) -> Result<Option<CatalogEntry>, DomainError> {
        self.store
            .get(PRODUCTS_COLLECTION, document_id(id))
            .await?
            .map(decode)
            .transpose()
    }

    /// Writes a listing back, expecting it to still be at `entry.version`.
    pub async fn save_entry(&self, entry: &CatalogEntry) -> Result<CatalogEntry, DomainError> {
        let body = serde_json::to_value(entry).map_err(StoreError::from)?;
        let document = self
            .store
            .replace(
                PRODUCTS_COLLECTION,
                document_id(entry.id),
                body,
                WriteOptions::expect_version(entry.version),
            )
            .await?;
        decode(document)
    }

    /// Removes a listing, returning it if it existed.
    pub async fn delete_entry(&self, id: ProductId) -> Result<Option<CatalogEntry>, DomainError> {
        self.store
            .delete(PRODUCTS_COLLECTION, document_id(id))
            .await?
            .map(decode)
            .transpose()
    }

    /// Lists every listing in creation order, hiding sold ones unless asked.
    pub async fn list_entries(&self, include_sold: bool) -> Result<Vec<CatalogEntry>, DomainError> {
        let mut query = DocumentQuery::collection(PRODUCTS_COLLECTION);
        if !include_sold {
            query = query.field_eq("status", ProductStatus::Available.as_str());
        }
        self.find(query).await
    }

    /// Lists the listings of one producer, sold ones included.
    pub async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<CatalogEntry>, DomainError> {
        let query =
            DocumentQuery::collection(PRODUCTS_COLLECTION).field_eq("owner_id", owner_id.to_string());
        self.find(query).await
    }

    async fn find(&self, query: DocumentQuery) -> Result<Vec<CatalogEntry>, DomainError> {
        self.store.find(query).await?.into_iter().map(decode).collect()
    }

    /// Applies `apply` to the freshly loaded listing and saves it, reloading
    /// and retrying when another writer got there first.
    async fn update_with_retry<F>(&self, id: ProductId, mut apply: F) -> Result<CatalogEntry, DomainError>
    where
        F: FnMut(&mut CatalogEntry) -> Result<(), DomainError> + Send,
    {
        let mut attempt = 1;
        loop {
            let mut entry = self.load(id).await?.ok_or(CatalogError::NotFound(id))?;
            apply(&mut entry)?;

            match self.save_entry(&entry).await {
                Err(DomainError::Store(e)) if e.is_conflict() && attempt < MAX_WRITE_ATTEMPTS => {
                    tracing::debug!(product_id = %id, attempt, "catalog write conflicted, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

#[async_trait]
impl<S: DocumentStore> CatalogLookup for DocumentCatalog<S> {
    async fn get_product(&self, id: ProductId) -> Result<Option<CatalogEntry>, DomainError> {
        self.load(id).await
    }

    #[tracing::instrument(skip(self))]
    async fn decrement_stock(
        &self,
        id: ProductId,
        quantity: u32,
        expected_version: Option<Version>,
    ) -> Result<CatalogEntry, DomainError> {
        let Some(expected) = expected_version else {
            return self
                .update_with_retry(id, |entry| take_stock(entry, quantity))
                .await;
        };

        let mut entry = self.load(id).await?.ok_or(CatalogError::NotFound(id))?;
        if entry.version != expected {
            return Err(CatalogError::StaleSnapshot {
                product_id: id,
                expected,
                actual: entry.version,
            }
            .into());
        }
        take_stock(&mut entry, quantity)?;
        self.save_entry(&entry).await
    }

    #[tracing::instrument(skip(self))]
    async fn restock(&self, id: ProductId, quantity: u32) -> Result<CatalogEntry, DomainError> {
        self.update_with_retry(id, |entry| {
            entry.available_quantity = entry.available_quantity.saturating_add(quantity);
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn mark_sold(&self, id: ProductId) -> Result<CatalogEntry, DomainError> {
        self.update_with_retry(id, |entry| {
            entry.status = ProductStatus::Sold;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::value_objects::Money;
    use document_store::InMemoryDocumentStore;

    async fn catalog_with(quantity: u32) -> (DocumentCatalog<InMemoryDocumentStore>, CatalogEntry) {
        let catalog = DocumentCatalog::new(InMemoryDocumentStore::new());
        let entry = CatalogEntry::new(UserId::new(), "Potatoes", Money::from_units(60), quantity);
        let stored = catalog.insert_entry(&entry).await.unwrap();
        (catalog, stored)
    }

    #[tokio::test]
    async fn insert_and_load_carry_version() {
        let (catalog, stored) = catalog_with(5).await;
        assert_eq!(stored.version, Version::first());

        let loaded = catalog.get_product(stored.id).await.unwrap().unwrap();
        assert_eq!(loaded, stored);
        assert!(catalog.get_product(ProductId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn guarded_decrement_takes_stock() {
        let (catalog, stored) = catalog_with(5).await;

        let updated = catalog
            .decrement_stock(stored.id, 2, Some(stored.version))
            .await
            .unwrap();
        assert_eq!(updated.available_quantity, 3);
        assert_eq!(updated.version, Version::new(2));
    }

    #[tokio::test]
    async fn guarded_decrement_rejects_stale_snapshot() {
        let (catalog, stored) = catalog_with(5).await;
        catalog.decrement_stock(stored.id, 1, None).await.unwrap();

        let err = catalog
            .decrement_stock(stored.id, 1, Some(stored.version))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let current = catalog.get_product(stored.id).await.unwrap().unwrap();
        assert_eq!(current.available_quantity, 4);
    }

    #[tokio::test]
    async fn decrement_beyond_stock_is_rejected() {
        let (catalog, stored) = catalog_with(2).await;

        let err = catalog.decrement_stock(stored.id, 3, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(err.to_string().contains("only 2 available"));
    }

    #[tokio::test]
    async fn restock_and_mark_sold() {
        let (catalog, stored) = catalog_with(1).await;

        let restocked = catalog.restock(stored.id, 4).await.unwrap();
        assert_eq!(restocked.available_quantity, 5);

        let sold = catalog.mark_sold(stored.id).await.unwrap();
        assert!(sold.is_sold());

        let err = catalog.mark_sold(ProductId::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn listing_filters() {
        let (catalog, stored) = catalog_with(1).await;
        let other = CatalogEntry::new(UserId::new(), "Kale", Money::from_units(20), 8);
        catalog.insert_entry(&other).await.unwrap();
        catalog.mark_sold(stored.id).await.unwrap();

        let visible = catalog.list_entries(false).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, other.id);
        assert_eq!(catalog.list_entries(true).await.unwrap().len(), 2);

        let mine = catalog.list_by_owner(stored.owner_id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, stored.id);
    }
}
