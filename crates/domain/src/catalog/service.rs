//! Authorized listing operations for producers.

use common::{ProductId, UserId};
use document_store::DocumentStore;
use serde::{Deserialize, Serialize};

use super::{CatalogEntry, CatalogError, CatalogLookup, DocumentCatalog, ProductStatus};
use crate::authorization::ensure_owner_or_admin;
use crate::error::DomainError;
use crate::identity::Principal;
use crate::value_objects::Money;

/// Data for a new listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewListing {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub price: Money,
    pub quantity: u32,
}

/// Partial update of a listing; unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Money>,
    pub available_quantity: Option<u32>,
    pub status: Option<ProductStatus>,
}

impl ListingUpdate {
    fn apply_to(self, entry: &mut CatalogEntry) {
        if let Some(title) = self.title {
            entry.title = title;
        }
        if let Some(description) = self.description {
            entry.description = Some(description);
        }
        if let Some(category) = self.category {
            entry.category = Some(category);
        }
        if let Some(price) = self.price {
            entry.price = price;
        }
        if let Some(quantity) = self.available_quantity {
            entry.available_quantity = quantity;
        }
        if let Some(status) = self.status {
            entry.status = status;
        }
    }
}

fn validate_listing(title: &str, price: Money) -> Result<(), CatalogError> {
    if title.trim().is_empty() {
        return Err(CatalogError::InvalidListing("title must not be empty".to_string()));
    }
    if price.is_negative() {
        return Err(CatalogError::InvalidListing(format!(
            "price must not be negative (got {price})"
        )));
    }
    Ok(())
}

/// Service for managing producer listings.
///
/// Every mutation loads the listing fresh and checks that the acting
/// principal owns it (or is an admin) before writing.
#[derive(Clone)]
pub struct CatalogService<S> {
    catalog: DocumentCatalog<S>,
}

impl<S: DocumentStore> CatalogService<S> {
    /// Creates a new catalog service.
    pub fn new(catalog: DocumentCatalog<S>) -> Self {
        Self { catalog }
    }

    /// Returns a reference to the underlying catalog.
    pub fn catalog(&self) -> &DocumentCatalog<S> {
        &self.catalog
    }

    /// Lists a new product owned by the principal.
    #[tracing::instrument(skip(self, principal, listing), fields(user_id = %principal.id))]
    pub async fn create_listing(
        &self,
        principal: &Principal,
        listing: NewListing,
    ) -> Result<CatalogEntry, DomainError> {
        validate_listing(&listing.title, listing.price)?;

        let mut entry = CatalogEntry::new(
            principal.id,
            listing.title.trim(),
            listing.price,
            listing.quantity,
        );
        entry.description = listing.description;
        entry.category = listing.category;

        let stored = self.catalog.insert_entry(&entry).await?;
        tracing::info!(product_id = %stored.id, "listing created");
        Ok(stored)
    }

    /// Gets a listing by id.
    #[tracing::instrument(skip(self))]
    pub async fn get_listing(&self, id: ProductId) -> Result<CatalogEntry, DomainError> {
        Ok(self.catalog.load(id).await?.ok_or(CatalogError::NotFound(id))?)
    }

    /// Lists every listing, hiding sold ones unless `include_sold` is set.
    #[tracing::instrument(skip(self))]
    pub async fn list_listings(&self, include_sold: bool) -> Result<Vec<CatalogEntry>, DomainError> {
        self.catalog.list_entries(include_sold).await
    }

    /// Lists the listings of one producer.
    #[tracing::instrument(skip(self))]
    pub async fn list_for_producer(
        &self,
        producer_id: UserId,
    ) -> Result<Vec<CatalogEntry>, DomainError> {
        self.catalog.list_by_owner(producer_id).await
    }

    /// Applies a partial update to a listing.
    #[tracing::instrument(skip(self, principal, update), fields(user_id = %principal.id))]
    pub async fn update_listing(
        &self,
        principal: &Principal,
        id: ProductId,
        update: ListingUpdate,
    ) -> Result<CatalogEntry, DomainError> {
        let mut entry = self.owned_listing(principal, id).await?;
        update.apply_to(&mut entry);
        validate_listing(&entry.title, entry.price)?;

        let saved = self.catalog.save_entry(&entry).await?;
        tracing::info!(product_id = %id, "listing updated");
        Ok(saved)
    }

    /// Deletes a listing and returns it.
    ///
    /// Orders referencing it keep their lines; views show the product as missing.
    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.id))]
    pub async fn remove_listing(
        &self,
        principal: &Principal,
        id: ProductId,
    ) -> Result<CatalogEntry, DomainError> {
        self.owned_listing(principal, id).await?;
        let removed = self
            .catalog
            .delete_entry(id)
            .await?
            .ok_or(CatalogError::NotFound(id))?;
        tracing::info!(product_id = %id, "listing removed");
        Ok(removed)
    }

    /// Marks a listing as sold.
    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.id))]
    pub async fn mark_sold(
        &self,
        principal: &Principal,
        id: ProductId,
    ) -> Result<CatalogEntry, DomainError> {
        self.owned_listing(principal, id).await?;
        self.catalog.mark_sold(id).await
    }

    /// Records an offline sale by taking `quantity` out of stock.
    ///
    /// The listing flips to sold once its stock reaches zero.
    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.id))]
    pub async fn record_sale(
        &self,
        principal: &Principal,
        id: ProductId,
        quantity: u32,
    ) -> Result<CatalogEntry, DomainError> {
        if quantity == 0 {
            return Err(
                CatalogError::InvalidListing("sale quantity must be at least 1".to_string()).into(),
            );
        }

        let entry = self.owned_listing(principal, id).await?;
        let updated = self
            .catalog
            .decrement_stock(id, quantity, Some(entry.version))
            .await?;

        if updated.available_quantity == 0 {
            tracing::info!(product_id = %id, "stock exhausted, marking sold");
            return self.catalog.mark_sold(id).await;
        }
        Ok(updated)
    }

    async fn owned_listing(
        &self,
        principal: &Principal,
        id: ProductId,
    ) -> Result<CatalogEntry, DomainError> {
        let entry = self.catalog.load(id).await?.ok_or(CatalogError::NotFound(id))?;
        ensure_owner_or_admin(principal, entry.owner_id, format!("product {id}"))?;
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use document_store::InMemoryDocumentStore;

    fn service() -> CatalogService<InMemoryDocumentStore> {
        CatalogService::new(DocumentCatalog::new(InMemoryDocumentStore::new()))
    }

    fn listing(title: &str, quantity: u32) -> NewListing {
        NewListing {
            title: title.to_string(),
            description: None,
            category: Some("vegetables".to_string()),
            price: Money::from_units(50),
            quantity,
        }
    }

    #[tokio::test]
    async fn create_listing_sets_owner() {
        let service = service();
        let producer = Principal::user(UserId::new());

        let entry = service
            .create_listing(&producer, listing("  Tomatoes ", 10))
            .await
            .unwrap();

        assert_eq!(entry.owner_id, producer.id);
        assert_eq!(entry.title, "Tomatoes");
        assert_eq!(entry.status, ProductStatus::Available);
        assert_eq!(service.get_listing(entry.id).await.unwrap(), entry);
    }

    #[tokio::test]
    async fn create_listing_validates_input() {
        let service = service();
        let producer = Principal::user(UserId::new());

        let err = service
            .create_listing(&producer, listing("   ", 1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let mut negative = listing("Onions", 1);
        negative.price = Money::from_cents(-1);
        let err = service.create_listing(&producer, negative).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn non_owner_cannot_update() {
        let service = service();
        let producer = Principal::user(UserId::new());
        let entry = service
            .create_listing(&producer, listing("Cabbage", 3))
            .await
            .unwrap();

        let stranger = Principal::user(UserId::new());
        let update = ListingUpdate {
            price: Some(Money::from_units(1)),
            ..Default::default()
        };
        let err = service
            .update_listing(&stranger, entry.id, update)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let unchanged = service.get_listing(entry.id).await.unwrap();
        assert_eq!(unchanged.price, Money::from_units(50));
    }

    #[tokio::test]
    async fn admin_can_update_and_remove() {
        let service = service();
        let producer = Principal::user(UserId::new());
        let entry = service
            .create_listing(&producer, listing("Milk", 20))
            .await
            .unwrap();
        let admin = Principal::admin(UserId::new());

        let update = ListingUpdate {
            title: Some("Fresh milk".to_string()),
            available_quantity: Some(15),
            ..Default::default()
        };
        let updated = service.update_listing(&admin, entry.id, update).await.unwrap();
        assert_eq!(updated.title, "Fresh milk");
        assert_eq!(updated.available_quantity, 15);
        assert_eq!(updated.category.as_deref(), Some("vegetables"));

        let removed = service.remove_listing(&admin, entry.id).await.unwrap();
        assert_eq!(removed.id, entry.id);
        let err = service.get_listing(entry.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn record_sale_flips_to_sold_at_zero() {
        let service = service();
        let producer = Principal::user(UserId::new());
        let entry = service
            .create_listing(&producer, listing("Eggs", 3))
            .await
            .unwrap();

        let partial = service.record_sale(&producer, entry.id, 2).await.unwrap();
        assert_eq!(partial.available_quantity, 1);
        assert_eq!(partial.status, ProductStatus::Available);

        let err = service.record_sale(&producer, entry.id, 2).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let sold = service.record_sale(&producer, entry.id, 1).await.unwrap();
        assert_eq!(sold.available_quantity, 0);
        assert!(sold.is_sold());

        let visible = service.list_listings(false).await.unwrap();
        assert!(visible.is_empty());
        assert_eq!(service.list_for_producer(producer.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mark_sold_requires_ownership() {
        let service = service();
        let producer = Principal::user(UserId::new());
        let entry = service
            .create_listing(&producer, listing("Honey", 4))
            .await
            .unwrap();

        let err = service
            .mark_sold(&Principal::user(UserId::new()), entry.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let sold = service.mark_sold(&producer, entry.id).await.unwrap();
        assert!(sold.is_sold());
    }
}
