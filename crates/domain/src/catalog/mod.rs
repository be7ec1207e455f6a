//! Producer listings and the catalog lookup consumed by the order core.

mod document;
mod service;

pub use document::{DocumentCatalog, PRODUCTS_COLLECTION};
pub use service::{CatalogService, ListingUpdate, NewListing};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use document_store::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{DomainError, ErrorKind};
use crate::value_objects::Money;

/// Availability of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Listed and open for orders.
    #[default]
    Available,

    /// Sold out or withdrawn by the producer.
    Sold,
}

impl ProductStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Available => "available",
            ProductStatus::Sold => "sold",
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(ProductStatus::Available),
            "sold" => Ok(ProductStatus::Sold),
            other => Err(CatalogError::UnknownStatus(other.to_string())),
        }
    }
}

/// A producer's listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: ProductId,
    pub owner_id: UserId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub price: Money,
    pub available_quantity: u32,
    #[serde(default)]
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,

    /// Storage revision the entry was read at.
    #[serde(skip)]
    pub version: Version,
}

impl CatalogEntry {
    /// Creates an available listing with a fresh id.
    pub fn new(
        owner_id: UserId,
        title: impl Into<String>,
        price: Money,
        available_quantity: u32,
    ) -> Self {
        Self {
            id: ProductId::new(),
            owner_id,
            title: title.into(),
            description: None,
            category: None,
            price,
            available_quantity,
            status: ProductStatus::Available,
            created_at: Utc::now(),
            version: Version::initial(),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Returns true if the listing is marked sold.
    pub fn is_sold(&self) -> bool {
        self.status == ProductStatus::Sold
    }

    /// Returns true if the requested quantity fits the available stock.
    pub fn can_supply(&self, quantity: u32) -> bool {
        quantity <= self.available_quantity
    }
}

/// Errors raised by the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The listing does not exist.
    #[error("Product {0} not found")]
    NotFound(ProductId),

    /// The listing data is malformed.
    #[error("Invalid listing: {0}")]
    InvalidListing(String),

    /// A stock decrement asked for more than is available.
    #[error(
        "Cannot take {requested} of {title} ({product_id}): only {available} available"
    )]
    InsufficientStock {
        product_id: ProductId,
        title: String,
        requested: u32,
        available: u32,
    },

    /// The listing changed after it was read.
    #[error(
        "Product {product_id} changed concurrently (read at version {expected}, now {actual})"
    )]
    StaleSnapshot {
        product_id: ProductId,
        expected: Version,
        actual: Version,
    },

    /// Unknown status string.
    #[error("Unknown product status: {0}")]
    UnknownStatus(String),
}

impl CatalogError {
    /// Returns the taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::NotFound(_) => ErrorKind::NotFound,
            CatalogError::StaleSnapshot { .. } => ErrorKind::Conflict,
            CatalogError::InvalidListing(_)
            | CatalogError::InsufficientStock { .. }
            | CatalogError::UnknownStatus(_) => ErrorKind::InvalidRequest,
        }
    }
}

/// Catalog lookup and stock updates as seen by the order core.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Returns the current listing, or None if it does not exist.
    async fn get_product(&self, id: ProductId) -> Result<Option<CatalogEntry>, DomainError>;

    /// Takes `quantity` units out of stock.
    ///
    /// When `expected_version` is set the decrement only applies if the
    /// listing is still at that version; otherwise it fails with a conflict.
    async fn decrement_stock(
        &self,
        id: ProductId,
        quantity: u32,
        expected_version: Option<Version>,
    ) -> Result<CatalogEntry, DomainError>;

    /// Puts `quantity` units back into stock.
    async fn restock(&self, id: ProductId, quantity: u32) -> Result<CatalogEntry, DomainError>;

    /// Flips the listing to `sold`.
    async fn mark_sold(&self, id: ProductId) -> Result<CatalogEntry, DomainError>;
}
