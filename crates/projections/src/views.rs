//! Enriched order view types.

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use domain::{CatalogEntry, Money, OrderStatus, ProductStatus, UserProfile};
use serde::Serialize;

/// Contact details of a buyer or producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactSnapshot {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub phone_no: String,
}

impl From<&UserProfile> for ContactSnapshot {
    fn from(profile: &UserProfile) -> Self {
        Self {
            user_id: profile.id,
            username: profile.username.clone(),
            email: profile.email.clone(),
            phone_no: profile.phone_no.clone(),
        }
    }
}

/// The catalog entry behind an order line, as it is now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub title: String,
    pub category: Option<String>,
    pub price: Money,
    pub status: ProductStatus,
    pub producer_id: UserId,

    /// None if the producer's profile no longer exists.
    pub producer: Option<ContactSnapshot>,
}

impl ProductSnapshot {
    pub(crate) fn new(entry: &CatalogEntry, producer: Option<ContactSnapshot>) -> Self {
        Self {
            id: entry.id,
            title: entry.title.clone(),
            category: entry.category.clone(),
            price: entry.price,
            status: entry.status,
            producer_id: entry.owner_id,
            producer,
        }
    }
}

/// An order line joined with its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineView {
    pub product_id: ProductId,
    pub quantity: u32,

    /// None if the product has been deleted.
    pub product: Option<ProductSnapshot>,

    /// Current price × quantity, when the product still exists and the
    /// total fits.
    pub line_total: Option<Money>,
}

/// An order joined with its products and buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub owner_id: UserId,

    /// None if the buyer's profile no longer exists.
    pub buyer: Option<ContactSnapshot>,

    pub items: Vec<OrderLineView>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderView {
    /// Returns the number of lines whose product could not be resolved.
    pub fn missing_products(&self) -> usize {
        self.items.iter().filter(|line| line.product.is_none()).count()
    }
}
