//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use document_store::Version;
use serde::{Deserialize, Serialize};

use super::{OrderError, OrderStatus, ValidatedCart};
use crate::value_objects::Money;

/// A product and quantity inside an order.
///
/// Prices are not stored on the line; they are always re-read from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Order aggregate root.
///
/// Created only from a validated cart; afterwards it changes through status
/// transitions and line removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    id: OrderId,

    /// Buyer who placed the order.
    owner_id: UserId,

    /// Lines in cart order.
    items: Vec<OrderLine>,

    /// Σ(catalog price × quantity) at the last committed change.
    total_amount: Money,

    status: OrderStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,

    /// Storage revision for optimistic concurrency.
    #[serde(skip)]
    version: Version,
}

impl Order {
    /// Creates a pending order from a validated cart.
    pub fn place(owner_id: UserId, cart: &ValidatedCart) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            owner_id,
            items: cart
                .lines()
                .iter()
                .map(|line| OrderLine {
                    product_id: line.product_id,
                    quantity: line.quantity,
                })
                .collect(),
            total_amount: cart.grand_total(),
            status: OrderStatus::Pending,
            notes: None,
            created_at: now,
            updated_at: now,
            version: Version::initial(),
        }
    }

    /// Moves the order to `next`, replacing the notes when some are given.
    pub fn transition_to(
        &mut self,
        next: OrderStatus,
        notes: Option<String>,
    ) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidStatusTransition {
                order_id: self.id,
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        if notes.is_some() {
            self.notes = notes;
        }
        self.touch();
        Ok(())
    }

    /// Removes every line for `product_id`, returning how many were removed.
    ///
    /// The total is left as is; the caller reprices against the catalog.
    pub fn remove_product(&mut self, product_id: ProductId) -> Result<usize, OrderError> {
        if !self.status.can_modify_lines() {
            return Err(OrderError::OrderClosed {
                order_id: self.id,
                status: self.status,
            });
        }

        let before = self.items.len();
        self.items.retain(|line| line.product_id != product_id);
        let removed = before - self.items.len();
        if removed == 0 {
            return Err(OrderError::LineNotFound {
                order_id: self.id,
                product_id,
            });
        }

        self.touch();
        Ok(removed)
    }

    /// Replaces the total after repricing.
    pub fn set_total_amount(&mut self, total: Money) {
        self.total_amount = total;
        self.touch();
    }

    pub(crate) fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// Query methods
impl Order {
    /// Returns the order ID.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the buyer.
    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    /// Returns the lines in cart order.
    pub fn items(&self) -> &[OrderLine] {
        &self.items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the storage revision the order was read at.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns the number of lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the total quantity over all lines, saturating at `u32::MAX`.
    pub fn total_quantity(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |total, line| total.saturating_add(line.quantity))
    }

    /// Returns true if the order is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns true if any line references the product.
    pub fn contains_product(&self, product_id: ProductId) -> bool {
        self.items.iter().any(|line| line.product_id == product_id)
    }

    /// Returns the distinct products referenced, in first-seen order.
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = Vec::with_capacity(self.items.len());
        for line in &self.items {
            if !ids.contains(&line.product_id) {
                ids.push(line.product_id);
            }
        }
        ids
    }
}
