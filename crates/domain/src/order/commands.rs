//! Order commands.

use common::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::{CartLine, OrderStatus};

/// Command to place an order from a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub owner_id: UserId,
    pub lines: Vec<CartLine>,
}

impl PlaceOrder {
    pub fn new(owner_id: UserId, lines: Vec<CartLine>) -> Self {
        Self { owner_id, lines }
    }
}

/// Command to move an order to a new status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderStatus {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub notes: Option<String>,
}

impl UpdateOrderStatus {
    pub fn new(order_id: OrderId, status: OrderStatus) -> Self {
        Self {
            order_id,
            status,
            notes: None,
        }
    }

    /// Attaches a note for the buyer or producer.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Command to remove every line for a product from an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveOrderLine {
    pub order_id: OrderId,
    pub product_id: ProductId,
}

impl RemoveOrderLine {
    pub fn new(order_id: OrderId, product_id: ProductId) -> Self {
        Self {
            order_id,
            product_id,
        }
    }
}
