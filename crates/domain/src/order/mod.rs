//! Order aggregate, cart validation and the order workflow.

mod aggregate;
mod commands;
mod events;
mod repository;
mod service;
mod status;
mod validator;

pub use aggregate::{Order, OrderLine};
pub use commands::*;
pub use events::{InMemoryEventPublisher, ORDER_CREATED, OrderEvent, OrderEventPublisher};
pub use repository::{DocumentOrderRepository, ORDERS_COLLECTION, OrderRepository};
pub use service::{OrderService, StockPolicy};
pub use status::OrderStatus;
pub use validator::{CartLine, PricedLine, ValidatedCart, check_line, validate_cart};

use common::{OrderId, ProductId};
use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The cart has no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// A cart line asks for zero units.
    #[error("Invalid quantity {quantity} for product {product_id} (must be at least 1)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// A cart line references a product missing from the catalog.
    ///
    /// Unlike [`InsufficientStock`](Self::InsufficientStock) there is no
    /// catalog entry to take a title from, so only the id is reported.
    #[error("Product {product_id} not found")]
    ProductNotFound { product_id: ProductId },

    /// A cart line asks for more than the catalog holds.
    #[error(
        "Quantity for {title} ({product_id}) exceeds available stock: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        title: String,
        requested: u32,
        available: u32,
    },

    /// A line or order total does not fit in a [`Money`](crate::Money).
    #[error("Amount for product {product_id} is too large")]
    AmountOverflow { product_id: ProductId },

    /// Order not found.
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    /// The product is not among the order's lines.
    #[error("Product {product_id} is not part of order {order_id}")]
    LineNotFound {
        order_id: OrderId,
        product_id: ProductId,
    },

    /// The transition table forbids the move.
    #[error("Invalid status transition for order {order_id}: cannot move from {from} to {to}")]
    InvalidStatusTransition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// The order is in a terminal status and its lines are frozen.
    #[error("Order {order_id} is {status} and its lines can no longer be changed")]
    OrderClosed {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// Unknown status string.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}

impl OrderError {
    /// Returns the taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::ProductNotFound { .. }
            | OrderError::OrderNotFound(_)
            | OrderError::LineNotFound { .. } => ErrorKind::NotFound,
            OrderError::EmptyCart
            | OrderError::InvalidQuantity { .. }
            | OrderError::InsufficientStock { .. }
            | OrderError::AmountOverflow { .. }
            | OrderError::InvalidStatusTransition { .. }
            | OrderError::OrderClosed { .. }
            | OrderError::UnknownStatus(_) => ErrorKind::InvalidRequest,
        }
    }
}
