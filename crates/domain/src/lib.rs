//! Domain layer for the marketplace order backend.
//!
//! This crate provides the core order workflow and its collaborators:
//! - Order aggregate with an explicit status transition table
//! - Cart validation against live catalog snapshots
//! - Order placement with a configurable stock policy
//! - Ownership and role based authorization
//! - Catalog and identity lookups backed by the document store

pub mod authorization;
pub mod catalog;
pub mod error;
pub mod identity;
pub mod order;
pub mod value_objects;

pub use authorization::{ensure_owner_or_admin, is_owner_or_admin};
pub use catalog::{
    CatalogEntry, CatalogError, CatalogLookup, CatalogService, DocumentCatalog, ListingUpdate,
    NewListing, ProductStatus,
};
pub use error::{DomainError, ErrorKind};
pub use identity::{DocumentUserDirectory, Principal, Role, UserDirectory, UserProfile};
pub use order::{
    CartLine, DocumentOrderRepository, InMemoryEventPublisher, Order, OrderError, OrderEvent,
    OrderEventPublisher, OrderLine, OrderRepository, OrderService, OrderStatus, PlaceOrder,
    PricedLine, RemoveOrderLine, StockPolicy, UpdateOrderStatus, ValidatedCart,
};
pub use value_objects::Money;
