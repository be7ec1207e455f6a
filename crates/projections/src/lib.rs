//! Read-side views of orders for the query endpoints.
//!
//! Orders only hold product ids and quantities. This crate joins them with
//! the catalog and the identity lookup at read time:
//! - [`OrderViewProjector`] resolves every referenced product and user once per call
//! - [`OrderView`] carries optional snapshots, so deleted products or users
//!   show up as missing instead of failing the read

pub mod error;
pub mod projector;
pub mod views;

pub use error::{ProjectionError, Result};
pub use projector::OrderViewProjector;
pub use views::{ContactSnapshot, OrderLineView, OrderView, ProductSnapshot};
