//! Shared identifier types for the marketplace order backend.

mod types;

pub use types::{OrderId, ProductId, UserId};
