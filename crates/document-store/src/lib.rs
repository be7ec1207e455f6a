//! Opaque document persistence reached through simple query primitives.
//!
//! Documents are JSON bodies grouped into named collections, each carrying a
//! version used for optimistic concurrency on replacement.

pub mod document;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use document::{Document, DocumentId, Version};
pub use error::{Result, StoreError};
pub use memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use query::DocumentQuery;
pub use store::{DocumentStore, DocumentStoreExt, WriteOptions};
