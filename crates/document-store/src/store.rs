use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::{Document, DocumentId, DocumentQuery, Result, Version};

/// Options for replacing a stored document.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Expected version of the document for optimistic concurrency control.
    /// If None, the replacement is unconditional (last writer wins).
    pub expected_version: Option<Version>,
}

impl WriteOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the document to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }
}

/// Core trait for document store implementations.
///
/// All implementations must be thread-safe (Send + Sync). Each operation is a
/// single atomic step against one document; there are no cross-document
/// transactions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a new document.
    ///
    /// Fails with `Duplicate` if the collection already holds the id. The
    /// stored document is returned with its version set to `Version::first()`.
    async fn insert(&self, document: Document) -> Result<Document>;

    /// Retrieves a document by id.
    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>>;

    /// Retrieves documents matching a query, in insertion order.
    async fn find(&self, query: DocumentQuery) -> Result<Vec<Document>>;

    /// Replaces the body of an existing document.
    ///
    /// Fails with `NotFound` if the document does not exist, and with
    /// `ConcurrencyConflict` if `options.expected_version` is set and does not
    /// match. Returns the stored document at its new version.
    async fn replace(
        &self,
        collection: &str,
        id: DocumentId,
        body: serde_json::Value,
        options: WriteOptions,
    ) -> Result<Document>;

    /// Deletes a document, returning it if it existed.
    async fn delete(&self, collection: &str, id: DocumentId) -> Result<Option<Document>>;
}

/// Extension trait providing typed convenience methods for document stores.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Retrieves and decodes a document, paired with its version.
    async fn get_as<T>(&self, collection: &str, id: DocumentId) -> Result<Option<(T, Version)>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(collection, id).await? {
            Some(document) => Ok(Some((document.decode()?, document.version))),
            None => Ok(None),
        }
    }

    /// Retrieves and decodes every document matching a query.
    async fn find_as<T>(&self, query: DocumentQuery) -> Result<Vec<(T, Version)>>
    where
        T: DeserializeOwned + Send,
    {
        self.find(query)
            .await?
            .iter()
            .map(|document| Ok((document.decode()?, document.version)))
            .collect()
    }

    /// Checks whether a document exists.
    async fn exists(&self, collection: &str, id: DocumentId) -> Result<bool> {
        Ok(self.get(collection, id).await?.is_some())
    }
}

// Blanket implementation for all DocumentStore implementations
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}
