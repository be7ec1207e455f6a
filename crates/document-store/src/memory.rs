use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    Document, DocumentId, DocumentQuery, Result, StoreError,
    store::{DocumentStore, WriteOptions},
};

/// In-memory document store implementation.
///
/// Documents are kept per collection in insertion order, which is the order
/// `find` returns them in. Provides the same interface and conflict semantics
/// as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }

    /// Removes every document from every collection.
    pub async fn clear(&self) {
        self.collections.write().await.clear();
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, mut document: Document) -> Result<Document> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(document.collection.clone()).or_default();

        if documents.iter().any(|d| d.id == document.id) {
            return Err(StoreError::Duplicate {
                collection: document.collection,
                id: document.id,
            });
        }

        document.version = crate::Version::first();
        documents.push(document.clone());
        Ok(document)
    }

    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn find(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(&query.collection) else {
            return Ok(Vec::new());
        };

        let matching = documents
            .iter()
            .filter(|d| query.matches(d))
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(matching)
    }

    async fn replace(
        &self,
        collection: &str,
        id: DocumentId,
        body: serde_json::Value,
        options: WriteOptions,
    ) -> Result<Document> {
        let mut collections = self.collections.write().await;
        let existing = collections
            .get_mut(collection)
            .and_then(|documents| documents.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id,
            })?;

        if let Some(expected) = options.expected_version
            && existing.version != expected
        {
            return Err(StoreError::ConcurrencyConflict {
                collection: collection.to_string(),
                id,
                expected,
                actual: existing.version,
            });
        }

        existing.body = body;
        existing.version = existing.version.next();
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn delete(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(None);
        };

        Ok(documents
            .iter()
            .position(|d| d.id == id)
            .map(|index| documents.remove(index)))
    }
}
