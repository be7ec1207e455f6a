use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::Result;

/// Unique identifier for a document within its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Creates a new random document ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a document ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for DocumentId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<DocumentId> for Uuid {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

/// Revision number of a stored document, used for optimistic concurrency control.
///
/// A freshly inserted document is at version 1 and every successful
/// replacement increments it by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version of a document that has never been stored (0).
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version assigned on insert (1).
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// A stored JSON document together with its bookkeeping fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier, unique within the collection.
    pub id: DocumentId,

    /// Name of the collection the document belongs to (e.g. "orders").
    pub collection: String,

    /// Current revision.
    pub version: Version,

    /// When the document was first inserted.
    pub created_at: DateTime<Utc>,

    /// When the document was last replaced.
    pub updated_at: DateTime<Utc>,

    /// The document body.
    pub body: serde_json::Value,
}

impl Document {
    /// Creates a new, not yet stored document.
    pub fn new(collection: impl Into<String>, id: DocumentId, body: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id,
            collection: collection.into(),
            version: Version::first(),
            created_at: now,
            updated_at: now,
            body,
        }
    }

    /// Creates a new document by serializing a value as its body.
    pub fn encode<T: Serialize>(
        collection: impl Into<String>,
        id: DocumentId,
        value: &T,
    ) -> Result<Self> {
        Ok(Self::new(collection, id, serde_json::to_value(value)?))
    }

    /// Deserializes the body into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn version_sequence() {
        assert_eq!(Version::initial().as_i64(), 0);
        assert_eq!(Version::first().as_i64(), 1);
        assert_eq!(Version::first().next(), Version::new(2));
        assert!(Version::new(3) > Version::first());
    }

    #[test]
    fn new_document_starts_at_first_version() {
        let doc = Document::new("orders", DocumentId::new(), json!({"a": 1}));
        assert_eq!(doc.version, Version::first());
        assert_eq!(doc.collection, "orders");
        assert_eq!(doc.created_at, doc.updated_at);
    }

    #[test]
    fn encode_then_decode_body() {
        #[derive(Debug, PartialEq, Serialize, serde::Deserialize)]
        struct Listing {
            title: String,
            quantity: u32,
        }

        let listing = Listing {
            title: "Maize".to_string(),
            quantity: 40,
        };
        let doc = Document::encode("products", DocumentId::new(), &listing).unwrap();
        assert_eq!(doc.body["title"], "Maize");
        assert_eq!(doc.decode::<Listing>().unwrap(), listing);
    }
}
