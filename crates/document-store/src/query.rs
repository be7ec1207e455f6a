use serde_json::{Map, Value};

use crate::Document;

/// Builder for constructing document queries.
///
/// Filters are equality matches on top-level fields of the document body.
/// A query without filters matches every document in the collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentQuery {
    /// Collection to search.
    pub collection: String,

    /// Required top-level field values.
    pub filter: Map<String, Value>,

    /// Maximum number of documents to return.
    pub limit: Option<usize>,

    /// Number of documents to skip.
    pub offset: Option<usize>,
}

impl DocumentQuery {
    /// Creates a query over every document in a collection.
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Default::default()
        }
    }

    /// Requires a top-level field to equal the given value.
    pub fn field_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.insert(field.into(), value.into());
        self
    }

    /// Limits the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips a number of results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the document satisfies the collection and field filters.
    ///
    /// Paging is not considered here.
    pub fn matches(&self, document: &Document) -> bool {
        if document.collection != self.collection {
            return false;
        }
        self.filter
            .iter()
            .all(|(field, expected)| document.body.get(field) == Some(expected))
    }

    /// Returns the filter as a JSON object, suitable for containment matching.
    pub fn filter_value(&self) -> Value {
        Value::Object(self.filter.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DocumentId;
    use serde_json::json;

    fn doc(collection: &str, body: Value) -> Document {
        Document::new(collection, DocumentId::new(), body)
    }

    #[test]
    fn empty_filter_matches_whole_collection() {
        let query = DocumentQuery::collection("orders");
        assert!(query.matches(&doc("orders", json!({"owner_id": "a"}))));
        assert!(!query.matches(&doc("products", json!({"owner_id": "a"}))));
    }

    #[test]
    fn field_eq_requires_exact_value() {
        let query = DocumentQuery::collection("orders").field_eq("owner_id", "a");
        assert!(query.matches(&doc("orders", json!({"owner_id": "a", "x": 1}))));
        assert!(!query.matches(&doc("orders", json!({"owner_id": "b"}))));
        assert!(!query.matches(&doc("orders", json!({"x": 1}))));
    }

    #[test]
    fn multiple_filters_are_conjunctive() {
        let query = DocumentQuery::collection("products")
            .field_eq("owner_id", "a")
            .field_eq("status", "available");
        assert!(query.matches(&doc(
            "products",
            json!({"owner_id": "a", "status": "available"})
        )));
        assert!(!query.matches(&doc("products", json!({"owner_id": "a", "status": "sold"}))));
    }

    #[test]
    fn paging_builder() {
        let query = DocumentQuery::collection("orders").limit(10).offset(20);
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(20));
        assert_eq!(query.filter_value(), json!({}));
    }
}
