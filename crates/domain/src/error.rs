//! Domain error types.

use common::UserId;
use document_store::StoreError;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::order::OrderError;

/// Client-facing category of a domain failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The referenced order, product or user does not exist.
    NotFound,
    /// The request is malformed or violates a business rule.
    InvalidRequest,
    /// The acting principal may not modify the resource.
    Forbidden,
    /// A concurrent modification won the race.
    Conflict,
    /// Storage or serialization failure.
    Infrastructure,
}

impl ErrorKind {
    /// Returns the category name, used as a metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Infrastructure => "infrastructure",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the order workflow.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// An error occurred in the catalog.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The acting user is unknown to the identity lookup.
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// The acting principal is neither the owner nor an admin.
    #[error("Access denied: user {user_id} may not modify {resource}")]
    Forbidden { user_id: UserId, resource: String },

    /// A concurrent writer changed the resource first.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An error occurred in the document store.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl DomainError {
    /// Returns the taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Order(e) => e.kind(),
            DomainError::Catalog(e) => e.kind(),
            DomainError::UserNotFound(_) => ErrorKind::NotFound,
            DomainError::Forbidden { .. } => ErrorKind::Forbidden,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::Store(e) if e.is_conflict() => ErrorKind::Conflict,
            DomainError::Store(StoreError::NotFound { .. }) => ErrorKind::NotFound,
            DomainError::Store(_) => ErrorKind::Infrastructure,
        }
    }
}
