//! Projection error types.

use domain::{DomainError, ErrorKind};
use thiserror::Error;

/// Errors that can occur while building views.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// A catalog or identity lookup failed outright.
    #[error("Lookup failed: {0}")]
    Lookup(#[from] DomainError),
}

impl ProjectionError {
    /// Returns the taxonomy bucket of the underlying failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProjectionError::Lookup(e) => e.kind(),
        }
    }
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
