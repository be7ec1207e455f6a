//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod notifications;
pub mod orders;
pub mod products;

use std::fmt::Display;
use std::str::FromStr;

use crate::error::ApiError;

/// Parses a path identifier, mapping failures to 400.
pub(crate) fn parse_id<T>(raw: &str, what: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {what} ID: {e}")))
}
