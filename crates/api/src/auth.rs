//! Caller identification from the `x-user-id` header.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;
use document_store::DocumentStore;
use domain::{DomainError, Principal, UserDirectory};

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the acting user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller, resolved through the user directory.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Principal);

impl<S> FromRequestParts<Arc<AppState<S>>> for Caller
where
    S: DocumentStore + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?
            .to_str()
            .map_err(|_| ApiError::Unauthorized(format!("malformed {USER_ID_HEADER} header")))?;

        let user_id: UserId = raw
            .trim()
            .parse()
            .map_err(|_| ApiError::Unauthorized(format!("malformed {USER_ID_HEADER} header")))?;

        match state.users.principal(user_id).await {
            Ok(principal) => Ok(Caller(principal)),
            Err(DomainError::UserNotFound(id)) => {
                tracing::debug!(user_id = %id, "unknown caller");
                Err(ApiError::Unauthorized(format!("unknown user {id}")))
            }
            Err(e) => Err(e.into()),
        }
    }
}
