//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, ErrorKind};
use projections::ProjectionError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// The caller could not be identified.
    Unauthorized(String),
    /// Bad request from the client.
    BadRequest(String),
    /// The caller lacks the role the endpoint requires.
    Forbidden(String),
    /// Domain logic error.
    Domain(DomainError),
    /// View projection error.
    Projection(ProjectionError),
}

impl ApiError {
    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Domain(err) => status_for(err.kind()),
            ApiError::Projection(err) => status_for(err.kind()),
        }
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Unauthorized(msg) | ApiError::BadRequest(msg) | ApiError::Forbidden(msg) => {
                msg
            }
            ApiError::Domain(err) => err.to_string(),
            ApiError::Projection(err) => err.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<ProjectionError> for ApiError {
    fn from(err: ProjectionError) -> Self {
        ApiError::Projection(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{OrderId, ProductId, UserId};
    use domain::OrderError;

    #[test]
    fn test_domain_errors_map_by_kind() {
        let not_found = ApiError::from(DomainError::from(OrderError::OrderNotFound(OrderId::new())));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let empty = ApiError::from(DomainError::from(OrderError::EmptyCart));
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

        let forbidden = ApiError::from(DomainError::Forbidden {
            user_id: UserId::new(),
            resource: "order".to_string(),
        });
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let conflict = ApiError::from(DomainError::Conflict("stock changed".to_string()));
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_unauthorized_status() {
        let err = ApiError::Unauthorized("missing x-user-id header".to_string());
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_forbidden_and_overflow_statuses() {
        let err = ApiError::Forbidden("admin role required".to_string());
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let overflow = ApiError::from(DomainError::from(OrderError::AmountOverflow {
            product_id: ProductId::new(),
        }));
        assert_eq!(overflow.status(), StatusCode::BAD_REQUEST);
    }
}
