//! Notification dead letter inspection.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use document_store::DocumentStore;
use notifications::DeadLetter;
use serde::Serialize;

use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct DeadLettersResponse {
    pub capacity: usize,
    pub evicted: u64,
    pub letters: Vec<DeadLetter>,
}

/// GET /notifications/dead-letters
///
/// Admin only. Returns the retained letters oldest first without removing them.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.0.id))]
pub async fn dead_letters<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
) -> Result<Json<DeadLettersResponse>, ApiError> {
    if !caller.0.is_admin() {
        return Err(ApiError::Forbidden(
            "admin role required to read dead letters".to_string(),
        ));
    }

    let queue = &state.dead_letters;
    Ok(Json(DeadLettersResponse {
        capacity: queue.capacity(),
        evicted: queue.evicted(),
        letters: queue.list(),
    }))
}
