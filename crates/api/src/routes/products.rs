//! Catalog listing endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::ProductId;
use document_store::DocumentStore;
use domain::{CatalogEntry, ListingUpdate, NewListing};
use serde::Deserialize;

use super::parse_id;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_sold: bool,
}

#[derive(Deserialize)]
pub struct RecordSaleRequest {
    pub quantity: u32,
}

/// POST /products: list a new product owned by the caller.
#[tracing::instrument(skip(state, caller, listing), fields(user_id = %caller.0.id))]
pub async fn create<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Json(listing): Json<NewListing>,
) -> Result<(StatusCode, Json<CatalogEntry>), ApiError> {
    let entry = state.catalog.create_listing(&caller.0, listing).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /products?include_sold=: public listings.
#[tracing::instrument(skip(state, query))]
pub async fn list<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CatalogEntry>>, ApiError> {
    Ok(Json(state.catalog.list_listings(query.include_sold).await?))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<CatalogEntry>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    Ok(Json(state.catalog.get_listing(product_id).await?))
}

/// PATCH /products/{id}: partial listing update.
#[tracing::instrument(skip(state, caller, update), fields(user_id = %caller.0.id))]
pub async fn update<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(update): Json<ListingUpdate>,
) -> Result<Json<CatalogEntry>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    let entry = state
        .catalog
        .update_listing(&caller.0, product_id, update)
        .await?;
    Ok(Json(entry))
}

/// DELETE /products/{id}
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.0.id))]
pub async fn delete<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<CatalogEntry>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    Ok(Json(state.catalog.remove_listing(&caller.0, product_id).await?))
}

/// POST /products/{id}/sold
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.0.id))]
pub async fn mark_sold<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<CatalogEntry>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    Ok(Json(state.catalog.mark_sold(&caller.0, product_id).await?))
}

/// POST /products/{id}/sales: record an offline sale.
#[tracing::instrument(skip(state, caller, req), fields(user_id = %caller.0.id))]
pub async fn record_sale<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<RecordSaleRequest>,
) -> Result<Json<CatalogEntry>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    let entry = state
        .catalog
        .record_sale(&caller.0, product_id, req.quantity)
        .await?;
    Ok(Json(entry))
}
