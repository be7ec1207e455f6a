//! Order placement, retrieval and mutation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{OrderId, ProductId, UserId};
use document_store::DocumentStore;
use domain::{
    CartLine, DomainError, Money, Order, OrderStatus, PlaceOrder, RemoveOrderLine,
    UpdateOrderStatus,
};
use projections::OrderView;
use serde::Deserialize;

use super::parse_id;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderItemRequest>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Price the client saw; informational only.
    #[serde(default)]
    pub price: Option<Money>,
}

impl From<OrderItemRequest> for CartLine {
    fn from(item: OrderItemRequest) -> Self {
        let line = CartLine::new(item.product_id, item.quantity);
        match item.price {
            Some(price) => line.with_claimed_price(price),
            None => line,
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct ProducerQuery {
    pub producer_id: String,
}

// -- Handlers --

/// POST /orders: place an order for the caller.
#[tracing::instrument(skip(state, caller, req), fields(user_id = %caller.0.id))]
pub async fn place<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let lines = req.items.into_iter().map(CartLine::from).collect();
    let order = state
        .orders
        .place_order(PlaceOrder::new(caller.0.id, lines))
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders: every order, enriched.
#[tracing::instrument(skip(state))]
pub async fn list<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let orders = state.orders.list_orders().await?;
    Ok(Json(state.views.project_all(&orders).await?))
}

/// GET /orders/mine: the caller's orders, enriched.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.0.id))]
pub async fn mine<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let orders = state.orders.list_orders_for_owner(caller.0.id).await?;
    Ok(Json(state.views.project_all(&orders).await?))
}

/// GET /orders/producer?producer_id=: orders containing a producer's products.
#[tracing::instrument(skip(state, query))]
pub async fn for_producer<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ProducerQuery>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let producer_id: UserId = parse_id(&query.producer_id, "producer")?;
    let orders = state.orders.list_orders_for_producer(producer_id).await?;
    Ok(Json(state.views.project_all(&orders).await?))
}

/// GET /orders/{id}: one order, enriched.
#[tracing::instrument(skip(state))]
pub async fn get<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderView>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let order = state.orders.get_order(order_id).await?;
    Ok(Json(state.views.project(&order).await?))
}

/// PATCH /orders/{id}: move an order to a new status.
#[tracing::instrument(skip(state, caller, req), fields(user_id = %caller.0.id))]
pub async fn update_status<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let status: OrderStatus = req.status.parse().map_err(DomainError::from)?;

    let mut cmd = UpdateOrderStatus::new(order_id, status);
    if let Some(notes) = req.notes {
        cmd = cmd.with_notes(notes);
    }

    Ok(Json(state.orders.update_status(&caller.0, cmd).await?))
}

/// DELETE /orders/{id}: delete an order.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.0.id))]
pub async fn delete<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    Ok(Json(state.orders.delete_order(&caller.0, order_id).await?))
}

/// DELETE /orders/{id}/items/{product_id}: remove a product's lines from an order.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.0.id))]
pub async fn remove_item<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path((id, product_id)): Path<(String, String)>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let product_id: ProductId = parse_id(&product_id, "product")?;

    let order = state
        .orders
        .remove_line(&caller.0, RemoveOrderLine::new(order_id, product_id))
        .await?;
    Ok(Json(order))
}
