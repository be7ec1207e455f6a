//! HTTP API server for the marketplace order backend.
//!
//! Provides REST endpoints for orders and catalog listings, with structured
//! logging (tracing) and Prometheus metrics. Callers identify themselves
//! with the `x-user-id` header.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use document_store::DocumentStore;
use domain::{
    CatalogService, DocumentCatalog, DocumentOrderRepository, DocumentUserDirectory, OrderService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use notifications::{
    DispatcherConfig, DispatcherHandle, ProducerAlertSink, RetryPolicy, spawn_dispatcher,
};
use projections::OrderViewProjector;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: DocumentStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route(
            "/orders",
            post(routes::orders::place::<S>).get(routes::orders::list::<S>),
        )
        .route("/orders/mine", get(routes::orders::mine::<S>))
        .route("/orders/producer", get(routes::orders::for_producer::<S>))
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>)
                .patch(routes::orders::update_status::<S>)
                .delete(routes::orders::delete::<S>),
        )
        .route(
            "/orders/{id}/items/{product_id}",
            delete(routes::orders::remove_item::<S>),
        )
        .route(
            "/products",
            post(routes::products::create::<S>).get(routes::products::list::<S>),
        )
        .route(
            "/products/{id}",
            get(routes::products::get::<S>)
                .patch(routes::products::update::<S>)
                .delete(routes::products::delete::<S>),
        )
        .route("/products/{id}/sold", post(routes::products::mark_sold::<S>))
        .route("/products/{id}/sales", post(routes::products::record_sale::<S>))
        .route(
            "/notifications/dead-letters",
            get(routes::notifications::dead_letters::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the services over `store` and starts the notification dispatcher.
///
/// Must be called from within a Tokio runtime.
pub fn create_state<S: DocumentStore + Clone + 'static>(
    store: S,
    config: &Config,
) -> (Arc<AppState<S>>, DispatcherHandle) {
    let catalog = DocumentCatalog::new(store.clone());
    let users = DocumentUserDirectory::new(store.clone());

    let (queue, dispatcher) = spawn_dispatcher(
        ProducerAlertSink::new(catalog.clone()),
        DispatcherConfig {
            queue_capacity: config.notify_queue_capacity,
            dead_letter_capacity: config.notify_dead_letter_capacity,
            retry: RetryPolicy::default().with_max_attempts(config.notify_max_attempts),
        },
    );

    let orders = OrderService::new(DocumentOrderRepository::new(store), catalog.clone(), queue)
        .with_stock_policy(config.stock_policy);

    let state = Arc::new(AppState {
        orders,
        catalog: CatalogService::new(catalog.clone()),
        views: OrderViewProjector::new(catalog, users.clone()),
        users,
        dead_letters: dispatcher.dead_letters().clone(),
    });

    (state, dispatcher)
}
