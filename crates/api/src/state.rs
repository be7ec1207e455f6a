//! Shared application state.

use document_store::DocumentStore;
use domain::{
    CatalogService, DocumentCatalog, DocumentOrderRepository, DocumentUserDirectory, OrderService,
};
use notifications::{DeadLetterQueue, NotificationQueue};
use projections::OrderViewProjector;

/// Order service wired to a document store and the notification queue.
pub type Orders<S> =
    OrderService<DocumentOrderRepository<S>, DocumentCatalog<S>, NotificationQueue>;

/// Projector building enriched order views from a document store.
pub type Views<S> = OrderViewProjector<DocumentCatalog<S>, DocumentUserDirectory<S>>;

/// Shared application state accessible from all handlers.
pub struct AppState<S: DocumentStore> {
    pub orders: Orders<S>,
    pub catalog: CatalogService<S>,
    pub users: DocumentUserDirectory<S>,
    pub views: Views<S>,
    /// Notifications the dispatcher gave up on.
    pub dead_letters: DeadLetterQueue,
}
