//! Order service: placement, retrieval and authorized mutation.

use std::collections::HashMap;
use std::time::Instant;

use common::{OrderId, ProductId, UserId};
use document_store::StoreError;

use super::{
    Order, OrderError, OrderEvent, OrderEventPublisher, OrderLine, OrderRepository, PlaceOrder,
    RemoveOrderLine, UpdateOrderStatus, ValidatedCart, validate_cart,
};
use crate::authorization::{ensure_owner_or_admin, is_owner_or_admin};
use crate::catalog::CatalogLookup;
use crate::error::DomainError;
use crate::identity::Principal;
use crate::value_objects::Money;

/// How placement treats catalog stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StockPolicy {
    /// Validate against stock but never write it. Concurrent placements for
    /// the same product can both pass validation and oversell.
    #[default]
    Check,

    /// Take stock with a version-guarded decrement before persisting; a lost
    /// race fails the placement with a conflict.
    Reserve,
}

impl StockPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockPolicy::Check => "check",
            StockPolicy::Reserve => "reserve",
        }
    }
}

impl std::fmt::Display for StockPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StockPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "check" => Ok(StockPolicy::Check),
            "reserve" => Ok(StockPolicy::Reserve),
            other => Err(format!("unknown stock policy '{other}' (expected check or reserve)")),
        }
    }
}

fn record_rejection(error: &DomainError) {
    metrics::counter!("orders_rejected_total", "reason" => error.kind().as_str()).increment(1);
}

/// Service for managing orders.
///
/// Placement runs validation, optional stock reservation, persistence and
/// notification strictly in that order. Mutations load the order fresh,
/// authorize against it, and write back with an optimistic version check.
pub struct OrderService<R, C, P> {
    repository: R,
    catalog: C,
    publisher: P,
    stock_policy: StockPolicy,
}

impl<R, C, P> OrderService<R, C, P>
where
    R: OrderRepository,
    C: CatalogLookup,
    P: OrderEventPublisher,
{
    /// Creates a new order service using the `check` stock policy.
    pub fn new(repository: R, catalog: C, publisher: P) -> Self {
        Self {
            repository,
            catalog,
            publisher,
            stock_policy: StockPolicy::default(),
        }
    }

    /// Sets the stock policy.
    pub fn with_stock_policy(mut self, stock_policy: StockPolicy) -> Self {
        self.stock_policy = stock_policy;
        self
    }

    pub fn stock_policy(&self) -> StockPolicy {
        self.stock_policy
    }

    /// Returns a reference to the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Returns a reference to the catalog lookup.
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Validates a cart and persists it as a pending order.
    ///
    /// Prices come from the catalog, never from the client. The
    /// `order.created` event is handed to the publisher after the insert and
    /// its fate does not affect the result.
    #[tracing::instrument(skip(self, cmd), fields(owner_id = %cmd.owner_id, lines = cmd.lines.len()))]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<Order, DomainError> {
        let started = Instant::now();

        let cart = match validate_cart(&self.catalog, &cmd.lines).await {
            Ok(cart) => cart,
            Err(e) => {
                tracing::info!(error = %e, "cart rejected");
                record_rejection(&e);
                return Err(e);
            }
        };

        let reserved = match self.stock_policy {
            StockPolicy::Check => Vec::new(),
            StockPolicy::Reserve => match self.reserve_stock(&cart).await {
                Ok(reserved) => reserved,
                Err(e) => {
                    record_rejection(&e);
                    return Err(e);
                }
            },
        };

        let order = Order::place(cmd.owner_id, &cart);
        let order = match self.repository.insert(&order).await {
            Ok(order) => order,
            Err(e) => {
                tracing::error!(error = %e, "failed to persist order");
                self.release_stock(&reserved).await;
                let e = DomainError::from(e);
                record_rejection(&e);
                return Err(e);
            }
        };

        self.publisher.publish(OrderEvent::order_created(order.clone()));

        metrics::counter!("orders_placed_total").increment(1);
        metrics::histogram!("order_placement_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(
            order_id = %order.id(),
            total = %order.total_amount(),
            items = order.item_count(),
            "order placed"
        );

        Ok(order)
    }

    /// Takes stock for every product in the cart, undoing partial progress
    /// on failure. Returns what was taken.
    async fn reserve_stock(
        &self,
        cart: &ValidatedCart,
    ) -> Result<Vec<(ProductId, u32)>, DomainError> {
        let mut reserved = Vec::new();

        for (product_id, quantity, version) in cart.stock_demand() {
            match self
                .catalog
                .decrement_stock(product_id, quantity, Some(version))
                .await
            {
                Ok(_) => reserved.push((product_id, quantity)),
                Err(e) => {
                    tracing::warn!(%product_id, quantity, error = %e, "stock reservation failed");
                    self.release_stock(&reserved).await;
                    return Err(e);
                }
            }
        }

        Ok(reserved)
    }

    async fn release_stock(&self, reserved: &[(ProductId, u32)]) {
        for &(product_id, quantity) in reserved {
            if let Err(e) = self.catalog.restock(product_id, quantity).await {
                tracing::error!(%product_id, quantity, error = %e, "failed to release reserved stock");
            }
        }
    }

    /// Gets an order by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        Ok(self
            .repository
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?)
    }

    /// Lists every order.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, DomainError> {
        Ok(self.repository.find_all().await?)
    }

    /// Lists the orders placed by a buyer.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders_for_owner(&self, owner_id: UserId) -> Result<Vec<Order>, DomainError> {
        Ok(self.repository.find_by_owner(owner_id).await?)
    }

    /// Lists the orders containing at least one product owned by `producer_id`.
    ///
    /// Each product's owner is looked up at most once per call; lines whose
    /// product no longer exists are skipped.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders_for_producer(
        &self,
        producer_id: UserId,
    ) -> Result<Vec<Order>, DomainError> {
        let orders = self.repository.find_all().await?;
        let mut owners = HashMap::new();
        let mut matching = Vec::new();

        for order in orders {
            if self
                .references_producer(order.items(), producer_id, &mut owners)
                .await?
            {
                matching.push(order);
            }
        }

        Ok(matching)
    }

    /// Moves an order to a new status.
    ///
    /// Allowed for the buyer, an admin, or a producer whose product is on the order.
    #[tracing::instrument(skip(self, principal, cmd), fields(user_id = %principal.id, order_id = %cmd.order_id, status = %cmd.status))]
    pub async fn update_status(
        &self,
        principal: &Principal,
        cmd: UpdateOrderStatus,
    ) -> Result<Order, DomainError> {
        let mut order = self.get_order(cmd.order_id).await?;

        if !is_owner_or_admin(principal, order.owner_id())
            && !self
                .references_producer(order.items(), principal.id, &mut HashMap::new())
                .await?
        {
            return Err(DomainError::Forbidden {
                user_id: principal.id,
                resource: format!("order {}", order.id()),
            });
        }

        let from = order.status();
        order.transition_to(cmd.status, cmd.notes)?;
        let updated = self.save(&order).await?;

        tracing::info!(%from, to = %updated.status(), "order status updated");
        Ok(updated)
    }

    /// Removes every line for a product and reprices the order from the
    /// current catalog.
    #[tracing::instrument(skip(self, principal, cmd), fields(user_id = %principal.id, order_id = %cmd.order_id, product_id = %cmd.product_id))]
    pub async fn remove_line(
        &self,
        principal: &Principal,
        cmd: RemoveOrderLine,
    ) -> Result<Order, DomainError> {
        let mut order = self.get_order(cmd.order_id).await?;
        ensure_owner_or_admin(principal, order.owner_id(), format!("order {}", order.id()))?;

        let removed = order.remove_product(cmd.product_id)?;
        let total = self.current_total(order.items()).await?;
        order.set_total_amount(total);

        let updated = self.save(&order).await?;
        tracing::info!(removed, total = %updated.total_amount(), "order lines removed");
        Ok(updated)
    }

    /// Deletes an order and returns it. Stock is not restored.
    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.id))]
    pub async fn delete_order(
        &self,
        principal: &Principal,
        order_id: OrderId,
    ) -> Result<Order, DomainError> {
        let order = self.get_order(order_id).await?;
        ensure_owner_or_admin(principal, order.owner_id(), format!("order {order_id}"))?;

        let deleted = self
            .repository
            .delete(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;
        tracing::info!("order deleted");
        Ok(deleted)
    }

    /// Writes back a loaded order. An order deleted since it was loaded is
    /// reported as not found.
    async fn save(&self, order: &Order) -> Result<Order, DomainError> {
        match self.repository.update(order).await {
            Ok(updated) => Ok(updated),
            Err(StoreError::NotFound { .. }) => Err(OrderError::OrderNotFound(order.id()).into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Σ(current catalog price × quantity). Lines whose product is gone count as zero.
    async fn current_total(&self, lines: &[OrderLine]) -> Result<Money, DomainError> {
        let mut total = Money::zero();
        for line in lines {
            match self.catalog.get_product(line.product_id).await? {
                Some(entry) => {
                    total = entry
                        .price
                        .checked_mul(line.quantity)
                        .and_then(|line_total| total.checked_add(line_total))
                        .ok_or(OrderError::AmountOverflow {
                            product_id: line.product_id,
                        })?;
                }
                None => {
                    tracing::warn!(product_id = %line.product_id, "product missing while repricing, counting as zero");
                }
            }
        }
        Ok(total)
    }

    async fn references_producer(
        &self,
        lines: &[OrderLine],
        producer_id: UserId,
        owners: &mut HashMap<ProductId, Option<UserId>>,
    ) -> Result<bool, DomainError> {
        for line in lines {
            let owner = match owners.get(&line.product_id) {
                Some(owner) => *owner,
                None => {
                    let owner = self
                        .catalog
                        .get_product(line.product_id)
                        .await?
                        .map(|entry| entry.owner_id);
                    owners.insert(line.product_id, owner);
                    owner
                }
            };
            if owner == Some(producer_id) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
