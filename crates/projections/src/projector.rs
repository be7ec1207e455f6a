//! Projection of orders into enriched views.

use std::collections::{HashMap, HashSet};

use common::{ProductId, UserId};
use domain::{CatalogEntry, CatalogLookup, Order, UserDirectory, UserProfile};
use futures_util::future::try_join_all;

use crate::Result;
use crate::views::{ContactSnapshot, OrderLineView, OrderView, ProductSnapshot};

/// Catalog entries and profiles resolved for one projection call.
///
/// A `None` value records a reference that no longer resolves.
#[derive(Debug, Default)]
struct Snapshots {
    products: HashMap<ProductId, Option<CatalogEntry>>,
    users: HashMap<UserId, Option<UserProfile>>,
}

impl Snapshots {
    fn product(&self, id: ProductId) -> Option<&CatalogEntry> {
        self.products.get(&id).and_then(Option::as_ref)
    }

    fn contact(&self, id: UserId) -> Option<ContactSnapshot> {
        self.users
            .get(&id)
            .and_then(Option::as_ref)
            .map(ContactSnapshot::from)
    }

    fn view(&self, order: &Order) -> OrderView {
        let items = order
            .items()
            .iter()
            .map(|line| {
                let product = self.product(line.product_id).map(|entry| {
                    let producer = self.contact(entry.owner_id);
                    if producer.is_none() {
                        dangling("user", &entry.owner_id);
                    }
                    ProductSnapshot::new(entry, producer)
                });
                if product.is_none() {
                    dangling("product", &line.product_id);
                }

                OrderLineView {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    line_total: product.as_ref().and_then(|p| p.price.checked_mul(line.quantity)),
                    product,
                }
            })
            .collect();

        let buyer = self.contact(order.owner_id());
        if buyer.is_none() {
            dangling("user", &order.owner_id());
        }

        OrderView {
            id: order.id(),
            owner_id: order.owner_id(),
            buyer,
            items,
            total_amount: order.total_amount(),
            status: order.status(),
            notes: order.notes().map(str::to_string),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }
}

fn dangling(reference: &'static str, id: &dyn std::fmt::Display) {
    metrics::counter!("projection_dangling_references_total", "reference" => reference)
        .increment(1);
    tracing::debug!(reference, %id, "dangling reference in order view");
}

/// Builds [`OrderView`]s from orders.
///
/// All lookups for one call run concurrently and each product or user is
/// fetched at most once, however many orders reference it.
#[derive(Clone)]
pub struct OrderViewProjector<C, U> {
    catalog: C,
    users: U,
}

impl<C: CatalogLookup, U: UserDirectory> OrderViewProjector<C, U> {
    /// Creates a projector over the given lookups.
    pub fn new(catalog: C, users: U) -> Self {
        Self { catalog, users }
    }

    /// Projects a single order.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    pub async fn project(&self, order: &Order) -> Result<OrderView> {
        let snapshots = self.resolve(std::slice::from_ref(order)).await?;
        Ok(snapshots.view(order))
    }

    /// Projects many orders, sharing lookups between them.
    #[tracing::instrument(skip(self, orders), fields(orders = orders.len()))]
    pub async fn project_all(&self, orders: &[Order]) -> Result<Vec<OrderView>> {
        let snapshots = self.resolve(orders).await?;
        Ok(orders.iter().map(|order| snapshots.view(order)).collect())
    }

    async fn resolve(&self, orders: &[Order]) -> Result<Snapshots> {
        let product_ids: HashSet<ProductId> = orders
            .iter()
            .flat_map(|order| order.items().iter().map(|line| line.product_id))
            .collect();

        let products: HashMap<_, _> = try_join_all(product_ids.into_iter().map(|id| async move {
            self.catalog.get_product(id).await.map(|entry| (id, entry))
        }))
        .await?
        .into_iter()
        .collect();

        let user_ids: HashSet<UserId> = orders
            .iter()
            .map(Order::owner_id)
            .chain(products.values().flatten().map(|entry| entry.owner_id))
            .collect();

        let users = try_join_all(user_ids.into_iter().map(|id| async move {
            self.users.get_user(id).await.map(|profile| (id, profile))
        }))
        .await?
        .into_iter()
        .collect();

        Ok(Snapshots { products, users })
    }
}
