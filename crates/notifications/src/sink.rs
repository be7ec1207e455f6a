//! Notification sinks.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::UserId;
use domain::{CatalogLookup, Order, OrderEvent};

use crate::error::{NotificationError, Result};

/// Destination for order notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, event: &OrderEvent) -> Result<()>;
}

#[async_trait]
impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    async fn deliver(&self, event: &OrderEvent) -> Result<()> {
        (**self).deliver(event).await
    }
}

/// Alerts every producer whose listing appears in a new order.
///
/// Alerts are emitted as structured log records. Products that no longer
/// exist are skipped.
#[derive(Clone)]
pub struct ProducerAlertSink<C> {
    catalog: C,
}

impl<C: CatalogLookup> ProducerAlertSink<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// Distinct producers of the order's products, in line order.
    pub async fn producers_for(&self, order: &Order) -> Result<Vec<UserId>> {
        let mut producers = Vec::new();
        for product_id in order.product_ids() {
            match self.catalog.get_product(product_id).await? {
                Some(entry) => {
                    if !producers.contains(&entry.owner_id) {
                        producers.push(entry.owner_id);
                    }
                }
                None => {
                    tracing::debug!(%product_id, order_id = %order.id(), "product gone, no producer to alert");
                }
            }
        }
        Ok(producers)
    }
}

#[async_trait]
impl<C: CatalogLookup> NotificationSink for ProducerAlertSink<C> {
    async fn deliver(&self, event: &OrderEvent) -> Result<()> {
        let order = event.order();
        for producer_id in self.producers_for(order).await? {
            tracing::info!(
                %producer_id,
                order_id = %order.id(),
                buyer_id = %order.owner_id(),
                total = %order.total_amount(),
                "new order for producer"
            );
        }
        Ok(())
    }
}

/// In-memory sink for testing. Records delivered events and can be told to
/// fail a number of deliveries first.
#[derive(Clone, Default)]
pub struct InMemoryNotificationSink {
    delivered: Arc<Mutex<Vec<OrderEvent>>>,
    attempts: Arc<AtomicU32>,
    failures_left: Arc<AtomicU32>,
}

impl InMemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `count` deliveries.
    pub fn failing(count: u32) -> Self {
        let sink = Self::default();
        sink.fail_next(count);
        sink
    }

    /// Fails every delivery.
    pub fn always_failing() -> Self {
        Self::failing(u32::MAX)
    }

    pub fn fail_next(&self, count: u32) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn delivered(&self) -> Vec<OrderEvent> {
        self.delivered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of delivery attempts, failed ones included.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationSink {
    async fn deliver(&self, event: &OrderEvent) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(NotificationError::Delivery(format!(
                "simulated failure for order {}",
                event.order_id()
            )));
        }

        self.delivered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
        Ok(())
    }
}
