//! Order domain events and the publisher seam used by placement.

use std::sync::{Arc, Mutex};

use common::OrderId;
use serde::{Deserialize, Serialize};

use super::Order;

/// Event type name emitted after an order is persisted.
pub const ORDER_CREATED: &str = "order.created";

/// Events emitted by the order workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// An order was placed and persisted.
    #[serde(rename = "order.created")]
    OrderCreated { order: Order },
}

impl OrderEvent {
    /// Creates an `order.created` event.
    pub fn order_created(order: Order) -> Self {
        OrderEvent::OrderCreated { order }
    }

    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated { .. } => ORDER_CREATED,
        }
    }

    /// Returns the order the event carries.
    pub fn order(&self) -> &Order {
        match self {
            OrderEvent::OrderCreated { order } => order,
        }
    }

    pub fn order_id(&self) -> OrderId {
        self.order().id()
    }
}

/// Receives order events.
///
/// `publish` is synchronous and must not block: the placing request never
/// waits on downstream consumers and never sees their failures.
pub trait OrderEventPublisher: Send + Sync {
    fn publish(&self, event: OrderEvent);
}

impl<T: OrderEventPublisher + ?Sized> OrderEventPublisher for Arc<T> {
    fn publish(&self, event: OrderEvent) {
        (**self).publish(event)
    }
}

/// Publisher that records events in memory. Useful for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventPublisher {
    events: Arc<Mutex<Vec<OrderEvent>>>,
}

impl InMemoryEventPublisher {
    /// Creates an empty publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every event published so far.
    pub fn events(&self) -> Vec<OrderEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns the number of events published so far.
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OrderEventPublisher for InMemoryEventPublisher {
    fn publish(&self, event: OrderEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
