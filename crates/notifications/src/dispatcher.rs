//! Queue and background worker for order notifications.

use std::time::Duration;

use domain::{OrderEvent, OrderEventPublisher};
use metrics::counter;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::dead_letter::{DEFAULT_DEAD_LETTER_CAPACITY, DeadLetter, DeadLetterQueue};
use crate::error::NotificationError;
use crate::retry::{RetryOutcome, RetryPolicy, retry_with_backoff};
use crate::sink::NotificationSink;

/// Dispatcher settings.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Events buffered before new ones are dead-lettered.
    pub queue_capacity: usize,
    /// Dead letters kept before the oldest are evicted.
    pub dead_letter_capacity: usize,
    pub retry: RetryPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            dead_letter_capacity: DEFAULT_DEAD_LETTER_CAPACITY,
            retry: RetryPolicy::default(),
        }
    }
}

/// Publishing side of the dispatcher.
///
/// `publish` never waits: when the queue is full or the worker has stopped
/// the event goes straight to the dead letter queue.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    sender: mpsc::Sender<OrderEvent>,
    dead_letters: DeadLetterQueue,
}

impl NotificationQueue {
    fn reject(&self, event: OrderEvent, error: NotificationError) {
        counter!("notifications_dropped_total").increment(1);
        tracing::warn!(order_id = %event.order_id(), error = %error, "notification not queued");
        self.dead_letters.push(DeadLetter::new(event, error.to_string(), 0));
    }
}

impl OrderEventPublisher for NotificationQueue {
    fn publish(&self, event: OrderEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => self.reject(event, NotificationError::QueueFull),
            Err(TrySendError::Closed(event)) => self.reject(event, NotificationError::QueueClosed),
        }
    }
}

/// Handle to the background worker.
#[derive(Debug)]
pub struct DispatcherHandle {
    worker: JoinHandle<()>,
    dead_letters: DeadLetterQueue,
}

impl DispatcherHandle {
    pub fn dead_letters(&self) -> &DeadLetterQueue {
        &self.dead_letters
    }

    /// Waits for the worker to drain the queue and stop.
    ///
    /// The worker stops once every [`NotificationQueue`] clone is dropped.
    pub async fn join(self) {
        if let Err(e) = self.worker.await {
            tracing::error!(error = %e, "notification dispatcher panicked");
        }
    }

    /// Like [`join`](Self::join), but aborts the worker after `timeout`.
    pub async fn shutdown(self, timeout: Duration) {
        let abort = self.worker.abort_handle();
        if tokio::time::timeout(timeout, self.join()).await.is_err() {
            tracing::warn!(
                timeout_ms = timeout.as_millis() as u64,
                "notification dispatcher did not drain in time, aborting"
            );
            abort.abort();
        }
    }
}

/// Starts a worker delivering queued events to `sink`.
pub fn spawn_dispatcher<S>(sink: S, config: DispatcherConfig) -> (NotificationQueue, DispatcherHandle)
where
    S: NotificationSink + 'static,
{
    let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
    let dead_letters = DeadLetterQueue::with_capacity(config.dead_letter_capacity);

    let worker = tokio::spawn(run_worker(sink, receiver, config.retry, dead_letters.clone()));
    tracing::info!(
        queue_capacity = config.queue_capacity,
        dead_letter_capacity = config.dead_letter_capacity,
        "notification dispatcher started"
    );

    (
        NotificationQueue {
            sender,
            dead_letters: dead_letters.clone(),
        },
        DispatcherHandle {
            worker,
            dead_letters,
        },
    )
}

async fn run_worker<S: NotificationSink>(
    sink: S,
    mut receiver: mpsc::Receiver<OrderEvent>,
    retry: RetryPolicy,
    dead_letters: DeadLetterQueue,
) {
    while let Some(event) = receiver.recv().await {
        let (sink_ref, event_ref) = (&sink, &event);
        let outcome = retry_with_backoff(&retry, move |_| sink_ref.deliver(event_ref)).await;

        match outcome {
            RetryOutcome::Succeeded { attempts, .. } => {
                counter!("notifications_delivered_total").increment(1);
                tracing::debug!(order_id = %event.order_id(), attempts, "notification delivered");
            }
            RetryOutcome::Exhausted { error, attempts } => {
                counter!("notifications_failed_total").increment(1);
                dead_letters.push(DeadLetter::new(event, error.to_string(), attempts));
            }
        }
    }

    tracing::info!("notification queue closed, dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::InMemoryNotificationSink;
    use common::{ProductId, UserId};
    use document_store::Version;
    use domain::{Money, Order, PricedLine, ValidatedCart};

    fn event() -> OrderEvent {
        let cart = ValidatedCart::new(vec![PricedLine {
            product_id: ProductId::new(),
            title: "Honey".to_string(),
            producer_id: UserId::new(),
            quantity: 2,
            unit_price: Money::from_cents(450),
            catalog_version: Version::first(),
        }])
        .unwrap();
        OrderEvent::order_created(Order::place(UserId::new(), &cart))
    }

    fn fast_config(max_attempts: u32) -> DispatcherConfig {
        DispatcherConfig {
            queue_capacity: 16,
            dead_letter_capacity: 8,
            retry: RetryPolicy::default()
                .with_max_attempts(max_attempts)
                .with_initial_delay(Duration::from_millis(1))
                .with_max_delay(Duration::from_millis(2)),
        }
    }

    #[tokio::test]
    async fn delivers_queued_events() {
        let sink = InMemoryNotificationSink::new();
        let (queue, handle) = spawn_dispatcher(sink.clone(), fast_config(3));

        queue.publish(event());
        queue.publish(event());
        drop(queue);
        let dead_letters = handle.dead_letters().clone();
        handle.join().await;

        assert_eq!(sink.delivered().len(), 2);
        assert!(dead_letters.is_empty());
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let sink = InMemoryNotificationSink::failing(2);
        let (queue, handle) = spawn_dispatcher(sink.clone(), fast_config(3));

        queue.publish(event());
        drop(queue);
        let dead_letters = handle.dead_letters().clone();
        handle.join().await;

        assert_eq!(sink.attempts(), 3);
        assert_eq!(sink.delivered().len(), 1);
        assert!(dead_letters.is_empty());
    }

    #[tokio::test]
    async fn exhausted_deliveries_are_dead_lettered() {
        let sink = InMemoryNotificationSink::always_failing();
        let (queue, handle) = spawn_dispatcher(sink.clone(), fast_config(2));
        let published = event();

        queue.publish(published.clone());
        drop(queue);
        let dead_letters = handle.dead_letters().clone();
        handle.join().await;

        let letters = dead_letters.list();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].attempts, 2);
        assert_eq!(letters[0].event.order_id(), published.order_id());
        assert!(letters[0].error.contains("simulated failure"));
        assert!(sink.delivered().is_empty());
    }

    #[test]
    fn full_queue_dead_letters_without_blocking() {
        let (sender, _receiver) = mpsc::channel(1);
        let queue = NotificationQueue {
            sender,
            dead_letters: DeadLetterQueue::new(),
        };

        queue.publish(event());
        queue.publish(event());

        let letters = queue.dead_letters.list();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].attempts, 0);
        assert_eq!(letters[0].error, "Notification queue is full");
    }

    #[test]
    fn closed_queue_dead_letters() {
        let (sender, receiver) = mpsc::channel(4);
        drop(receiver);
        let queue = NotificationQueue {
            sender,
            dead_letters: DeadLetterQueue::new(),
        };

        queue.publish(event());

        assert_eq!(queue.dead_letters.len(), 1);
        assert_eq!(queue.dead_letters.drain()[0].error, "Notification queue is closed");
        assert!(queue.dead_letters.is_empty());
    }
}
