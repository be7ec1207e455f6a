//! Order notification delivery.
//!
//! Placement hands `order.created` events to a [`NotificationQueue`], which
//! never blocks. A background worker drains the queue and delivers each
//! event to a [`NotificationSink`]:
//! - failed deliveries are retried with exponential backoff ([`RetryPolicy`])
//! - events that exhaust their retries, or that could not be queued, are kept
//!   in a bounded [`DeadLetterQueue`] for inspection

pub mod dead_letter;
pub mod dispatcher;
pub mod error;
pub mod retry;
pub mod sink;

pub use dead_letter::{DEFAULT_DEAD_LETTER_CAPACITY, DeadLetter, DeadLetterQueue};
pub use dispatcher::{DispatcherConfig, DispatcherHandle, NotificationQueue, spawn_dispatcher};
pub use error::{NotificationError, Result};
pub use retry::{RetryOutcome, RetryPolicy, retry_with_backoff};
pub use sink::{InMemoryNotificationSink, NotificationSink, ProducerAlertSink};
