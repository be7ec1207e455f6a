//! Notification error types.

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur while delivering notifications.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The sink could not deliver the notification.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Resolving the recipients failed.
    #[error("Recipient lookup failed: {0}")]
    Lookup(#[from] DomainError),

    /// The queue had no room for the event.
    #[error("Notification queue is full")]
    QueueFull,

    /// The dispatcher has stopped.
    #[error("Notification queue is closed")]
    QueueClosed,
}

/// Convenience type alias for notification results.
pub type Result<T> = std::result::Result<T, NotificationError>;
