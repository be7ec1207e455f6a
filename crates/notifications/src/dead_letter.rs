//! Events that could not be delivered.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use domain::OrderEvent;
use metrics::counter;
use serde::Serialize;

/// Dead letters kept when no capacity is configured.
pub const DEFAULT_DEAD_LETTER_CAPACITY: usize = 1000;

/// An undeliverable event together with the reason it was given up on.
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetter {
    pub event: OrderEvent,
    pub error: String,
    /// Delivery attempts made. Zero when the event never reached the worker.
    pub attempts: u32,
    pub failed_at: DateTime<Utc>,
}

impl DeadLetter {
    pub fn new(event: OrderEvent, error: impl Into<String>, attempts: u32) -> Self {
        Self {
            event,
            error: error.into(),
            attempts,
            failed_at: Utc::now(),
        }
    }
}

#[derive(Debug)]
struct Letters {
    entries: VecDeque<DeadLetter>,
    capacity: usize,
    evicted: u64,
}

/// Shared, bounded list of dead letters.
///
/// Once `capacity` letters are held, each new one evicts the oldest.
#[derive(Debug, Clone)]
pub struct DeadLetterQueue {
    letters: Arc<Mutex<Letters>>,
}

impl Default for DeadLetterQueue {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_DEAD_LETTER_CAPACITY)
    }
}

impl DeadLetterQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a queue holding at most `capacity` letters. Zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            letters: Arc::new(Mutex::new(Letters {
                entries: VecDeque::new(),
                capacity: capacity.max(1),
                evicted: 0,
            })),
        }
    }

    pub fn push(&self, letter: DeadLetter) {
        tracing::error!(
            order_id = %letter.event.order_id(),
            event_type = letter.event.event_type(),
            attempts = letter.attempts,
            error = %letter.error,
            "notification moved to dead letter queue"
        );

        let mut letters = self.lock();
        if letters.entries.len() >= letters.capacity
            && let Some(oldest) = letters.entries.pop_front()
        {
            letters.evicted += 1;
            counter!("notifications_dead_letters_evicted_total").increment(1);
            tracing::warn!(
                order_id = %oldest.event.order_id(),
                capacity = letters.capacity,
                "dead letter queue full, evicted oldest entry"
            );
        }
        letters.entries.push_back(letter);
    }

    /// Returns a snapshot of the current dead letters, oldest first.
    pub fn list(&self) -> Vec<DeadLetter> {
        self.lock().entries.iter().cloned().collect()
    }

    /// Removes and returns all dead letters, oldest first.
    pub fn drain(&self) -> Vec<DeadLetter> {
        self.lock().entries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Number of letters dropped to make room since the queue was created.
    pub fn evicted(&self) -> u64 {
        self.lock().evicted
    }

    fn lock(&self) -> MutexGuard<'_, Letters> {
        self.letters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
