//! Queue names and per-task delivery options.

use std::time::Duration;

/// High-priority queue.
pub const QUEUE_CRITICAL: &str = "critical";
/// Fallback queue.
pub const QUEUE_DEFAULT: &str = "default";

const DEFAULT_MAX_RETRY: i32 = 25;

/// Scheduling options attached to a task when it is enqueued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOptions {
    /// Queue (priority class) the task is placed on.
    pub queue: String,
    /// Number of retries after the first failure before the task is archived.
    pub max_retry: i32,
    /// Delay before the task becomes eligible.
    pub process_in: Duration,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            queue: QUEUE_DEFAULT.to_string(),
            max_retry: DEFAULT_MAX_RETRY,
            process_in: Duration::ZERO,
        }
    }
}

impl DeliveryOptions {
    /// Sets the queue.
    #[must_use]
    pub fn queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    /// Sets the retry budget.
    #[must_use]
    pub const fn max_retry(mut self, max_retry: i32) -> Self {
        self.max_retry = max_retry;
        self
    }

    /// Sets the initial delay.
    #[must_use]
    pub const fn process_in(mut self, delay: Duration) -> Self {
        self.process_in = delay;
        self
    }
}
