//! Background task primitives shared by the distributor and the processor.
//!
//! Nothing here touches the broker; these are the pure pieces:
//! - Task payloads and their type names
//! - Delivery options (queue, retry budget, delay)
//! - The default retry backoff
//! - Weighted queue ordering
//! - The processor lifecycle

mod options;
mod payload;
mod retry;
mod scheduler;
mod state;

#[cfg(test)]
mod scheduler_props;

pub use options::{DeliveryOptions, QUEUE_CRITICAL, QUEUE_DEFAULT};
pub use payload::{PayloadSendVerifyEmail, TASK_SEND_VERIFY_EMAIL};
pub use retry::{default_retry_delay, retry_delay_with_jitter};
pub use scheduler::{SchedulerError, WeightedScheduler};
pub use state::ProcessorState;
