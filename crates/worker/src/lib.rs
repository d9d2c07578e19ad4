//! Background task queue for Bankline.
//!
//! - [`TaskDistributor`] writes tasks to the durable queue, optionally inside
//!   a caller's transaction.
//! - [`TaskProcessor`] claims due tasks by weighted queue priority, runs the
//!   handler registered in its [`ServeMux`], and acks, retries, or archives.
//! - [`PgBroker`] is the PostgreSQL-backed [`Broker`].

pub mod broker;
pub mod distributor;
pub mod error;
pub mod mux;
pub mod processor;
pub mod tasks;

#[cfg(test)]
pub(crate) mod testing;

pub use broker::{Broker, BrokerError, PgBroker, Task};
pub use distributor::{DistributeError, TaskDistributor, TaskInfo};
pub use error::{ProcessError, ProcessorError};
pub use mux::{ServeMux, TaskHandler};
pub use processor::{ErrorHook, ProcessorConfig, RetryDelayFn, TaskFailure, TaskProcessor};
pub use tasks::SendVerifyEmailHandler;
