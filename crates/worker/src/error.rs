//! Worker error types.

use bankline_core::task::{ProcessorState, SchedulerError};
use bankline_db::StoreError;
use bankline_shared::EmailError;
use sea_orm::DbErr;
use thiserror::Error;

/// A task handler failed. The processor retries or archives the task.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// No handler is registered for the task type.
    #[error("No handler registered for task type {0}")]
    UnknownType(String),

    /// The payload could not be decoded.
    #[error("Invalid task payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// The user named in the payload does not exist.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// A store transaction failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A query failed.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// The email could not be sent.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// The handler panicked.
    #[error("Handler panicked: {0}")]
    Panic(String),

    /// Any other handler failure.
    #[error("{0}")]
    Failed(String),
}

/// Errors starting a [`TaskProcessor`](crate::TaskProcessor).
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// `start` was called on a processor that is not in `Created`.
    #[error("Processor cannot start from state {0}")]
    AlreadyStarted(ProcessorState),

    /// `start` was called outside a tokio runtime.
    #[error("Processor must be started inside a tokio runtime")]
    NoRuntime,

    /// The queue configuration is invalid.
    #[error("Invalid queue configuration: {0}")]
    Config(#[from] SchedulerError),
}
