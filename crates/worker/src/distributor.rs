//! Producer side of the task queue.

use std::collections::BTreeSet;
use std::sync::Arc;

use bankline_core::task::{DeliveryOptions, PayloadSendVerifyEmail, TASK_SEND_VERIFY_EMAIL};
use bankline_db::{Queries, repositories::NewTask};
use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::{ConnectionTrait, DbErr};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// The task was not admitted to the queue.
#[derive(Debug, Error)]
pub enum DistributeError {
    /// The queue is not one the processors consume.
    #[error("Unknown queue: {0}")]
    UnknownQueue(String),

    /// The retry budget is negative.
    #[error("max_retry must not be negative, got {0}")]
    InvalidMaxRetry(i32),

    /// The delay does not fit a timestamp.
    #[error("Delay out of range")]
    InvalidDelay,

    /// The payload could not be serialized.
    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The task row could not be written.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Receipt for an enqueued task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    /// Task id.
    pub id: Uuid,
    /// Handler routing key.
    pub type_name: String,
    /// Queue the task was placed on.
    pub queue: String,
    /// Retry budget.
    pub max_retry: i32,
    /// Earliest processing time.
    pub process_at: DateTime<Utc>,
}

/// Enqueues tasks onto the durable queue.
///
/// Cheap to clone. Every method takes the connection to write through, so a
/// task enqueued with a [`sea_orm::DatabaseTransaction`] becomes visible only
/// when that transaction commits.
#[derive(Debug, Clone)]
pub struct TaskDistributor {
    queues: Arc<BTreeSet<String>>,
}

impl TaskDistributor {
    /// Creates a distributor that admits tasks for `queues`.
    pub fn new<I, S>(queues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queues: Arc::new(queues.into_iter().map(Into::into).collect()),
        }
    }

    /// Enqueues a task of `type_name` carrying `payload`.
    pub async fn distribute_task<C, P>(
        &self,
        conn: &C,
        type_name: &str,
        payload: &P,
        opts: DeliveryOptions,
    ) -> Result<TaskInfo, DistributeError>
    where
        C: ConnectionTrait,
        P: Serialize + ?Sized,
    {
        if !self.queues.contains(&opts.queue) {
            return Err(DistributeError::UnknownQueue(opts.queue));
        }
        if opts.max_retry < 0 {
            return Err(DistributeError::InvalidMaxRetry(opts.max_retry));
        }

        let payload = serde_json::to_vec(payload)?;
        let delay = TimeDelta::from_std(opts.process_in).map_err(|_| DistributeError::InvalidDelay)?;
        let process_at = Utc::now()
            .checked_add_signed(delay)
            .ok_or(DistributeError::InvalidDelay)?;

        let task = Queries::new(conn)
            .enqueue_task(NewTask {
                id: Uuid::now_v7(),
                type_name: type_name.to_string(),
                payload,
                queue: opts.queue,
                max_retry: opts.max_retry,
                process_at,
            })
            .await?;

        info!(
            task_id = %task.id,
            type_name = %task.type_name,
            queue = %task.queue,
            max_retry = task.max_retry,
            "enqueued task"
        );

        Ok(TaskInfo {
            id: task.id,
            type_name: task.type_name,
            queue: task.queue,
            max_retry: task.max_retry,
            process_at: task.process_at.with_timezone(&Utc),
        })
    }

    /// Enqueues a verification email for a newly registered user.
    pub async fn distribute_task_send_verify_email<C: ConnectionTrait>(
        &self,
        conn: &C,
        payload: &PayloadSendVerifyEmail,
        opts: DeliveryOptions,
    ) -> Result<TaskInfo, DistributeError> {
        self.distribute_task(conn, TASK_SEND_VERIFY_EMAIL, payload, opts)
            .await
    }
}
