//! Durable broker seam.
//!
//! The processor only needs four operations from its broker: claim the next
//! due task of a queue, then settle it exactly once by acking, rescheduling,
//! or archiving.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bankline_db::{Queries, entities::tasks};
use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::{DatabaseConnection, DbErr};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Broker failures.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The backing store failed.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// The task was no longer leased to this worker when it was settled.
    #[error("Lease lost for task {0}")]
    LeaseLost(Uuid),
}

/// A claimed unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Task id.
    pub id: Uuid,
    /// Handler routing key.
    pub type_name: String,
    /// Serialized payload.
    pub payload: Vec<u8>,
    /// Queue the task was claimed from.
    pub queue: String,
    /// Retry budget.
    pub max_retry: i32,
    /// Failures so far.
    pub retried: i32,
}

impl From<tasks::Model> for Task {
    fn from(model: tasks::Model) -> Self {
        Self {
            id: model.id,
            type_name: model.type_name,
            payload: model.payload,
            queue: model.queue,
            max_retry: model.max_retry,
            retried: model.retried,
        }
    }
}

/// Consumer side of the task queue.
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Claims the next due task of `queue`, if any.
    async fn dequeue(&self, queue: &str) -> Result<Option<Task>, BrokerError>;

    /// Removes a completed task.
    async fn ack(&self, task: &Task) -> Result<(), BrokerError>;

    /// Reschedules a failed task for `process_at`.
    async fn retry(
        &self,
        task: &Task,
        error: &str,
        process_at: DateTime<Utc>,
    ) -> Result<(), BrokerError>;

    /// Dead-letters a task that exhausted its retries.
    async fn archive(&self, task: &Task, error: &str) -> Result<(), BrokerError>;
}

/// [`Broker`] over the `tasks` table.
///
/// Claims use `FOR UPDATE SKIP LOCKED`, so any number of processors can share
/// the table. A claimed task is leased; if its worker dies, the task becomes
/// claimable again once the lease expires.
#[derive(Debug, Clone)]
pub struct PgBroker {
    db: Arc<DatabaseConnection>,
    lease: TimeDelta,
}

impl PgBroker {
    /// Creates a broker whose claims are leased for `lease`.
    #[must_use]
    pub fn new(db: impl Into<Arc<DatabaseConnection>>, lease: Duration) -> Self {
        Self {
            db: db.into(),
            lease: TimeDelta::from_std(lease).unwrap_or(TimeDelta::MAX),
        }
    }

    fn check_settled(id: Uuid, settled: bool) -> Result<(), BrokerError> {
        if settled {
            Ok(())
        } else {
            Err(BrokerError::LeaseLost(id))
        }
    }
}

#[async_trait]
impl Broker for PgBroker {
    async fn dequeue(&self, queue: &str) -> Result<Option<Task>, BrokerError> {
        let now = Utc::now();
        let lease_expires_at = now.checked_add_signed(self.lease).unwrap_or(DateTime::<Utc>::MAX_UTC);

        let claimed = Queries::new(&*self.db)
            .claim_next_task(queue, now, lease_expires_at)
            .await?;

        if let Some(task) = &claimed {
            debug!(task_id = %task.id, type_name = %task.type_name, queue, "claimed task");
        }

        Ok(claimed.map(Task::from))
    }

    async fn ack(&self, task: &Task) -> Result<(), BrokerError> {
        let settled = Queries::new(&*self.db).ack_task(task.id).await?;
        Self::check_settled(task.id, settled)
    }

    async fn retry(
        &self,
        task: &Task,
        error: &str,
        process_at: DateTime<Utc>,
    ) -> Result<(), BrokerError> {
        let settled = Queries::new(&*self.db)
            .retry_task(task.id, error, process_at)
            .await?;
        Self::check_settled(task.id, settled)
    }

    async fn archive(&self, task: &Task, error: &str) -> Result<(), BrokerError> {
        let settled = Queries::new(&*self.db).archive_task(task.id, error).await?;
        Self::check_settled(task.id, settled)
    }
}
