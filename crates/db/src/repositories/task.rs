//! Durable task queue queries.
//!
//! Tasks move `pending -> active -> (deleted | pending | archived)`. A claim
//! sets a lease; an `active` task whose lease has expired is claimable again,
//! so a crashed worker never strands a task.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, Statement, sea_query::Expr,
};
use uuid::Uuid;

use super::queries::Queries;
use crate::entities::{sea_orm_active_enums::TaskState, tasks};

const CLAIM_NEXT_TASK_SQL: &str = r"
UPDATE tasks
SET state = 'active',
    lease_expires_at = $3,
    updated_at = $2
WHERE id = (
    SELECT id FROM tasks
    WHERE queue = $1
      AND (
        (state = 'pending' AND process_at <= $2)
        OR (state = 'active' AND lease_expires_at < $2)
      )
    ORDER BY process_at
    LIMIT 1
    FOR UPDATE SKIP LOCKED
)
RETURNING id, type_name, payload, queue, state, max_retry, retried, last_error,
          process_at, lease_expires_at, created_at, updated_at
";

/// A task ready to be written to the queue.
#[derive(Debug, Clone)]
pub struct NewTask {
    /// Task id.
    pub id: Uuid,
    /// Handler routing key.
    pub type_name: String,
    /// Serialized payload.
    pub payload: Vec<u8>,
    /// Queue name.
    pub queue: String,
    /// Retry budget.
    pub max_retry: i32,
    /// Earliest processing time.
    pub process_at: DateTime<Utc>,
}

impl<C: ConnectionTrait> Queries<'_, C> {
    /// Writes a `pending` task.
    pub async fn enqueue_task(&self, task: NewTask) -> Result<tasks::Model, DbErr> {
        let now = Utc::now();

        tasks::ActiveModel {
            id: Set(task.id),
            type_name: Set(task.type_name),
            payload: Set(task.payload),
            queue: Set(task.queue),
            state: Set(TaskState::Pending),
            max_retry: Set(task.max_retry),
            retried: Set(0),
            last_error: Set(None),
            process_at: Set(task.process_at.into()),
            lease_expires_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(self.conn)
        .await
    }

    /// Finds a task by id.
    pub async fn get_task(&self, id: Uuid) -> Result<Option<tasks::Model>, DbErr> {
        tasks::Entity::find_by_id(id).one(self.conn).await
    }

    /// Claims the oldest due task of `queue`, leasing it until `lease_expires_at`.
    ///
    /// Rows locked by a concurrent claimer are skipped rather than waited on.
    pub async fn claim_next_task(
        &self,
        queue: &str,
        now: DateTime<Utc>,
        lease_expires_at: DateTime<Utc>,
    ) -> Result<Option<tasks::Model>, DbErr> {
        tasks::Entity::find()
            .from_raw_sql(Statement::from_sql_and_values(
                DbBackend::Postgres,
                CLAIM_NEXT_TASK_SQL,
                [queue.into(), now.into(), lease_expires_at.into()],
            ))
            .one(self.conn)
            .await
    }

    /// Deletes a completed task. Returns false if the task was not active.
    pub async fn ack_task(&self, id: Uuid) -> Result<bool, DbErr> {
        let result = tasks::Entity::delete_many()
            .filter(tasks::Column::Id.eq(id))
            .filter(tasks::Column::State.eq(TaskState::Active))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Puts a failed task back to `pending`, due at `process_at`.
    pub async fn retry_task(
        &self,
        id: Uuid,
        error: &str,
        process_at: DateTime<Utc>,
    ) -> Result<bool, DbErr> {
        let result = tasks::Entity::update_many()
            .col_expr(tasks::Column::State, Expr::value(TaskState::Pending))
            .col_expr(tasks::Column::Retried, Expr::col(tasks::Column::Retried).add(1))
            .col_expr(tasks::Column::LastError, Expr::value(error))
            .col_expr(tasks::Column::ProcessAt, Expr::value(process_at))
            .col_expr(tasks::Column::LeaseExpiresAt, Expr::value(Option::<DateTime<Utc>>::None))
            .col_expr(tasks::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(tasks::Column::Id.eq(id))
            .filter(tasks::Column::State.eq(TaskState::Active))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Dead-letters a task that exhausted its retries.
    pub async fn archive_task(&self, id: Uuid, error: &str) -> Result<bool, DbErr> {
        let result = tasks::Entity::update_many()
            .col_expr(tasks::Column::State, Expr::value(TaskState::Archived))
            .col_expr(tasks::Column::LastError, Expr::value(error))
            .col_expr(tasks::Column::LeaseExpiresAt, Expr::value(Option::<DateTime<Utc>>::None))
            .col_expr(tasks::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(tasks::Column::Id.eq(id))
            .filter(tasks::Column::State.eq(TaskState::Active))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Lists archived tasks, newest first.
    pub async fn list_archived_tasks(&self, queue: &str) -> Result<Vec<tasks::Model>, DbErr> {
        tasks::Entity::find()
            .filter(tasks::Column::Queue.eq(queue))
            .filter(tasks::Column::State.eq(TaskState::Archived))
            .order_by_desc(tasks::Column::UpdatedAt)
            .all(self.conn)
            .await
    }
}
