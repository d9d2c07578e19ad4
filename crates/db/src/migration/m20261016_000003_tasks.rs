//! Migration to create the `tasks` table backing the background task queue.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(TASKS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS tasks;").await?;
        Ok(())
    }
}

const TASKS_SQL: &str = r"
CREATE TABLE tasks (
    id UUID PRIMARY KEY,
    type_name VARCHAR(128) NOT NULL,
    payload BYTEA NOT NULL,
    queue VARCHAR(64) NOT NULL,
    -- pending | active | archived
    state VARCHAR(16) NOT NULL DEFAULT 'pending',
    max_retry INTEGER NOT NULL,
    retried INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    process_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    lease_expires_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_tasks_state CHECK (state IN ('pending', 'active', 'archived')),
    CONSTRAINT chk_tasks_max_retry CHECK (max_retry >= 0)
);

-- Claim path: next due task per queue
CREATE INDEX idx_tasks_claim ON tasks(queue, state, process_at);
";
