//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration.

pub use sea_orm_migration::prelude::*;

mod m20261016_000001_initial;
mod m20261016_000002_verify_emails;
mod m20261016_000003_tasks;
mod m20261016_000004_sessions;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261016_000001_initial::Migration),
            Box::new(m20261016_000002_verify_emails::Migration),
            Box::new(m20261016_000003_tasks::Migration),
            Box::new(m20261016_000004_sessions::Migration),
        ]
    }
}
