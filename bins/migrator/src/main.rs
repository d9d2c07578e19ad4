//! Database migration runner for Bankline.
//!
//! Reads `DATABASE_URL` (or `.env`) and applies the ledger, verification,
//! and task-queue schema.
//!
//! Usage:
//!   migrator up      - Run all pending migrations
//!   migrator down    - Rollback last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations

use bankline_db::migration::Migrator;
use sea_orm_migration::cli;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    cli::run_cli(Migrator).await;
}
