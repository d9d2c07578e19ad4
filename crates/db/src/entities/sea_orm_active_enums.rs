//! `SeaORM` active enums.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a queued task row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum TaskState {
    /// Waiting for `process_at`.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Claimed by a worker under a lease.
    #[sea_orm(string_value = "active")]
    Active,
    /// Dead-lettered after exhausting its retries.
    #[sea_orm(string_value = "archived")]
    Archived,
}
