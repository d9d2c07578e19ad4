//! Entry queries.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, NotSet, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use super::queries::{Page, Queries};
use crate::entities::entries;

/// Input for creating an entry.
#[derive(Debug, Clone, Copy)]
pub struct CreateEntryParams {
    /// Account the entry belongs to.
    pub account_id: i64,
    /// Signed amount, negative for debits.
    pub amount: i64,
}

impl<C: ConnectionTrait> Queries<'_, C> {
    /// Inserts an entry.
    pub async fn create_entry(&self, params: CreateEntryParams) -> Result<entries::Model, DbErr> {
        entries::ActiveModel {
            id: NotSet,
            account_id: Set(params.account_id),
            amount: Set(params.amount),
            created_at: NotSet,
        }
        .insert(self.conn)
        .await
    }

    /// Finds an entry by id.
    pub async fn get_entry(&self, id: i64) -> Result<Option<entries::Model>, DbErr> {
        entries::Entity::find_by_id(id).one(self.conn).await
    }

    /// Lists the entries of one account, oldest first.
    pub async fn list_entries(
        &self,
        account_id: i64,
        page: Page,
    ) -> Result<Vec<entries::Model>, DbErr> {
        entries::Entity::find()
            .filter(entries::Column::AccountId.eq(account_id))
            .order_by_asc(entries::Column::Id)
            .limit(page.limit)
            .offset(page.offset)
            .all(self.conn)
            .await
    }
}
