//! Transfer queries.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, NotSet,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use super::queries::{Page, Queries};
use crate::entities::transfers;

/// Input for creating a transfer record.
#[derive(Debug, Clone, Copy)]
pub struct CreateTransferParams {
    /// Debited account.
    pub from_account_id: i64,
    /// Credited account.
    pub to_account_id: i64,
    /// Positive amount.
    pub amount: i64,
}

/// Filter for listing transfers.
#[derive(Debug, Clone, Copy)]
pub struct ListTransfersParams {
    /// Transfers out of this account.
    pub from_account_id: i64,
    /// Transfers into this account.
    pub to_account_id: i64,
    /// Page to return.
    pub page: Page,
}

impl<C: ConnectionTrait> Queries<'_, C> {
    /// Inserts a transfer record.
    pub async fn create_transfer(
        &self,
        params: CreateTransferParams,
    ) -> Result<transfers::Model, DbErr> {
        transfers::ActiveModel {
            id: NotSet,
            from_account_id: Set(params.from_account_id),
            to_account_id: Set(params.to_account_id),
            amount: Set(params.amount),
            created_at: NotSet,
        }
        .insert(self.conn)
        .await
    }

    /// Finds a transfer by id.
    pub async fn get_transfer(&self, id: i64) -> Result<Option<transfers::Model>, DbErr> {
        transfers::Entity::find_by_id(id).one(self.conn).await
    }

    /// Lists transfers leaving `from_account_id` or arriving at `to_account_id`.
    pub async fn list_transfers(
        &self,
        params: ListTransfersParams,
    ) -> Result<Vec<transfers::Model>, DbErr> {
        transfers::Entity::find()
            .filter(
                Condition::any()
                    .add(transfers::Column::FromAccountId.eq(params.from_account_id))
                    .add(transfers::Column::ToAccountId.eq(params.to_account_id)),
            )
            .order_by_asc(transfers::Column::Id)
            .limit(params.page.limit)
            .offset(params.page.offset)
            .all(self.conn)
            .await
    }
}
