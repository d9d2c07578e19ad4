//! Account queries.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, DbErr, EntityTrait, NotSet,
    QueryFilter, QueryOrder, QuerySelect, Set, Statement,
};

use super::queries::{Page, Queries};
use crate::entities::accounts;

const ADD_ACCOUNT_BALANCE_SQL: &str = r"
UPDATE accounts
SET balance = balance + $1
WHERE id = $2
RETURNING id, owner, balance, currency, created_at
";

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountParams {
    /// Owning username.
    pub owner: String,
    /// Opening balance.
    pub balance: i64,
    /// Currency code.
    pub currency: String,
}

/// Filter for listing accounts.
#[derive(Debug, Clone)]
pub struct ListAccountsParams {
    /// Restrict to one owner.
    pub owner: Option<String>,
    /// Page to return.
    pub page: Page,
}

impl<C: ConnectionTrait> Queries<'_, C> {
    /// Inserts an account.
    pub async fn create_account(
        &self,
        params: CreateAccountParams,
    ) -> Result<accounts::Model, DbErr> {
        accounts::ActiveModel {
            id: NotSet,
            owner: Set(params.owner),
            balance: Set(params.balance),
            currency: Set(params.currency),
            created_at: NotSet,
        }
        .insert(self.conn)
        .await
    }

    /// Finds an account by id.
    pub async fn get_account(&self, id: i64) -> Result<Option<accounts::Model>, DbErr> {
        accounts::Entity::find_by_id(id).one(self.conn).await
    }

    /// Lists accounts ordered by id.
    pub async fn list_accounts(
        &self,
        params: ListAccountsParams,
    ) -> Result<Vec<accounts::Model>, DbErr> {
        let mut query = accounts::Entity::find();
        if let Some(owner) = params.owner {
            query = query.filter(accounts::Column::Owner.eq(owner));
        }

        query
            .order_by_asc(accounts::Column::Id)
            .limit(params.page.limit)
            .offset(params.page.offset)
            .all(self.conn)
            .await
    }

    /// Adds a signed delta to an account balance in one statement.
    ///
    /// The update takes the row lock and holds it until the surrounding
    /// transaction ends. Returns `None` when the account does not exist.
    pub async fn add_account_balance(
        &self,
        account_id: i64,
        amount: i64,
    ) -> Result<Option<accounts::Model>, DbErr> {
        accounts::Entity::find()
            .from_raw_sql(Statement::from_sql_and_values(
                DbBackend::Postgres,
                ADD_ACCOUNT_BALANCE_SQL,
                [amount.into(), account_id.into()],
            ))
            .one(self.conn)
            .await
    }
}
