//! Email verification queries.

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, DbErr, EntityTrait, NotSet,
    QueryFilter, QueryOrder, Set, Statement,
};

use super::queries::Queries;
use crate::entities::verify_emails;

/// How long a verification link stays valid.
pub const VERIFY_EMAIL_TTL_MINUTES: i64 = 15;

const CONSUME_VERIFY_EMAIL_SQL: &str = r"
UPDATE verify_emails
SET is_used = TRUE
WHERE id = $1
  AND secret_code = $2
  AND is_used = FALSE
  AND expired_at > now()
RETURNING id, username, email, secret_code, is_used, created_at, expired_at
";

/// Input for creating a verification record.
#[derive(Debug, Clone)]
pub struct CreateVerifyEmailParams {
    /// User being verified.
    pub username: String,
    /// Address the link is sent to.
    pub email: String,
    /// Random secret embedded in the link.
    pub secret_code: String,
}

impl<C: ConnectionTrait> Queries<'_, C> {
    /// Inserts a verification record expiring in 15 minutes.
    pub async fn create_verify_email(
        &self,
        params: CreateVerifyEmailParams,
    ) -> Result<verify_emails::Model, DbErr> {
        let now = Utc::now();

        verify_emails::ActiveModel {
            id: NotSet,
            username: Set(params.username),
            email: Set(params.email),
            secret_code: Set(params.secret_code),
            is_used: Set(false),
            created_at: Set(now.into()),
            expired_at: Set((now + Duration::minutes(VERIFY_EMAIL_TTL_MINUTES)).into()),
        }
        .insert(self.conn)
        .await
    }

    /// Latest unused, unexpired verification record of a user.
    pub async fn find_pending_verify_email(
        &self,
        username: &str,
    ) -> Result<Option<verify_emails::Model>, DbErr> {
        verify_emails::Entity::find()
            .filter(verify_emails::Column::Username.eq(username))
            .filter(verify_emails::Column::IsUsed.eq(false))
            .filter(verify_emails::Column::ExpiredAt.gt(Utc::now()))
            .order_by_desc(verify_emails::Column::CreatedAt)
            .one(self.conn)
            .await
    }

    /// Marks a record used if the secret matches and it is still valid.
    ///
    /// Returns `None` for a wrong secret, a used record, or an expired one.
    pub async fn consume_verify_email(
        &self,
        id: i64,
        secret_code: &str,
    ) -> Result<Option<verify_emails::Model>, DbErr> {
        verify_emails::Entity::find()
            .from_raw_sql(Statement::from_sql_and_values(
                DbBackend::Postgres,
                CONSUME_VERIFY_EMAIL_SQL,
                [id.into(), secret_code.into()],
            ))
            .one(self.conn)
            .await
    }
}
