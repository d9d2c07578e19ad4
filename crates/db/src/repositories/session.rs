//! Session queries.
//!
//! Tokens arrive here already hashed; see `bankline_core::auth::hash_token`.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, NotSet, QueryFilter, Set,
    Unchanged,
};
use uuid::Uuid;

use super::queries::Queries;
use crate::entities::sessions;

/// Input for opening a session at login.
#[derive(Debug, Clone)]
pub struct CreateSessionParams {
    /// Session owner.
    pub username: String,
    /// Digest of the access token.
    pub access_token_hash: String,
    /// When the access token stops working.
    pub access_expires_at: DateTime<Utc>,
    /// Digest of the refresh token.
    pub refresh_token_hash: String,
    /// Client `User-Agent` header.
    pub user_agent: String,
    /// Client address.
    pub client_ip: String,
    /// When the refresh token, and so the session, expires.
    pub expires_at: DateTime<Utc>,
}

impl<C: ConnectionTrait> Queries<'_, C> {
    /// Inserts a session.
    pub async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<sessions::Model, DbErr> {
        sessions::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(params.username),
            access_token_hash: Set(params.access_token_hash),
            access_expires_at: Set(params.access_expires_at.into()),
            refresh_token_hash: Set(params.refresh_token_hash),
            user_agent: Set(params.user_agent),
            client_ip: Set(params.client_ip),
            is_blocked: Set(false),
            expires_at: Set(params.expires_at.into()),
            created_at: NotSet,
        }
        .insert(self.conn)
        .await
    }

    /// Finds the session holding an access token digest.
    pub async fn get_session_by_access_token(
        &self,
        access_token_hash: &str,
    ) -> Result<Option<sessions::Model>, DbErr> {
        sessions::Entity::find()
            .filter(sessions::Column::AccessTokenHash.eq(access_token_hash))
            .one(self.conn)
            .await
    }

    /// Finds the session holding a refresh token digest.
    pub async fn get_session_by_refresh_token(
        &self,
        refresh_token_hash: &str,
    ) -> Result<Option<sessions::Model>, DbErr> {
        sessions::Entity::find()
            .filter(sessions::Column::RefreshTokenHash.eq(refresh_token_hash))
            .one(self.conn)
            .await
    }

    /// Replaces a session's access token. The previous one stops working.
    pub async fn renew_access_token(
        &self,
        id: Uuid,
        access_token_hash: String,
        access_expires_at: DateTime<Utc>,
    ) -> Result<sessions::Model, DbErr> {
        sessions::ActiveModel {
            id: Unchanged(id),
            access_token_hash: Set(access_token_hash),
            access_expires_at: Set(access_expires_at.into()),
            ..Default::default()
        }
        .update(self.conn)
        .await
    }

    /// Blocks a session so neither of its tokens is accepted again.
    pub async fn block_session(&self, id: Uuid) -> Result<sessions::Model, DbErr> {
        sessions::ActiveModel {
            id: Unchanged(id),
            is_blocked: Set(true),
            ..Default::default()
        }
        .update(self.conn)
        .await
    }
}

impl sessions::Model {
    /// Whether the access token is still accepted at `now`.
    #[must_use]
    pub fn access_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_blocked && now < self.access_expires_at && now < self.expires_at
    }

    /// Whether the refresh token is still accepted at `now`.
    #[must_use]
    pub fn refresh_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_blocked && now < self.expires_at
    }
}
