//! User queries.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, NotSet, Set, Unchanged};

use super::queries::Queries;
use crate::entities::users;

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct CreateUserParams {
    /// Unique login name.
    pub username: String,
    /// Argon2 PHC string.
    pub hashed_password: String,
    /// Display name.
    pub full_name: String,
    /// Unique email address.
    pub email: String,
}

/// Partial profile update. `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserParams {
    /// User to update.
    pub username: String,
    /// New display name.
    pub full_name: Option<String>,
    /// New email address.
    pub email: Option<String>,
    /// New Argon2 PHC string. Also stamps `password_changed_at`.
    pub hashed_password: Option<String>,
}

impl UpdateUserParams {
    /// Whether any column would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.email.is_none() && self.hashed_password.is_none()
    }
}

impl<C: ConnectionTrait> Queries<'_, C> {
    /// Inserts a user.
    pub async fn create_user(&self, params: CreateUserParams) -> Result<users::Model, DbErr> {
        users::ActiveModel {
            username: Set(params.username),
            hashed_password: Set(params.hashed_password),
            full_name: Set(params.full_name),
            email: Set(params.email),
            is_email_verified: Set(false),
            password_changed_at: NotSet,
            created_at: NotSet,
        }
        .insert(self.conn)
        .await
    }

    /// Finds a user by username.
    pub async fn get_user(&self, username: &str) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find_by_id(username.to_owned())
            .one(self.conn)
            .await
    }

    /// Updates the given profile columns.
    pub async fn update_user(&self, params: UpdateUserParams) -> Result<users::Model, DbErr> {
        let mut user = users::ActiveModel {
            username: Unchanged(params.username),
            ..Default::default()
        };
        if let Some(full_name) = params.full_name {
            user.full_name = Set(full_name);
        }
        if let Some(email) = params.email {
            user.email = Set(email);
        }
        if let Some(hashed_password) = params.hashed_password {
            user.hashed_password = Set(hashed_password);
            user.password_changed_at = Set(Utc::now().into());
        }

        user.update(self.conn).await
    }

    /// Marks a user's email address as verified.
    pub async fn mark_email_verified(&self, username: &str) -> Result<users::Model, DbErr> {
        users::ActiveModel {
            username: Unchanged(username.to_owned()),
            is_email_verified: Set(true),
            ..Default::default()
        }
        .update(self.conn)
        .await
    }
}
