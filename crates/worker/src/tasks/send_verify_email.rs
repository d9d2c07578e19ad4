//! `task:send_verify_email`: mails a new user their verification link.

use std::sync::Arc;

use async_trait::async_trait;
use bankline_core::task::PayloadSendVerifyEmail;
use bankline_db::{Store, repositories::CreateVerifyEmailParams};
use bankline_shared::EmailSender;
use rand::{Rng, distr::Alphanumeric};
use tracing::info;

use crate::broker::Task;
use crate::error::ProcessError;
use crate::mux::TaskHandler;

const SECRET_CODE_LEN: usize = 32;
const SUBJECT: &str = "Welcome to Bankline";

/// Sends the verification email for a registered user.
///
/// An unexpired, unused verification record is reused, so a retried task
/// mails the same link instead of minting a new one each attempt.
pub struct SendVerifyEmailHandler {
    store: Store,
    mailer: Arc<dyn EmailSender>,
    verify_base_url: String,
}

impl SendVerifyEmailHandler {
    /// Creates the handler. Links point at `verify_base_url`.
    pub fn new(store: Store, mailer: Arc<dyn EmailSender>, verify_base_url: impl Into<String>) -> Self {
        Self {
            store,
            mailer,
            verify_base_url: verify_base_url.into(),
        }
    }
}

#[async_trait]
impl TaskHandler for SendVerifyEmailHandler {
    async fn process_task(&self, task: &Task) -> Result<(), ProcessError> {
        let payload: PayloadSendVerifyEmail = serde_json::from_slice(&task.payload)?;
        let queries = self.store.queries();

        let user = queries
            .get_user(&payload.username)
            .await?
            .ok_or_else(|| ProcessError::UserNotFound(payload.username.clone()))?;

        let verify_email = match queries.find_pending_verify_email(&user.username).await? {
            Some(existing) => existing,
            None => {
                queries
                    .create_verify_email(CreateVerifyEmailParams {
                        username: user.username.clone(),
                        email: user.email.clone(),
                        secret_code: secret_code(),
                    })
                    .await?
            }
        };

        let link = verify_link(&self.verify_base_url, verify_email.id, &verify_email.secret_code);
        let content = format!(
            "Hello {name},<br/>\
             Thank you for registering with us!<br/>\
             Please <a href=\"{link}\">click here</a> to verify your email address.<br/>",
            name = user.full_name,
        );

        self.mailer
            .send_email(SUBJECT, &content, &[verify_email.email.clone()])
            .await?;

        info!(
            task_id = %task.id,
            username = %user.username,
            email = %verify_email.email,
            "verification email sent"
        );
        Ok(())
    }
}

/// Verification URL for one record.
#[must_use]
pub fn verify_link(base_url: &str, email_id: i64, secret_code: &str) -> String {
    format!("{base_url}?email_id={email_id}&secret_code={secret_code}")
}

fn secret_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_CODE_LEN)
        .map(char::from)
        .collect()
}
