//! Task type names and their JSON payloads.

use serde::{Deserialize, Serialize};

/// Type name of the verification email task.
pub const TASK_SEND_VERIFY_EMAIL: &str = "task:send_verify_email";

/// Payload of [`TASK_SEND_VERIFY_EMAIL`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadSendVerifyEmail {
    /// User who should receive the email.
    pub username: String,
}

impl PayloadSendVerifyEmail {
    /// Creates a payload for `username`.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}
