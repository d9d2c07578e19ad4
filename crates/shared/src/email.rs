//! Mail-sending capability for transactional emails.
//!
//! Uses `lettre` for SMTP transport.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;
use tracing::debug;

use crate::config::EmailConfig;

/// Email service errors.
#[derive(Debug, Error)]
pub enum EmailError {
    /// Failed to build email message.
    #[error("Failed to build email: {0}")]
    BuildError(String),
    /// Failed to send email.
    #[error("Failed to send email: {0}")]
    SendError(String),
    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Something that can deliver a rendered email.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Sends an HTML email to every address in `to`.
    async fn send_email(&self, subject: &str, content: &str, to: &[String])
    -> Result<(), EmailError>;
}

/// SMTP-backed [`EmailSender`].
#[derive(Clone)]
pub struct SmtpEmailSender {
    config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl std::fmt::Debug for SmtpEmailSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpEmailSender")
            .field("smtp_host", &self.config.smtp_host)
            .field("smtp_port", &self.config.smtp_port)
            .field("from_email", &self.config.from_email)
            .finish_non_exhaustive()
    }
}

impl SmtpEmailSender {
    /// Creates a sender for the configured relay.
    ///
    /// Relays without credentials (a local catcher such as MailHog) are
    /// reached over plain SMTP; authenticated relays use TLS.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let transport = if config.smtp_username.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            );
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|e| EmailError::SendError(e.to_string()))?
                .port(config.smtp_port)
                .credentials(creds)
                .build()
        };

        Ok(Self { config, transport })
    }

    fn build_message(&self, subject: &str, content: &str, to: &[String]) -> Result<Message, EmailError> {
        if to.is_empty() {
            return Err(EmailError::InvalidAddress("no recipients".to_string()));
        }

        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);
        let mut builder = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?,
            )
            .subject(subject)
            .header(ContentType::TEXT_HTML);

        for address in to {
            builder = builder.to(address
                .parse()
                .map_err(|e| EmailError::InvalidAddress(format!("{address}: {e}")))?);
        }

        builder
            .body(content.to_string())
            .map_err(|e| EmailError::BuildError(e.to_string()))
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send_email(
        &self,
        subject: &str,
        content: &str,
        to: &[String],
    ) -> Result<(), EmailError> {
        let message = self.build_message(subject, content, to)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| EmailError::SendError(e.to_string()))?;

        debug!(recipients = to.len(), subject, "email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> SmtpEmailSender {
        SmtpEmailSender::new(EmailConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_new_plain_transport() {
        let sender = sender();
        assert_eq!(sender.config.smtp_port, 1025);
    }

    #[tokio::test]
    async fn test_new_authenticated_transport() {
        let config = EmailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_username: "user".to_string(),
            smtp_password: "password".to_string(),
            ..EmailConfig::default()
        };
        assert!(SmtpEmailSender::new(config).is_ok());
    }

    #[tokio::test]
    async fn test_build_message_rejects_bad_recipient() {
        let err = sender()
            .build_message("Hi", "<p>Hi</p>", &["not-an-address".to_string()])
            .unwrap_err();
        assert!(matches!(err, EmailError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn test_build_message_requires_recipient() {
        let err = sender().build_message("Hi", "<p>Hi</p>", &[]).unwrap_err();
        assert!(matches!(err, EmailError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn test_build_message_ok() {
        let message = sender()
            .build_message("Hi", "<p>Hi</p>", &["alice@example.com".to_string()])
            .unwrap();
        assert_eq!(message.envelope().to().len(), 1);
    }

    #[test]
    fn test_email_error_display() {
        assert_eq!(
            format!("{}", EmailError::BuildError("msg".into())),
            "Failed to build email: msg"
        );
        assert_eq!(
            format!("{}", EmailError::SendError("msg".into())),
            "Failed to send email: msg"
        );
        assert_eq!(
            format!("{}", EmailError::InvalidAddress("msg".into())),
            "Invalid email address: msg"
        );
    }
}
