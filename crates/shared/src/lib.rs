//! Shared errors, configuration, and mail transport for Bankline.
//!
//! This crate provides common pieces used across all other crates:
//! - Application-wide error types
//! - Configuration management
//! - The mail-sending capability used by background tasks

pub mod config;
pub mod email;
pub mod error;

pub use config::{
    AppConfig, AuthConfig, DatabaseConfig, EmailConfig, ServerConfig, WorkerConfig,
};
pub use email::{EmailError, EmailSender, SmtpEmailSender};
pub use error::{AppError, AppResult};
