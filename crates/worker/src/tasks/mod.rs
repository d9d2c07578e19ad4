//! Task handlers.

mod send_verify_email;

pub use send_verify_email::{SendVerifyEmailHandler, verify_link};
