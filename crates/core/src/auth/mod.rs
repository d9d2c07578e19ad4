//! Password hashing and session tokens for registered users.

mod password;
mod token;

pub use password::{PasswordError, hash_password, verify_password};
pub use token::{TOKEN_LEN, generate_token, hash_token};
