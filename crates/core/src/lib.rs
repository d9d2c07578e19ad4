//! Core business logic for Bankline.
//!
//! Pure domain rules with no database or web dependencies:
//! - `auth`: password hashing and session token digests
//! - `ledger`: transfer validation and lock ordering
//! - `task`: background task payloads, options, backoff, and scheduling

pub mod auth;
pub mod ledger;
pub mod task;
