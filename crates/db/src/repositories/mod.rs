//! Repository abstractions for data access.
//!
//! Every query is a method on [`Queries`], split by table. The same methods
//! run on the pool or inside a transaction.

pub mod account;
pub mod entry;
pub mod queries;
pub mod session;
pub mod task;
pub mod transfer;
pub mod user;
pub mod verify_email;

pub use account::{CreateAccountParams, ListAccountsParams};
pub use entry::CreateEntryParams;
pub use queries::{Page, Queries};
pub use session::CreateSessionParams;
pub use task::NewTask;
pub use transfer::{CreateTransferParams, ListTransfersParams};
pub use user::{CreateUserParams, UpdateUserParams};
pub use verify_email::{CreateVerifyEmailParams, VERIFY_EMAIL_TTL_MINUTES};
