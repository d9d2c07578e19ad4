//! `SeaORM` entities.

pub mod prelude;

pub mod accounts;
pub mod entries;
pub mod sea_orm_active_enums;
pub mod sessions;
pub mod tasks;
pub mod transfers;
pub mod users;
pub mod verify_emails;
