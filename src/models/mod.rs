//! Data models for the customer file store.
//!
//! Rows map to the `customers` and `files` tables via `sqlx::FromRow` and
//! serialize as JSON via `serde`.

pub mod customer;
pub mod file;
