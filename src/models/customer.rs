//! Represents a customer, the owner of stored files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered customer.
///
/// The identifier is assigned by the database on insert and never changes.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct Customer {
    pub id: i64,

    /// Display name, trimmed and non-empty.
    pub name: String,

    pub created_at: DateTime<Utc>,
}
