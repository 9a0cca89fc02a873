//! Persistence contracts consumed by the services.
//!
//! Services only ever see these traits; the SQLite implementations are wired
//! in once at startup (see `state::AppState::new`).

pub mod customer_repository;
pub mod file_repository;

use crate::{
    models::{
        customer::Customer,
        file::{FileRecord, NewFile},
    },
    services::storage_service::StorageResult,
};
use async_trait::async_trait;
use bytes::Bytes;

pub use customer_repository::SqliteCustomerRepository;
pub use file_repository::SqliteFileRepository;

/// Directory of customers that own files.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Customer>>;

    async fn find_all(&self) -> StorageResult<Vec<Customer>>;

    async fn insert(&self, name: &str) -> StorageResult<Customer>;

    /// Returns `None` when no customer has this id.
    async fn update_name(&self, id: i64, name: &str) -> StorageResult<Option<Customer>>;

    /// Returns whether a row was removed. Fails with `CustomerHasFiles` while
    /// any file still references the customer.
    async fn delete_by_id(&self, id: i64) -> StorageResult<bool>;

    /// Fails with `CustomersHaveFiles`, removing nothing, while any file exists.
    async fn delete_all(&self) -> StorageResult<u64>;
}

/// Durable store of file records and their payloads.
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Persist payload and record. Fails with `OwnerNotFound` if the owner
    /// row is gone by the time the record is inserted.
    async fn insert(&self, new_file: NewFile) -> StorageResult<FileRecord>;

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<FileRecord>>;

    /// Read the whole payload. `None` when it was removed concurrently.
    async fn load_content(&self, record: &FileRecord) -> StorageResult<Option<Bytes>>;

    async fn find_all(&self) -> StorageResult<Vec<FileRecord>>;

    async fn update_name(&self, id: i64, name: &str) -> StorageResult<Option<FileRecord>>;

    /// Swap the payload. A `None` content type keeps the recorded one.
    async fn replace_content(
        &self,
        id: i64,
        content: Bytes,
        content_type: Option<String>,
    ) -> StorageResult<Option<FileRecord>>;

    async fn delete_by_id(&self, id: i64) -> StorageResult<bool>;

    async fn delete_all(&self) -> StorageResult<u64>;
}

/// Return true if SQLx error indicates a foreign key constraint violation.
fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("foreign key")
    )
}
