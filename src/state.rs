use crate::{
    repository::{SqliteCustomerRepository, SqliteFileRepository},
    services::{customer_service::CustomerService, storage_service::FileStorageService},
};
use sqlx::SqlitePool;
use std::{path::PathBuf, sync::Arc};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Pool kept for readiness checks.
    pub db: Arc<SqlitePool>,

    /// Payload root, probed by readiness checks.
    pub storage_dir: PathBuf,

    pub files: FileStorageService,
    pub customers: CustomerService,
}

impl AppState {
    /// Wire the SQLite repositories into both services.
    pub fn new(db: Arc<SqlitePool>, storage_dir: impl Into<PathBuf>, public_url: &str) -> Self {
        let storage_dir = storage_dir.into();
        let customer_repo = Arc::new(SqliteCustomerRepository::new(db.clone()));
        let file_repo = Arc::new(SqliteFileRepository::new(db.clone(), storage_dir.clone()));

        Self {
            files: FileStorageService::new(customer_repo.clone(), file_repo, public_url),
            customers: CustomerService::new(customer_repo),
            db,
            storage_dir,
        }
    }
}
