//! Fixtures shared by unit tests: a throwaway SQLite file and payload root.

use crate::{
    db,
    models::customer::Customer,
    services::{customer_service::CustomerService, storage_service::FileStorageService},
    state::AppState,
};
use std::{path::Path, sync::Arc};
use tempfile::TempDir;

pub struct TestContext {
    pub state: AppState,
    pub files: FileStorageService,
    pub customers: CustomerService,
    // Dropped last; removes the database and payloads.
    _dir: TempDir,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_public_url("").await
    }

    pub async fn with_public_url(public_url: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let database_url = format!("sqlite://{}", dir.path().join("meta/test.db").display());
        let pool = db::connect(&database_url).await.unwrap();
        db::run_migrations(&pool).await.unwrap();

        let state = AppState::new(Arc::new(pool), dir.path().join("files"), public_url);
        Self {
            files: state.files.clone(),
            customers: state.customers.clone(),
            state,
            _dir: dir,
        }
    }

    pub async fn customer(&self, name: &str) -> Customer {
        self.customers.create(name).await.unwrap()
    }

    /// Number of payload files on disk, temp files included.
    pub fn payload_count(&self) -> usize {
        count_files(&self.state.storage_dir)
    }
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() { count_files(&path) } else { 1 }
        })
        .sum()
}
