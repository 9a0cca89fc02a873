//! src/services/storage_service.rs
//!
//! FileStorageService: upload, download, listing and deletion of customer
//! files. It is the only code that reads or mutates file records; it checks
//! owner existence and sanitizes names before anything is persisted.
//!
//! Ownership policy: a file's owner is fixed at upload. Deleting files never
//! touches customers, and a customer cannot be deleted while it still owns
//! files (enforced by the `files.customer_id` foreign key, `ON DELETE RESTRICT`).

use super::sanitize::sanitize_file_name;
use crate::{
    models::file::{FileRecord, NewFile, ResponseFile, StoredFile},
    repository::{CustomerRepository, FileRepository},
};
use bytes::Bytes;
use std::{io, sync::Arc, vec};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("owner customer `{0}` does not exist")]
    OwnerNotFound(i64),
    #[error("customer `{0}` not found")]
    CustomerNotFound(i64),
    #[error("file `{0}` not found")]
    FileNotFound(i64),
    #[error("file name `{name}` invalid: {reason}")]
    InvalidName { name: String, reason: String },
    #[error("customer name invalid: {0}")]
    InvalidCustomerName(String),
    #[error("customer `{0}` still owns files")]
    CustomerHasFiles(i64),
    #[error("customers still own files")]
    CustomersHaveFiles,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Clone)]
pub struct FileStorageService {
    customers: Arc<dyn CustomerRepository>,
    files: Arc<dyn FileRepository>,

    /// Prefix for download locators, without a trailing slash. Empty gives
    /// relative locators such as `/files/7`.
    public_url: String,
}

impl FileStorageService {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        files: Arc<dyn FileRepository>,
        public_url: impl Into<String>,
    ) -> Self {
        let public_url = public_url.into().trim_end_matches('/').to_string();
        Self {
            customers,
            files,
            public_url,
        }
    }

    /// Store a new file for `owner_id`.
    ///
    /// The owner is looked up first, so an unknown owner is reported as
    /// `OwnerNotFound` whatever the name. Nothing is written on failure.
    pub async fn store(
        &self,
        raw_name: &str,
        content: Bytes,
        content_type: Option<String>,
        owner_id: i64,
    ) -> StorageResult<StoredFile> {
        if self.customers.find_by_id(owner_id).await?.is_none() {
            return Err(StorageError::OwnerNotFound(owner_id));
        }
        let name = sanitize_file_name(raw_name)?;

        let record = self
            .files
            .insert(NewFile {
                customer_id: owner_id,
                name,
                content_type,
                content: content.clone(),
            })
            .await?;

        info!(
            "stored file {} ({} bytes) for customer {}",
            record.id, record.size_bytes, owner_id
        );
        Ok(StoredFile { record, content })
    }

    /// Fetch a file with its whole content.
    pub async fn retrieve(&self, id: i64) -> StorageResult<StoredFile> {
        // A concurrent delete or content replacement can remove the payload
        // between the two reads; the record is re-read once before giving up.
        for _ in 0..2 {
            let record = self
                .files
                .find_by_id(id)
                .await?
                .ok_or(StorageError::FileNotFound(id))?;

            if let Some(content) = self.files.load_content(&record).await? {
                return Ok(StoredFile { record, content });
            }
        }
        Err(StorageError::FileNotFound(id))
    }

    /// One download descriptor per stored file, computed from the records
    /// as they are now. Call again for a fresh view.
    pub async fn list_descriptors(&self) -> StorageResult<Descriptors> {
        let records = self.files.find_all().await?;
        debug!("listing {} files", records.len());
        Ok(Descriptors {
            records: records.into_iter(),
            public_url: self.public_url.clone(),
        })
    }

    /// Download locator for file `id`.
    pub fn locator(&self, id: i64) -> String {
        locator(&self.public_url, id)
    }

    /// Rename a file. Content and owner are left alone.
    pub async fn update_name(&self, id: i64, new_name: &str) -> StorageResult<FileRecord> {
        let name = sanitize_file_name(new_name)?;
        self.files
            .update_name(id, &name)
            .await?
            .ok_or(StorageError::FileNotFound(id))
    }

    /// Replace a file's content. Name and owner are left alone.
    pub async fn update_content(
        &self,
        id: i64,
        content: Bytes,
        content_type: Option<String>,
    ) -> StorageResult<FileRecord> {
        let record = self
            .files
            .replace_content(id, content, content_type)
            .await?
            .ok_or(StorageError::FileNotFound(id))?;
        debug!("replaced content of file {} ({} bytes)", id, record.size_bytes);
        Ok(record)
    }

    /// Delete one file. A missing id is `FileNotFound`.
    pub async fn delete(&self, id: i64) -> StorageResult<()> {
        if !self.files.delete_by_id(id).await? {
            return Err(StorageError::FileNotFound(id));
        }
        info!("deleted file {}", id);
        Ok(())
    }

    /// Delete every file. Returns how many were removed; zero is not an error.
    pub async fn delete_all(&self) -> StorageResult<u64> {
        let removed = self.files.delete_all().await?;
        info!("deleted all files ({} removed)", removed);
        Ok(removed)
    }
}

/// Lazily turns file records into download descriptors.
pub struct Descriptors {
    records: vec::IntoIter<FileRecord>,
    public_url: String,
}

impl Iterator for Descriptors {
    type Item = ResponseFile;

    fn next(&mut self) -> Option<ResponseFile> {
        let record = self.records.next()?;
        Some(ResponseFile {
            url: locator(&self.public_url, record.id),
            size: record.size_bytes.max(0) as u64,
            name: record.name,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

fn locator(public_url: &str, id: i64) -> String {
    format!("{}/files/{}", public_url, id)
}
