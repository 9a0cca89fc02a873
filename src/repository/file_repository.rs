//! SQLite metadata plus on-disk payloads for customer files.
//!
//! Payloads are written beneath `base_path/{shard}/{shard}/{storage_key}`.
//! A payload is always written to a temp file, fsynced and renamed into place
//! before any row points at it, so readers see a whole payload or nothing.

use super::{FileRepository, is_foreign_key_violation};
use crate::{
    models::file::{FileRecord, NewFile},
    services::storage_service::{StorageError, StorageResult},
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, warn};
use uuid::Uuid;

/// `FileRepository` backed by the `files` table and a payload directory.
#[derive(Clone)]
pub struct SqliteFileRepository {
    /// Shared SQLite connection pool used for metadata operations.
    db: Arc<SqlitePool>,

    /// Base directory on disk where payloads are stored.
    base_path: PathBuf,
}

/// A payload that has been renamed into its final location.
struct WrittenPayload {
    storage_key: Uuid,
    size_bytes: i64,
    etag: String,
}

impl SqliteFileRepository {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Two-level shard directories from MD5(storage_key), 00–ff each.
    fn payload_shards(storage_key: &Uuid) -> (String, String) {
        let digest = md5::compute(storage_key.as_bytes());
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn payload_path(&self, storage_key: &Uuid) -> PathBuf {
        let (shard_a, shard_b) = Self::payload_shards(storage_key);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(storage_key.to_string());
        path
    }

    /// Write `content` under a fresh storage key.
    ///
    /// Cleans up the temp file on any error.
    async fn write_payload(&self, content: &[u8]) -> StorageResult<WrittenPayload> {
        let storage_key = Uuid::new_v4();
        let file_path = self.payload_path(&storage_key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StorageError::Io(io::Error::new(
                ErrorKind::Other,
                "payload path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        if let Err(err) = write_in_shard(&parent, &tmp_path, content).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }

        Ok(WrittenPayload {
            storage_key,
            size_bytes: content.len() as i64,
            etag: format!("{:x}", md5::compute(content)),
        })
    }

    /// Best-effort payload removal once no row points at it any more.
    async fn remove_payload(&self, storage_key: &Uuid) {
        let file_path = self.payload_path(storage_key);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed payload {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("payload {} already missing", file_path.display());
            }
            Err(err) => {
                warn!("failed to remove payload {}: {}", file_path.display(), err);
                return;
            }
        }

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent, &self.base_path).await;
        }
    }

    /// Remove empty shard directories up to (not including) `stop`.
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl FileRepository for SqliteFileRepository {
    async fn insert(&self, new_file: NewFile) -> StorageResult<FileRecord> {
        let payload = self.write_payload(&new_file.content).await?;
        let now = Utc::now();

        let insert_result = sqlx::query_as::<_, FileRecord>(
            r#"
            INSERT INTO files (
                customer_id, name, content_type, size_bytes, etag,
                storage_key, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, customer_id, name, content_type, size_bytes, etag,
                      storage_key, created_at, updated_at
            "#,
        )
        .bind(new_file.customer_id)
        .bind(&new_file.name)
        .bind(&new_file.content_type)
        .bind(payload.size_bytes)
        .bind(&payload.etag)
        .bind(payload.storage_key)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await;

        match insert_result {
            Ok(record) => Ok(record),
            Err(err) => {
                self.remove_payload(&payload.storage_key).await;
                if is_foreign_key_violation(&err) {
                    Err(StorageError::OwnerNotFound(new_file.customer_id))
                } else {
                    Err(StorageError::Sqlx(err))
                }
            }
        }
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(
            "SELECT id, customer_id, name, content_type, size_bytes, etag,
                    storage_key, created_at, updated_at
             FROM files WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(record)
    }

    async fn load_content(&self, record: &FileRecord) -> StorageResult<Option<Bytes>> {
        let file_path = self.payload_path(&record.storage_key);
        match fs::read(&file_path).await {
            Ok(content) => Ok(Some(Bytes::from(content))),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(
                    "payload for file {} missing at {}",
                    record.id,
                    file_path.display()
                );
                Ok(None)
            }
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    async fn find_all(&self) -> StorageResult<Vec<FileRecord>> {
        let records = sqlx::query_as::<_, FileRecord>(
            "SELECT id, customer_id, name, content_type, size_bytes, etag,
                    storage_key, created_at, updated_at
             FROM files ORDER BY id ASC",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(records)
    }

    async fn update_name(&self, id: i64, name: &str) -> StorageResult<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(
            r#"
            UPDATE files SET name = ?, updated_at = ? WHERE id = ?
            RETURNING id, customer_id, name, content_type, size_bytes, etag,
                      storage_key, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(record)
    }

    async fn replace_content(
        &self,
        id: i64,
        content: Bytes,
        content_type: Option<String>,
    ) -> StorageResult<Option<FileRecord>> {
        let payload = self.write_payload(&content).await?;

        match swap_payload(&self.db, id, &payload, content_type).await {
            Ok(Some((record, old_key))) => {
                self.remove_payload(&old_key).await;
                Ok(Some(record))
            }
            Ok(None) => {
                self.remove_payload(&payload.storage_key).await;
                Ok(None)
            }
            Err(err) => {
                self.remove_payload(&payload.storage_key).await;
                Err(err)
            }
        }
    }

    async fn delete_by_id(&self, id: i64) -> StorageResult<bool> {
        let storage_key =
            sqlx::query_scalar::<_, Uuid>("DELETE FROM files WHERE id = ? RETURNING storage_key")
                .bind(id)
                .fetch_optional(&*self.db)
                .await?;

        match storage_key {
            Some(key) => {
                self.remove_payload(&key).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_all(&self) -> StorageResult<u64> {
        let storage_keys =
            sqlx::query_scalar::<_, Uuid>("DELETE FROM files RETURNING storage_key")
                .fetch_all(&*self.db)
                .await?;

        for key in &storage_keys {
            self.remove_payload(key).await;
        }
        Ok(storage_keys.len() as u64)
    }
}

/// Point file `id` at a freshly written payload in one transaction.
///
/// Returns the updated record and the storage key it used to point at.
async fn swap_payload(
    db: &SqlitePool,
    id: i64,
    payload: &WrittenPayload,
    content_type: Option<String>,
) -> StorageResult<Option<(FileRecord, Uuid)>> {
    // Takes the write lock up front. A deferred transaction that reads first
    // gets SQLITE_BUSY instead of waiting when another writer holds the lock.
    let mut tx = db.begin_with("BEGIN IMMEDIATE").await?;

    let old_key = sqlx::query_scalar::<_, Uuid>("SELECT storage_key FROM files WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    let Some(old_key) = old_key else {
        return Ok(None);
    };

    let record = sqlx::query_as::<_, FileRecord>(
        r#"
        UPDATE files SET
            content_type = COALESCE(?, content_type),
            size_bytes = ?,
            etag = ?,
            storage_key = ?,
            updated_at = ?
        WHERE id = ?
        RETURNING id, customer_id, name, content_type, size_bytes, etag,
                  storage_key, created_at, updated_at
        "#,
    )
    .bind(content_type)
    .bind(payload.size_bytes)
    .bind(&payload.etag)
    .bind(payload.storage_key)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some((record, old_key)))
}

/// Write `tmp_path`, recreating `parent` once if a concurrent delete pruned
/// the shard directory after it was created.
async fn write_in_shard(parent: &Path, tmp_path: &Path, content: &[u8]) -> io::Result<()> {
    match write_synced(tmp_path, content).await {
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("shard {} vanished, recreating", parent.display());
            fs::create_dir_all(parent).await?;
            write_synced(tmp_path, content).await
        }
        other => other,
    }
}

async fn write_synced(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(content).await?;
    file.flush().await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestContext;

    #[tokio::test]
    async fn insert_for_missing_owner_leaves_no_payload() {
        let ctx = TestContext::new().await;
        let repo = SqliteFileRepository::new(ctx.state.db.clone(), ctx.state.storage_dir.clone());

        let result = repo
            .insert(NewFile {
                customer_id: 77,
                name: "orphan.txt".into(),
                content_type: None,
                content: Bytes::from_static(b"nobody owns this"),
            })
            .await;

        assert!(matches!(result, Err(StorageError::OwnerNotFound(77))));
        assert_eq!(ctx.payload_count(), 0);
        assert!(repo.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pruned_shard_is_recreated_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("ab").join("cd");
        let tmp_path = parent.join(".tmp-payload");

        write_in_shard(&parent, &tmp_path, b"payload").await.unwrap();

        assert_eq!(std::fs::read(&tmp_path).unwrap(), b"payload");
    }
}
