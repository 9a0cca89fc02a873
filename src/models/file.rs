//! Represents a file (blob) owned by a customer.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata row for a stored file.
///
/// The payload itself lives on disk under `storage_key`; `size_bytes` and
/// `etag` always describe the payload the key points at.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct FileRecord {
    /// Identifier assigned on upload.
    pub id: i64,

    /// Owning customer. Fixed at upload time.
    pub customer_id: i64,

    /// Sanitized display name. Not unique, even within one customer.
    pub name: String,

    /// Content type recorded at upload, if the client sent one.
    pub content_type: Option<String>,

    /// Payload length in bytes.
    pub size_bytes: i64,

    /// Hex MD5 of the payload.
    pub etag: String,

    /// Name of the payload on disk. Internal only.
    #[serde(skip)]
    pub storage_key: Uuid,

    pub created_at: DateTime<Utc>,

    /// Last time the name or the content changed.
    pub updated_at: DateTime<Utc>,
}

/// Input for inserting a new file row and payload.
#[derive(Clone, Debug)]
pub struct NewFile {
    pub customer_id: i64,
    pub name: String,
    pub content_type: Option<String>,
    pub content: Bytes,
}

/// A file together with its full content.
#[derive(Clone, Debug)]
pub struct StoredFile {
    pub record: FileRecord,
    pub content: Bytes,
}

/// Download descriptor returned by the listing endpoint.
///
/// Computed on every request from the current records, never persisted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ResponseFile {
    pub name: String,
    pub url: String,
    pub size: u64,
}
