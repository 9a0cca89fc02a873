//! Client-supplied file name normalization.
//!
//! Every name that ends up on a file record passes through
//! [`sanitize_file_name`], both on upload and on rename.

use super::storage_service::{StorageError, StorageResult};

const MAX_FILE_NAME_LEN: usize = 255;

/// Reduce a client-supplied name to a plain file name.
///
/// - surrounding whitespace is trimmed
/// - absolute forms (`/x`, `\x`, `C:x`) are rejected
/// - any `..` segment is rejected
/// - empty and `.` segments are dropped, then only the last segment is kept
/// - NUL and other control characters are rejected
///
/// Non-ASCII names pass through unchanged.
pub fn sanitize_file_name(raw: &str) -> StorageResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid(raw, "must not be empty"));
    }

    if trimmed.chars().any(char::is_control) {
        return Err(invalid(raw, "must not contain control characters"));
    }

    if trimmed.starts_with('/') || trimmed.starts_with('\\') || has_drive_prefix(trimmed) {
        return Err(invalid(raw, "must not be an absolute path"));
    }

    let segments: Vec<&str> = trimmed
        .split(['/', '\\'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();

    if segments.iter().any(|segment| *segment == "..") {
        return Err(invalid(raw, "must not contain `..` segments"));
    }

    let name = match segments.last() {
        Some(last) => last.to_string(),
        None => return Err(invalid(raw, "no file name left after removing directories")),
    };

    if name.len() > MAX_FILE_NAME_LEN {
        return Err(invalid(raw, "must be at most 255 bytes"));
    }

    Ok(name)
}

/// Any single letter followed by `:` counts, so `a:b.txt` is refused too.
fn has_drive_prefix(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    )
}

fn invalid(raw: &str, reason: &str) -> StorageError {
    StorageError::InvalidName {
        name: raw.to_string(),
        reason: reason.to_string(),
    }
}
