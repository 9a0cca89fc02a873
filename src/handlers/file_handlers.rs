//! HTTP handlers for customer files.
//! Request parsing and response headers live here; every decision about
//! owners, names and records is made by `FileStorageService`.

use crate::{
    errors::AppError,
    models::file::{FileRecord, ResponseFile},
    state::AppState,
};
use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Multipart, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::debug;

/// Body of `PUT /files/{id}`.
#[derive(Debug, Deserialize)]
pub struct RenameFileReq {
    pub name: String,
}

/// `POST /upload`: multipart with a `file` part and a `customerId` field.
///
/// Responds 201 with the stored record and a `Location` pointing at the
/// download URL.
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut upload: Option<(String, Option<String>, Bytes)> = None;
    let mut customer_id: Option<i64> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("invalid multipart body: {}", e)))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let content = field.bytes().await.map_err(|e| {
                    AppError::bad_request(format!("failed to read `file` part: {}", e))
                })?;
                upload = Some((file_name, content_type, content));
            }
            Some("customerId") => {
                let text = field.text().await.map_err(|e| {
                    AppError::bad_request(format!("failed to read `customerId`: {}", e))
                })?;
                let id = text.trim().parse::<i64>().map_err(|_| {
                    AppError::bad_request(format!("customerId `{}` is not a valid id", text))
                })?;
                customer_id = Some(id);
            }
            other => debug!("ignoring multipart field {:?}", other),
        }
    }

    let (file_name, content_type, content) =
        upload.ok_or_else(|| AppError::bad_request("missing `file` part"))?;
    let customer_id =
        customer_id.ok_or_else(|| AppError::bad_request("missing `customerId` field"))?;

    let stored = state
        .files
        .store(&file_name, content, content_type, customer_id)
        .await?;

    let mut response = (StatusCode::CREATED, Json(&stored.record)).into_response();
    if let Ok(location) = HeaderValue::from_str(&state.files.locator(stored.record.id)) {
        response.headers_mut().insert(header::LOCATION, location);
    }
    Ok(response)
}

/// `GET /files`: one `{name, url, size}` entry per stored file.
pub async fn list_files(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResponseFile>>, AppError> {
    let descriptors = state.files.list_descriptors().await?.collect();
    Ok(Json(descriptors))
}

/// `GET /files/{id}`: the raw content as an attachment.
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let file = state.files.retrieve(id).await?;

    let mut response = Response::new(Body::from(file.content));
    *response.status_mut() = StatusCode::OK;
    set_file_headers(response.headers_mut(), &file.record);
    Ok(response)
}

/// `PUT /files/{id}`: rename.
pub async fn rename_file(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<RenameFileReq>,
) -> Result<Json<FileRecord>, AppError> {
    let record = state.files.update_name(id, &payload.name).await?;
    Ok(Json(record))
}

/// `PUT /files/{id}/content`: replace the content with the raw request body.
/// The request `Content-Type`, if any, becomes the recorded type.
pub async fn replace_file_content(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<FileRecord>, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let record = state.files.update_content(id, body, content_type).await?;
    Ok(Json(record))
}

/// `DELETE /files/{id}`
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.files.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /files`
pub async fn delete_all_files(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state.files.delete_all().await?;
    Ok(StatusCode::NO_CONTENT)
}

fn set_file_headers(headers: &mut HeaderMap, record: &FileRecord) {
    let content_type = record
        .content_type
        .as_deref()
        .and_then(|v| HeaderValue::from_str(v).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, content_type);

    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from(record.size_bytes.max(0)),
    );

    if let Ok(value) = HeaderValue::from_str(&content_disposition(&record.name)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", record.etag)) {
        headers.insert(header::ETAG, value);
    }

    if let Ok(value) = HeaderValue::from_str(
        &record
            .updated_at
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string(),
    ) {
        headers.insert(header::LAST_MODIFIED, value);
    }
}

/// `attachment` disposition with an ASCII `filename` and, for non-ASCII
/// names, an RFC 5987 `filename*`.
fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    if name.is_ascii() {
        format!("attachment; filename=\"{}\"", fallback)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(name)
        )
    }
}
