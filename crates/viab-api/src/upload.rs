//! Saving uploaded files under the per-user upload directory.

use std::path::{Component, Path, PathBuf};

use axum::body::Bytes;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;

/// Timestamp prefix of saved file names.
pub const UPLOAD_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A file part received in a multipart form, not yet written to disk.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Metadata about a saved upload, returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub original_name: String,
    pub saved_path: String,
    pub size_bytes: u64,
    pub content_type: Option<String>,
}

/// Reduce a client-supplied name to a single safe path component.
///
/// Directory parts are dropped and characters outside `[A-Za-z0-9._-]` are
/// replaced with `_`. Returns `fallback` when nothing usable is left.
pub fn sanitize_component(raw: &str, fallback: &str) -> String {
    let last = Path::new(raw)
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .last()
        .unwrap_or("");
    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

/// Write `file` to `<upload_dir>/<user_id>/<timestamp>_<name>`.
///
/// The user directory is created if missing. Any filesystem failure is an
/// `ApiError::Internal`.
pub async fn save_upload(
    upload_dir: &Path,
    user_id: &str,
    file: &UploadedFile,
) -> Result<(PathBuf, FileInfo), ApiError> {
    let user_dir = upload_dir.join(sanitize_component(user_id, "default_user"));
    tokio::fs::create_dir_all(&user_dir).await.map_err(|e| {
        ApiError::Internal(format!(
            "Failed to create upload directory {}: {}",
            user_dir.display(),
            e
        ))
    })?;

    let name = sanitize_component(&file.file_name, "upload");
    let timestamp = Local::now().format(UPLOAD_TIMESTAMP_FORMAT);
    let path = user_dir.join(format!("{}_{}", timestamp, name));

    tokio::fs::write(&path, &file.data).await.map_err(|e| {
        ApiError::Internal(format!("Failed to save upload {}: {}", path.display(), e))
    })?;

    info!(
        user_id,
        path = %path.display(),
        size_bytes = file.data.len(),
        "Saved upload"
    );

    let info = FileInfo {
        original_name: file.file_name.clone(),
        saved_path: path.display().to_string(),
        size_bytes: file.data.len() as u64,
        content_type: file.content_type.clone(),
    };
    Ok((path, info))
}
