//! Attachment loading for image inputs.

use std::path::Path;

use crate::error::AgentError;
use crate::llm::ImagePart;

/// MIME type inferred from a file extension.
///
/// Unknown extensions map to `application/octet-stream`.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Read an image file into an inline part.
pub async fn load_image(path: &Path) -> Result<ImagePart, AgentError> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|source| AgentError::Attachment {
            path: path.display().to_string(),
            source,
        })?;
    Ok(ImagePart {
        mime_type: mime_for_path(path).to_string(),
        data,
    })
}
