//! Inline image asset — probed on every send, optional on disk.

use rsvp_core::types::InlineAttachment;
use std::path::{Path, PathBuf};

/// Location and content id of the thank-you image.
#[derive(Debug, Clone)]
pub struct InlineImage {
    path: PathBuf,
    content_id: String,
}

impl InlineImage {
    pub fn new(path: impl Into<PathBuf>, content_id: &str) -> Self {
        Self {
            path: path.into(),
            content_id: content_id.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the asset if it is there. A missing or unreadable file is
    /// logged and yields `None`; the caller sends without it.
    pub fn probe(&self) -> Option<InlineAttachment> {
        match std::fs::read(&self.path) {
            Ok(bytes) => {
                tracing::debug!("🖼️ Image file found at {}", self.path.display());
                Some(InlineAttachment {
                    filename: self
                        .path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "image".into()),
                    content_id: self.content_id.clone(),
                    content_type: content_type_for(&self.path).to_string(),
                    bytes,
                })
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️ Image file not available at {} ({e}), sending email without image",
                    self.path.display()
                );
                None
            }
        }
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
