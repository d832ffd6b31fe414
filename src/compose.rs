//! Drafting and submitting a new discussion.
use crate::api::{ApiError, FileAttachment, NewDiscussion};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Largest local file accepted for upload.
pub const MAX_UPLOAD_SIZE: u64 = 10 * 1024 * 1024; // 10MB

#[derive(Debug, Error)]
pub enum UploadFileError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File is {0} bytes (max {MAX_UPLOAD_SIZE} bytes)")]
    TooLarge(u64),

    #[error("Not a regular file: {0}")]
    NotAFile(String),
}

/// Read a local file for upload, returning its file name and bytes.
pub fn read_upload(path: &Path) -> Result<(String, Vec<u8>), UploadFileError> {
    let display = path.display().to_string();
    let io_err = |source| UploadFileError::Io {
        path: display.clone(),
        source,
    };

    let meta = std::fs::metadata(path).map_err(io_err)?;
    if !meta.is_file() {
        return Err(UploadFileError::NotAFile(display.clone()));
    }
    if meta.len() > MAX_UPLOAD_SIZE {
        return Err(UploadFileError::TooLarge(meta.len()));
    }
    let bytes = std::fs::read(path).map_err(io_err)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok((name, bytes))
}

/// Draft of a discussion plus its upload and submission status.
///
/// The attachment is uploaded as soon as it is chosen; submitting only links
/// the already-uploaded file.
#[derive(Debug, Clone, Default)]
pub struct Composer {
    content: String,
    attachment: Option<FileAttachment>,
    uploading: bool,
    /// Raised by every upload start and by `cancel`, so a result for a
    /// discarded draft is dropped.
    upload_generation: u64,
    pending: bool,
    field_errors: BTreeMap<String, String>,
    error: Option<String>,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn attachment(&self) -> Option<&FileAttachment> {
        self.attachment.as_ref()
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.field_errors.get(field).map(String::as_str)
    }

    /// Last non-field failure (network, upload).
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    // ------------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------------

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.content_edited();
    }

    pub fn push(&mut self, c: char) {
        self.content.push(c);
        self.content_edited();
    }

    pub fn pop(&mut self) {
        self.content.pop();
        self.content_edited();
    }

    fn content_edited(&mut self) {
        self.field_errors.remove("content");
    }

    /// Discard the draft, the attachment and every error.
    pub fn cancel(&mut self) {
        self.content.clear();
        self.attachment = None;
        self.uploading = false;
        self.upload_generation = self.upload_generation.wrapping_add(1);
        self.field_errors.clear();
        self.error = None;
    }

    // ------------------------------------------------------------------------
    // Upload
    // ------------------------------------------------------------------------

    /// Start an upload, returning the generation its result must carry.
    /// `None` while an upload or submission is in flight.
    pub fn begin_upload(&mut self) -> Option<u64> {
        if self.uploading || self.pending {
            return None;
        }
        self.uploading = true;
        self.upload_generation = self.upload_generation.wrapping_add(1);
        self.error = None;
        Some(self.upload_generation)
    }

    /// Apply an upload result. Returns `false` if it belongs to a draft that
    /// was cancelled since.
    pub fn finish_upload(
        &mut self,
        generation: u64,
        result: Result<FileAttachment, ApiError>,
    ) -> bool {
        if generation != self.upload_generation {
            tracing::debug!(generation, current = self.upload_generation, "Discarding stale upload");
            return false;
        }
        self.uploading = false;
        match result {
            Ok(attachment) => {
                tracing::debug!(name = %attachment.name, "Attachment ready");
                self.attachment = Some(attachment);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Attachment upload failed");
                self.error = Some(e.to_string());
            }
        }
        true
    }

    // ------------------------------------------------------------------------
    // Submit
    // ------------------------------------------------------------------------

    /// Body to post, or `None` while a submission or upload is in flight.
    pub fn begin_submit(&mut self) -> Option<NewDiscussion> {
        if self.pending || self.uploading {
            return None;
        }
        self.pending = true;
        self.error = None;
        Some(NewDiscussion {
            content: self.content.clone(),
            attachment: self.attachment.clone(),
        })
    }

    /// Record the outcome of a submission. Returns `true` on success, in
    /// which case the draft has been cleared.
    pub fn finish_submit(&mut self, result: Result<(), ApiError>) -> bool {
        self.pending = false;
        match result {
            Ok(()) => {
                self.cancel();
                true
            }
            Err(e @ ApiError::Validation { .. }) => {
                self.field_errors = e.field_errors();
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discussion submission failed");
                self.error = Some(e.to_string());
                false
            }
        }
    }
}
