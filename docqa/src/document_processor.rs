use crate::error::{DocQaError, Result};
use crate::models::Document;
use std::path::Path;
use uuid::Uuid;

/// File extensions accepted as documents, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: &[&str] = &["txt", "md"];

pub struct DocumentProcessor;

impl DocumentProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn is_allowed(&self, filename: &str) -> bool {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                ALLOWED_EXTENSIONS
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    /// Turns uploaded bytes into a document. The content is decoded as strict
    /// UTF-8 and otherwise left exactly as uploaded.
    pub fn process_upload(&self, filename: &str, bytes: Vec<u8>) -> Result<Document> {
        if !self.is_allowed(filename) {
            return Err(DocQaError::UnsupportedFileType(filename.to_string()));
        }

        let content = String::from_utf8(bytes)?;
        let document = Document {
            id: Uuid::new_v4().to_string(),
            filename: filename.to_string(),
            content,
        };

        log::info!(
            "Accepted document {} ({}, {} bytes)",
            document.id,
            document.filename,
            document.content.len()
        );
        Ok(document)
    }

    pub async fn process_file(&self, file_path: &Path) -> Result<Document> {
        let filename = file_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        if !self.is_allowed(&filename) {
            return Err(DocQaError::UnsupportedFileType(filename));
        }

        let bytes = tokio::fs::read(file_path).await?;
        self.process_upload(&filename, bytes)
    }
}

impl Default for DocumentProcessor {
    fn default() -> Self {
        Self::new()
    }
}
