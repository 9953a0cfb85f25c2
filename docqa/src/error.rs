//! Error types for document question answering.

use thiserror::Error;

use crate::document_processor::ALLOWED_EXTENSIONS;

/// Shown instead of any network activity when no API key is available.
pub const MISSING_KEY_NOTICE: &str = "Please add your Google Gemini API key to continue.";

#[derive(Error, Debug)]
pub enum DocQaError {
    #[error("no Gemini API key was provided")]
    MissingApiKey,

    /// The client could not be set up, usually because the key was rejected.
    #[error("{0}")]
    Configuration(String),

    /// The generation call failed before or during streaming.
    #[error("{0}")]
    Generation(String),

    #[error("unsupported file type {0:?}, expected one of: {allowed}", allowed = ALLOWED_EXTENSIONS.join(", "))]
    UnsupportedFileType(String),

    #[error("document is not valid UTF-8 text: {0}")]
    InvalidEncoding(#[from] std::string::FromUtf8Error),

    #[error("please ask a question about the document")]
    EmptyQuestion,

    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DocQaError>;

pub fn configuration_failure(error: &DocQaError) -> String {
    format!("Failed to configure Gemini API: {error}")
}

pub fn generation_failure(error: &DocQaError) -> String {
    format!("An error occurred while generating the response: {error}")
}
