//! Rejection reasons and infrastructure error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdmissionError>;

/// Why a file (or the folder it belongs to) was refused.
///
/// `Display` renders the default English message. UIs that localize should
/// template from [`RejectionReason::kind`] and the variant's fields instead.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    #[error("Empty filename not permitted")]
    EmptyName,

    #[error("Dangerous file type blocked: {extension}")]
    DangerousExtension { extension: String },

    #[error("File type not permitted: {extension}")]
    DisallowedExtension { extension: String },

    #[error("File too large: maximum is {max_mb}MB, file is {actual_mb:.2}MB")]
    OversizeFile { max_mb: u64, actual_mb: f64 },

    #[error("Empty file not permitted")]
    EmptyFile,

    #[error("MIME type not permitted: {mime_type}")]
    DisallowedMimeType { mime_type: String },

    #[error("Folder too large: maximum is {max_mb}MB, folder is {actual_mb:.2}MB")]
    FolderTooLarge { max_mb: u64, actual_mb: f64 },
}

impl RejectionReason {
    pub fn kind(&self) -> &'static str {
        match self {
            RejectionReason::EmptyName => "empty_name",
            RejectionReason::DangerousExtension { .. } => "dangerous_extension",
            RejectionReason::DisallowedExtension { .. } => "disallowed_extension",
            RejectionReason::OversizeFile { .. } => "oversize_file",
            RejectionReason::EmptyFile => "empty_file",
            RejectionReason::DisallowedMimeType { .. } => "disallowed_mime_type",
            RejectionReason::FolderTooLarge { .. } => "folder_too_large",
        }
    }
}

/// Failures outside the validation decision itself: loading configuration,
/// reading the filesystem on behalf of a caller, rendering reports.
#[derive(Error, Debug)]
pub enum AdmissionError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AdmissionError {
    fn from(err: serde_json::Error) -> Self {
        AdmissionError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for AdmissionError {
    fn from(err: toml::ser::Error) -> Self {
        AdmissionError::Serialization(err.to_string())
    }
}
