//! Upload admission control: decides from file metadata alone whether a
//! candidate file may enter an upload pipeline.

pub mod config;
pub mod error;
pub mod files;

pub use self::config::AdmissionConfig;
pub use error::{AdmissionError, RejectionReason, Result};
pub use files::{
    check_extension, check_mime_type, check_size, extension_of, is_dangerous_file, validate_batch,
    validate_file, AdmissionValidator, BatchEntry, BatchReport, FileDescriptor, FolderBudget,
    RuleSet, SharedFolderBudget, ValidationResult, GENERIC_MIME_TYPE, MAX_FILE_SIZE_BYTES,
    MAX_FOLDER_SIZE_BYTES,
};
