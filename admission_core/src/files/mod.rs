pub mod batch;
pub mod models;
pub mod rules;
pub mod validation;

pub use batch::{validate_batch, BatchEntry, BatchReport, FolderBudget, SharedFolderBudget};
pub use models::{FileDescriptor, ValidationResult};
pub use rules::{RuleSet, RuleSetBuilder, GENERIC_MIME_TYPE, MAX_FILE_SIZE_BYTES, MAX_FOLDER_SIZE_BYTES};
pub use validation::{
    check_extension, check_mime_type, check_size, extension_of, is_dangerous_file, validate_file,
    AdmissionValidator,
};
