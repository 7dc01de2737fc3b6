//! Static admission rule tables

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const BYTES_PER_MB: u64 = 1024 * 1024;

pub const MAX_FILE_SIZE_BYTES: u64 = 50 * BYTES_PER_MB;

/// Ceiling for the summed size of a folder upload. Enforced by
/// [`FolderBudget`](super::FolderBudget), never by the single-file checks.
pub const MAX_FOLDER_SIZE_BYTES: u64 = 500 * BYTES_PER_MB;

/// Placeholder reported by environments that could not determine a type.
pub const GENERIC_MIME_TYPE: &str = "application/octet-stream";

lazy_static! {
    pub static ref DANGEROUS_EXTENSIONS: HashSet<&'static str> = [
        // Windows executables and installers
        ".exe", ".dll", ".com", ".bat", ".cmd", ".msi", ".msp", ".scr", ".pif", ".cpl",
        // Script hosts
        ".vbs", ".vbe", ".js", ".jse", ".wsf", ".wsh", ".hta", ".ps1", ".psm1",
        ".sh", ".bash", ".zsh", ".csh", ".ksh",
        // Packages and bundles
        ".jar", ".app", ".dmg", ".pkg", ".deb", ".rpm", ".apk",
        // Shared libraries
        ".so", ".dylib",
        // Shell-integration files
        ".lnk", ".reg", ".inf", ".scf",
    ]
    .into_iter()
    .collect();

    pub static ref ALLOWED_EXTENSIONS: HashSet<&'static str> = [
        "",
        ".txt", ".md", ".markdown", ".rtf", ".pdf", ".csv", ".tsv", ".json", ".xml",
        ".yaml", ".yml", ".toml", ".log",
        ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".odt", ".ods", ".odp",
        ".png", ".jpg", ".jpeg", ".gif", ".webp", ".bmp", ".svg", ".ico", ".tif", ".tiff", ".heic",
        ".mp3", ".wav", ".ogg", ".flac", ".m4a",
        ".mp4", ".mov", ".webm", ".avi", ".mkv",
        ".zip", ".tar", ".gz", ".tgz", ".7z", ".rar",
    ]
    .into_iter()
    .collect();

    pub static ref ALLOWED_MIME_TYPES: HashSet<&'static str> = [
        "text/plain",
        "text/markdown",
        "text/x-markdown",
        "text/csv",
        "text/tab-separated-values",
        "text/xml",
        "application/xml",
        "application/json",
        "application/yaml",
        "application/x-yaml",
        "text/yaml",
        "text/x-yaml",
        "application/toml",
        "text/x-toml",
        "application/rtf",
        "text/rtf",
        "application/pdf",
        "application/msword",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "application/vnd.ms-excel",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "application/vnd.ms-powerpoint",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "application/vnd.oasis.opendocument.text",
        "application/vnd.oasis.opendocument.spreadsheet",
        "application/vnd.oasis.opendocument.presentation",
        "image/png",
        "image/jpeg",
        "image/gif",
        "image/webp",
        "image/bmp",
        "image/svg+xml",
        "image/x-icon",
        "image/vnd.microsoft.icon",
        "image/tiff",
        "image/heic",
        "audio/mpeg",
        "audio/wav",
        "audio/x-wav",
        "audio/ogg",
        "audio/flac",
        "audio/x-flac",
        "audio/mp4",
        "audio/m4a",
        "audio/x-m4a",
        "video/mp4",
        "video/quicktime",
        "video/webm",
        "video/x-msvideo",
        "video/x-matroska",
        "application/zip",
        "application/x-tar",
        "application/gzip",
        "application/x-gzip",
        "application/x-compressed",
        "application/x-7z-compressed",
        "application/vnd.rar",
        "application/x-rar-compressed",
    ]
    .into_iter()
    .collect();
}

/// The tables and ceilings a validator decides against.
///
/// `RuleSet::default()` is the production rule set. Other rule sets exist for
/// tests and controlled deployments; build them through [`RuleSet::builder`]
/// or from [`AdmissionConfig`](crate::AdmissionConfig) so extensions get
/// normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub max_file_size_bytes: u64,
    pub max_folder_size_bytes: u64,
    pub dangerous_extensions: HashSet<String>,
    pub allowed_extensions: HashSet<String>,
    pub allowed_mime_types: HashSet<String>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            max_file_size_bytes: MAX_FILE_SIZE_BYTES,
            max_folder_size_bytes: MAX_FOLDER_SIZE_BYTES,
            dangerous_extensions: DANGEROUS_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            allowed_mime_types: ALLOWED_MIME_TYPES.iter().map(|mime| mime.to_string()).collect(),
        }
    }
}

impl RuleSet {
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder { rules: RuleSet::default() }
    }

    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size_bytes / BYTES_PER_MB
    }

    pub fn max_folder_size_mb(&self) -> u64 {
        self.max_folder_size_bytes / BYTES_PER_MB
    }

    pub fn is_dangerous_extension(&self, extension: &str) -> bool {
        self.dangerous_extensions.contains(extension)
    }

    pub fn is_allowed_extension(&self, extension: &str) -> bool {
        self.allowed_extensions.contains(extension)
    }

    pub fn is_allowed_mime_type(&self, mime_type: &str) -> bool {
        self.allowed_mime_types.contains(mime_type)
    }

    /// Extensions present in both tables. The dangerous table wins for these.
    pub fn overlapping_extensions(&self) -> Vec<String> {
        let mut overlap: Vec<String> = self
            .dangerous_extensions
            .intersection(&self.allowed_extensions)
            .cloned()
            .collect();
        overlap.sort();
        overlap
    }
}

/// Starts from the production rules and replaces whichever parts are set.
pub struct RuleSetBuilder {
    rules: RuleSet,
}

impl RuleSetBuilder {
    pub fn max_file_size_bytes(mut self, max: u64) -> Self {
        self.rules.max_file_size_bytes = max;
        self
    }

    pub fn max_folder_size_bytes(mut self, max: u64) -> Self {
        self.rules.max_folder_size_bytes = max;
        self
    }

    pub fn dangerous_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.rules.dangerous_extensions = extensions.into_iter().map(|e| normalize_extension(e.as_ref())).collect();
        self
    }

    pub fn allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.rules.allowed_extensions = extensions.into_iter().map(|e| normalize_extension(e.as_ref())).collect();
        self
    }

    pub fn allowed_mime_types<I, S>(mut self, mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.rules.allowed_mime_types = mime_types
            .into_iter()
            .map(|m| m.as_ref().trim().to_ascii_lowercase())
            .collect();
        self
    }

    pub fn build(self) -> RuleSet {
        self.rules
    }
}

/// Lower-cases and adds the leading dot, so `"EXE"`, `"exe"` and `".exe"`
/// all name the same table entry. The empty string stays empty: it is the
/// entry for extensionless files.
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim().to_lowercase();
    if trimmed.is_empty() || trimmed.starts_with('.') {
        trimmed
    } else {
        format!(".{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_ceilings() {
        assert_eq!(MAX_FILE_SIZE_BYTES, 52_428_800);
        assert_eq!(MAX_FOLDER_SIZE_BYTES, 524_288_000);

        let rules = RuleSet::default();
        assert_eq!(rules.max_file_size_mb(), 50);
        assert_eq!(rules.max_folder_size_mb(), 500);
    }

    #[test]
    fn test_production_tables_are_disjoint() {
        assert!(RuleSet::default().overlapping_extensions().is_empty());
    }

    #[test]
    fn test_tables_store_lowercase_dotted_extensions() {
        for ext in DANGEROUS_EXTENSIONS.iter().chain(ALLOWED_EXTENSIONS.iter()) {
            assert_eq!(*ext, normalize_extension(ext));
        }
        assert!(ALLOWED_EXTENSIONS.contains(""));
        assert!(!ALLOWED_MIME_TYPES.contains(GENERIC_MIME_TYPE));
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("EXE"), ".exe");
        assert_eq!(normalize_extension(".Pdf"), ".pdf");
        assert_eq!(normalize_extension(" md "), ".md");
        assert_eq!(normalize_extension(""), "");
    }

    #[test]
    fn test_builder_replaces_only_what_is_set() {
        let rules = RuleSet::builder()
            .max_file_size_bytes(10)
            .allowed_extensions(["txt", ".EXE", ""])
            .build();

        assert_eq!(rules.max_file_size_bytes, 10);
        assert_eq!(rules.max_folder_size_bytes, MAX_FOLDER_SIZE_BYTES);
        assert!(rules.is_allowed_extension(".txt"));
        assert!(rules.is_allowed_extension(""));
        assert!(!rules.is_allowed_extension(".pdf"));
        assert_eq!(rules.overlapping_extensions(), vec![".exe".to_string()]);
    }
}
