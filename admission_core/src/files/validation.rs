use lazy_static::lazy_static;
use tracing::{debug, trace};

use super::models::{FileDescriptor, ValidationResult};
use super::rules::{RuleSet, BYTES_PER_MB, GENERIC_MIME_TYPE};
use crate::error::RejectionReason;

lazy_static! {
    static ref DEFAULT_VALIDATOR: AdmissionValidator = AdmissionValidator::with_default_rules();
}

/// Classifies file descriptors as accepted or rejected.
///
/// Checks run in a fixed order and stop at the first failure:
/// name presence, extension (dangerous before allow-list), size, MIME type.
#[derive(Debug, Clone)]
pub struct AdmissionValidator {
    rules: RuleSet,
}

impl Default for AdmissionValidator {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

impl AdmissionValidator {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn with_default_rules() -> Self {
        Self::new(RuleSet::default())
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn check_extension(&self, name: &str) -> ValidationResult {
        let extension = extension_of(name);

        if self.rules.is_dangerous_extension(&extension) {
            return ValidationResult::Rejected(RejectionReason::DangerousExtension { extension });
        }

        if !extension.is_empty() && !self.rules.is_allowed_extension(&extension) {
            return ValidationResult::Rejected(RejectionReason::DisallowedExtension { extension });
        }

        ValidationResult::Accepted
    }

    pub fn check_size(&self, size: u64) -> ValidationResult {
        if size > self.rules.max_file_size_bytes {
            return ValidationResult::Rejected(RejectionReason::OversizeFile {
                max_mb: self.rules.max_file_size_mb(),
                actual_mb: size as f64 / BYTES_PER_MB as f64,
            });
        }

        if size == 0 {
            return ValidationResult::Rejected(RejectionReason::EmptyFile);
        }

        ValidationResult::Accepted
    }

    /// A missing, empty or generic MIME type says nothing about the file, so
    /// the decision falls to the extension check.
    ///
    /// Reported types are compared by essence and case-insensitively:
    /// surrounding whitespace and parameters are dropped, so
    /// `TEXT/Plain; charset=utf-8` matches `text/plain`. A whitespace-only
    /// value counts as empty. Rejections name the type as reported, trimmed.
    pub fn check_mime_type(&self, descriptor: &FileDescriptor) -> ValidationResult {
        let reported = match descriptor.reported_mime_type.as_deref().map(str::trim) {
            Some(reported) if !is_generic_mime_type(reported) => reported,
            _ => return self.check_extension(&descriptor.name),
        };

        if !self.rules.is_allowed_mime_type(&mime_essence(reported)) {
            return ValidationResult::Rejected(RejectionReason::DisallowedMimeType {
                mime_type: reported.to_string(),
            });
        }

        ValidationResult::Accepted
    }

    pub fn validate_file(&self, descriptor: &FileDescriptor) -> ValidationResult {
        let result = self.run_checks(descriptor);

        match &result {
            ValidationResult::Accepted => trace!(file = %descriptor.name, size = descriptor.size, "Upload admitted"),
            ValidationResult::Rejected(reason) => debug!(
                file = %descriptor.name,
                size = descriptor.size,
                kind = reason.kind(),
                reason = %reason,
                "Upload rejected"
            ),
        }

        result
    }

    fn run_checks(&self, descriptor: &FileDescriptor) -> ValidationResult {
        if descriptor.name.trim().is_empty() {
            return ValidationResult::Rejected(RejectionReason::EmptyName);
        }

        let extension = self.check_extension(&descriptor.name);
        if extension.is_rejected() {
            return extension;
        }

        let size = self.check_size(descriptor.size);
        if size.is_rejected() {
            return size;
        }

        self.check_mime_type(descriptor)
    }

    pub fn is_dangerous_file(&self, name: &str) -> bool {
        self.rules.is_dangerous_extension(&extension_of(name))
    }
}

/// Lower-cased substring from the last `.` to the end of `name`, or the empty
/// string when there is no `.` at all. A trailing dot yields `"."`.
/// Only the final segment counts: `archive.tar.gz` yields `.gz`.
pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(index) => name[index..].to_lowercase(),
        None => String::new(),
    }
}

fn is_generic_mime_type(mime_type: &str) -> bool {
    mime_type.is_empty() || mime_essence(mime_type) == GENERIC_MIME_TYPE
}

/// `type/subtype` without parameters, lower-cased. Unparseable values are
/// compared as given.
fn mime_essence(mime_type: &str) -> String {
    match mime_type.parse::<mime::Mime>() {
        Ok(parsed) => parsed.essence_str().to_ascii_lowercase(),
        Err(_) => mime_type.to_ascii_lowercase(),
    }
}

pub fn check_extension(name: &str) -> ValidationResult {
    DEFAULT_VALIDATOR.check_extension(name)
}

pub fn check_size(size: u64) -> ValidationResult {
    DEFAULT_VALIDATOR.check_size(size)
}

pub fn check_mime_type(descriptor: &FileDescriptor) -> ValidationResult {
    DEFAULT_VALIDATOR.check_mime_type(descriptor)
}

pub fn validate_file(descriptor: &FileDescriptor) -> ValidationResult {
    DEFAULT_VALIDATOR.validate_file(descriptor)
}

pub fn is_dangerous_file(name: &str) -> bool {
    DEFAULT_VALIDATOR.is_dangerous_file(name)
}
