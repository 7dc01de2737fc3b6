//! Folder-level aggregation on top of the single-file checks

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::models::{FileDescriptor, ValidationResult};
use super::rules::{BYTES_PER_MB, MAX_FOLDER_SIZE_BYTES};
use super::validation::AdmissionValidator;
use crate::error::{RejectionReason, Result};

/// Running total of accepted bytes for one folder upload.
///
/// Only files that pass every single-file check are counted; a file that
/// would push the total past the ceiling is rejected and not counted either.
#[derive(Debug, Clone)]
pub struct FolderBudget {
    max_bytes: u64,
    total_bytes: u64,
}

impl Default for FolderBudget {
    fn default() -> Self {
        Self::new(MAX_FOLDER_SIZE_BYTES)
    }
}

impl FolderBudget {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes, total_bytes: 0 }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn remaining_bytes(&self) -> u64 {
        self.max_bytes.saturating_sub(self.total_bytes)
    }

    pub fn admit(&mut self, descriptor: &FileDescriptor, validator: &AdmissionValidator) -> ValidationResult {
        match validator.validate_file(descriptor) {
            ValidationResult::Accepted => self.reserve(descriptor.size).into(),
            rejected => rejected,
        }
    }

    fn reserve(&mut self, size: u64) -> std::result::Result<(), RejectionReason> {
        let projected = self.total_bytes.saturating_add(size);
        if projected > self.max_bytes {
            debug!(max_bytes = self.max_bytes, projected, "Folder budget exceeded");
            return Err(RejectionReason::FolderTooLarge {
                max_mb: self.max_bytes / BYTES_PER_MB,
                actual_mb: projected as f64 / BYTES_PER_MB as f64,
            });
        }

        self.total_bytes = projected;
        Ok(())
    }
}

/// A [`FolderBudget`] that several threads or tasks can admit into.
/// The compare-and-add happens under one lock, so the ceiling holds under
/// concurrent use.
#[derive(Debug, Clone, Default)]
pub struct SharedFolderBudget {
    inner: Arc<Mutex<FolderBudget>>,
}

impl SharedFolderBudget {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FolderBudget::new(max_bytes))),
        }
    }

    pub fn admit(&self, descriptor: &FileDescriptor, validator: &AdmissionValidator) -> ValidationResult {
        match validator.validate_file(descriptor) {
            ValidationResult::Accepted => self.inner.lock().reserve(descriptor.size).into(),
            rejected => rejected,
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.inner.lock().total_bytes()
    }

    pub fn remaining_bytes(&self) -> u64 {
        self.inner.lock().remaining_bytes()
    }

    pub fn snapshot(&self) -> FolderBudget {
        self.inner.lock().clone()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub name: String,
    pub size: u64,
    pub result: ValidationResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
    pub accepted: usize,
    pub rejected: usize,
    pub accepted_bytes: u64,
    pub max_folder_bytes: u64,
}

impl BatchReport {
    pub fn all_accepted(&self) -> bool {
        self.rejected == 0
    }

    pub fn rejections(&self) -> impl Iterator<Item = (&str, &RejectionReason)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.result.reason().map(|reason| (entry.name.as_str(), reason)))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Validates descriptors in order against one folder budget.
pub fn validate_batch<'a, I>(descriptors: I, validator: &AdmissionValidator, max_folder_bytes: u64) -> BatchReport
where
    I: IntoIterator<Item = &'a FileDescriptor>,
{
    let mut budget = FolderBudget::new(max_folder_bytes);
    let mut entries = Vec::new();
    let mut accepted = 0;
    let mut rejected = 0;

    for descriptor in descriptors {
        let result = budget.admit(descriptor, validator);
        if result.is_accepted() {
            accepted += 1;
        } else {
            rejected += 1;
        }

        entries.push(BatchEntry {
            name: descriptor.name.clone(),
            size: descriptor.size,
            result,
        });
    }

    BatchReport {
        entries,
        accepted,
        rejected,
        accepted_bytes: budget.total_bytes(),
        max_folder_bytes,
    }
}
