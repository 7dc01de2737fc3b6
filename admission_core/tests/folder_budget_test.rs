use admission_core::{
    validate_batch, AdmissionValidator, FileDescriptor, RejectionReason, SharedFolderBudget, MAX_FOLDER_SIZE_BYTES,
};
use std::sync::Arc;
use std::thread;

const MB: u64 = 1024 * 1024;

#[test]
fn test_concurrent_admission_never_exceeds_ceiling() {
    let validator = Arc::new(AdmissionValidator::with_default_rules());
    let budget = SharedFolderBudget::new(100 * MB);

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let validator = validator.clone();
            let budget = budget.clone();
            thread::spawn(move || {
                let descriptor = FileDescriptor::new(format!("part-{}.bin.zip", i), 10 * MB);
                budget.admit(&descriptor, &validator).is_accepted()
            })
        })
        .collect();

    let accepted = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|accepted| *accepted)
        .count();

    assert_eq!(accepted, 10);
    assert_eq!(budget.total_bytes(), 100 * MB);
    assert_eq!(budget.remaining_bytes(), 0);
    assert_eq!(budget.snapshot().max_bytes(), 100 * MB);
}

#[test]
fn test_shared_budget_passes_through_single_file_rejections() {
    let validator = AdmissionValidator::with_default_rules();
    let budget = SharedFolderBudget::default();

    let result = budget.admit(&FileDescriptor::new("tool.exe", MB), &validator);
    assert_eq!(result.reason().map(RejectionReason::kind), Some("dangerous_extension"));
    assert_eq!(budget.total_bytes(), 0);
    assert_eq!(budget.remaining_bytes(), MAX_FOLDER_SIZE_BYTES);
}

#[test]
fn test_folder_of_large_files_hits_folder_ceiling() {
    let validator = AdmissionValidator::with_default_rules();
    let descriptors: Vec<FileDescriptor> = (0..12)
        .map(|i| FileDescriptor::new(format!("scan-{:02}.pdf", i), 45 * MB).with_mime_type("application/pdf"))
        .collect();

    let report = validate_batch(&descriptors, &validator, MAX_FOLDER_SIZE_BYTES);

    // 11 x 45MB = 495MB fits; the twelfth would make 540MB.
    assert_eq!(report.accepted, 11);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.accepted_bytes, 495 * MB);

    let (name, reason) = report.rejections().next().unwrap();
    assert_eq!(name, "scan-11.pdf");
    assert_eq!(reason.to_string(), "Folder too large: maximum is 500MB, folder is 540.00MB");
}

#[test]
fn test_empty_batch_is_all_accepted() {
    let validator = AdmissionValidator::with_default_rules();
    let report = validate_batch(std::iter::empty(), &validator, MAX_FOLDER_SIZE_BYTES);

    assert!(report.all_accepted());
    assert_eq!(report.accepted_bytes, 0);
    assert!(report.entries.is_empty());
}
