use gphotos_uploader::orchestrator::{FileOutcome, RunSummary};
use gphotos_uploader::types::FailureCategory;
use gphotos_uploader::utils::*;

#[test]
fn test_format_size() {
    assert_eq!(format_size(0), "0 B");
    assert_eq!(format_size(1023), "1023 B");
    assert_eq!(format_size(1536), "1.5 KiB");
    assert_eq!(format_size(10 * 1024 * 1024 * 1024), "10.0 GiB");
}

#[test]
fn test_summary_table_is_empty_for_idle_run() {
    assert!(summary_table(&RunSummary::default()).is_none());
}

#[test]
fn test_summary_table_lists_outcomes() {
    let mut summary = RunSummary::default();
    summary.record(FileOutcome::Uploaded);
    summary.record(FileOutcome::Uploaded);
    summary.record(FileOutcome::Failed(FailureCategory::UploadError));

    let table = summary_table(&summary).unwrap();

    assert!(table.contains("Uploaded"));
    assert!(table.contains("Failed: UploadError"));
    assert!(!table.contains("Skipped"));
}

#[test]
fn test_merged_summaries_add_up() {
    let mut first = RunSummary::default();
    first.record(FileOutcome::Uploaded);
    first.record(FileOutcome::Failed(FailureCategory::ExifErrors));

    let mut second = RunSummary::default();
    second.record(FileOutcome::Skipped);
    second.record(FileOutcome::Failed(FailureCategory::ExifErrors));

    first.merge(&second);

    assert_eq!(first.processed(), 4);
    assert_eq!(first.failed_in(FailureCategory::ExifErrors), 2);
}
