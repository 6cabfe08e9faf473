//! Long-running mode that keeps re-driving one failure category.
//!
//! Each cycle re-reads the failure log from disk, so records appended by
//! another process between cycles are picked up. Cancellation is honoured
//! between files and while sleeping between cycles.

use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{
    error::StoreError,
    orchestrator::{RetryOrchestrator, RunSummary},
    types::FailureCategory,
};

#[derive(Debug, Clone)]
pub struct ListenerLoop {
    category: FailureCategory,
    interval: Duration,
}

/// Totals over every completed cycle.
#[derive(Debug, Clone, Default)]
pub struct ListenerReport {
    pub cycles: usize,
    pub summary: RunSummary,
}

impl ListenerLoop {
    /// Watches `ExifErrors` by default.
    pub fn new(interval: Duration) -> Self {
        Self {
            category: FailureCategory::ExifErrors,
            interval,
        }
    }

    pub fn category(&self) -> FailureCategory {
        self.category
    }

    /// One pass over the watched category.
    pub async fn run_cycle(
        &self,
        orchestrator: &mut RetryOrchestrator<'_>,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, StoreError> {
        orchestrator.reload_failures().await?;
        orchestrator.retry_category(self.category, cancel).await?;
        Ok(orchestrator.take_summary())
    }

    /// Runs cycles until `cancel` fires. A store error ends the loop.
    pub async fn run(
        &self,
        orchestrator: &mut RetryOrchestrator<'_>,
        cancel: &CancellationToken,
    ) -> Result<ListenerReport, StoreError> {
        let mut report = ListenerReport::default();

        while !cancel.is_cancelled() {
            let summary = self.run_cycle(orchestrator, cancel).await?;
            report.cycles += 1;
            tracing::info!(
                cycle = report.cycles,
                category = %self.category,
                uploaded = summary.uploaded,
                failed = summary.failed_total(),
                missing = summary.missing,
                "listener cycle finished"
            );
            report.summary.merge(&summary);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.interval) => {}
            }
        }

        tracing::info!(cycles = report.cycles, "listener stopped");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::TempDir;

    use super::*;
    use crate::{
        exif::{ExifVerdict, MockExifInspector},
        management::{FAILED_UPLOADS_FILE, FailureStore, UPLOAD_STATE_FILE, UploadStateStore},
        photos::MockUploadClient,
        types::FailureRecord,
    };

    fn stores(dir: &TempDir) -> (UploadStateStore, FailureStore) {
        (
            UploadStateStore::new(dir.path().join(UPLOAD_STATE_FILE)),
            FailureStore::new(dir.path().join(FAILED_UPLOADS_FILE)),
        )
    }

    #[tokio::test]
    async fn cycle_picks_up_records_written_by_another_process() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("2019-03 Lisbon");
        std::fs::create_dir_all(&folder).unwrap();
        let photo = folder.join("a.jpg");
        std::fs::write(&photo, b"img").unwrap();

        let (mut state, mut failures) = stores(&dir);

        let mut external = FailureStore::new(dir.path().join(FAILED_UPLOADS_FILE));
        external.record_failure(
            FailureCategory::ExifErrors,
            FailureRecord::new(photo.clone(), "2019-03 Lisbon", "date mismatch"),
        );
        external.save().await.unwrap();

        let mut client = MockUploadClient::new();
        client
            .expect_upload()
            .times(1)
            .returning(|_| Ok("token-a".to_string()));
        client
            .expect_create_album_if_absent()
            .times(1)
            .returning(|_| Ok("album-1".to_string()));
        client
            .expect_add_to_album()
            .times(1)
            .returning(|_, _, _| Ok(()));
        let mut exif = MockExifInspector::new();
        exif.expect_reconcile()
            .times(1)
            .returning(|_, _| ExifVerdict::Consistent);

        let cancel = CancellationToken::new();
        let listener = ListenerLoop::new(Duration::ZERO);
        let summary = {
            let mut orch = RetryOrchestrator::new(&client, &mut state, &mut failures).with_exif(&exif);
            listener.run_cycle(&mut orch, &cancel).await.unwrap()
        };

        assert_eq!(summary.uploaded, 1);
        assert!(failures.is_empty());
        assert!(state.is_uploaded("2019-03 Lisbon", "a.jpg"));
    }

    #[tokio::test]
    async fn only_the_watched_category_is_retried() {
        let dir = TempDir::new().unwrap();
        let (mut state, mut failures) = stores(&dir);
        failures.record_failure(
            FailureCategory::UploadError,
            FailureRecord::new(dir.path().join("x/a.jpg"), "x", "timeout"),
        );
        failures.save().await.unwrap();

        let client = MockUploadClient::new();
        let cancel = CancellationToken::new();
        let listener = ListenerLoop::new(Duration::ZERO);
        let summary = {
            let mut orch = RetryOrchestrator::new(&client, &mut state, &mut failures);
            listener.run_cycle(&mut orch, &cancel).await.unwrap()
        };

        assert_eq!(summary.processed(), 0);
        assert_eq!(failures.count(FailureCategory::UploadError), 1);
    }

    #[tokio::test]
    async fn cancelled_before_start_runs_no_cycle() {
        let dir = TempDir::new().unwrap();
        let (mut state, mut failures) = stores(&dir);
        let client = MockUploadClient::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut orch = RetryOrchestrator::new(&client, &mut state, &mut failures);
        let report = ListenerLoop::new(Duration::from_secs(3600))
            .run(&mut orch, &cancel)
            .await
            .unwrap();

        assert_eq!(report.cycles, 0);
    }

    #[tokio::test]
    async fn cancel_interrupts_the_sleep_between_cycles() {
        let dir = TempDir::new().unwrap();
        let (mut state, mut failures) = stores(&dir);
        let client = MockUploadClient::new();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let mut orch = RetryOrchestrator::new(&client, &mut state, &mut failures);
        let report = tokio::time::timeout(
            Duration::from_secs(5),
            ListenerLoop::new(Duration::from_secs(3600)).run(&mut orch, &cancel),
        )
        .await
        .expect("listener did not stop")
        .unwrap();

        assert_eq!(report.cycles, 1);
    }

    #[tokio::test]
    async fn persistent_failure_stays_filed_under_watched_category() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("2019-03 Lisbon");
        std::fs::create_dir_all(&folder).unwrap();
        let photo = folder.join("a.jpg");
        std::fs::write(&photo, b"img").unwrap();

        let (mut state, mut failures) = stores(&dir);
        failures.record_failure(
            FailureCategory::ExifErrors,
            FailureRecord::new(photo.clone(), "2019-03 Lisbon", "date mismatch"),
        );
        failures.save().await.unwrap();

        let client = MockUploadClient::new();
        let mut exif = MockExifInspector::new();
        exif.expect_reconcile()
            .returning(|_, _| ExifVerdict::Unresolved("still wrong".to_string()));

        let cancel = CancellationToken::new();
        let listener = ListenerLoop::new(Duration::ZERO);
        let summary = {
            let mut orch = RetryOrchestrator::new(&client, &mut state, &mut failures).with_exif(&exif);
            listener.run_cycle(&mut orch, &cancel).await.unwrap()
        };

        assert_eq!(summary.failed_in(FailureCategory::ExifErrors), 1);
        assert_eq!(failures.category_of(&photo), Some(FailureCategory::ExifErrors));
    }

    // Uploaded file whose date is still wrong: nothing to upload, but the
    // record must survive until exiftool can fix it.
    #[tokio::test]
    async fn uploaded_file_keeps_its_exif_record_until_the_date_is_fixed() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("2019-03 Lisbon");
        std::fs::create_dir_all(&folder).unwrap();
        let photo = folder.join("a.jpg");
        std::fs::write(&photo, b"img").unwrap();

        let (mut state, mut failures) = stores(&dir);
        state.record_success("2019-03 Lisbon", "a.jpg", "album-1");
        state.save().await.unwrap();
        failures.record_failure(
            FailureCategory::ExifErrors,
            FailureRecord::new(photo.clone(), "2019-03 Lisbon", "date mismatch"),
        );
        failures.save().await.unwrap();

        let client = MockUploadClient::new();
        let mut exif = MockExifInspector::new();
        exif.expect_reconcile()
            .times(1)
            .returning(|_, _| ExifVerdict::Unresolved("still wrong".to_string()));

        let cancel = CancellationToken::new();
        let listener = ListenerLoop::new(Duration::ZERO);
        let summary = {
            let mut orch = RetryOrchestrator::new(&client, &mut state, &mut failures).with_exif(&exif);
            listener.run_cycle(&mut orch, &cancel).await.unwrap()
        };

        assert_eq!(summary.failed_in(FailureCategory::ExifErrors), 1);
        assert_eq!(summary.uploaded, 0);
        assert_eq!(failures.category_of(&photo), Some(FailureCategory::ExifErrors));

        let on_disk = FailureStore::load(dir.path().join(FAILED_UPLOADS_FILE))
            .await
            .unwrap();
        assert_eq!(on_disk.count(FailureCategory::ExifErrors), 1);
    }

    #[tokio::test]
    async fn uploaded_file_exif_record_is_cleared_once_the_date_is_fixed() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("2019-03 Lisbon");
        std::fs::create_dir_all(&folder).unwrap();
        let photo = folder.join("a.jpg");
        std::fs::write(&photo, b"img").unwrap();

        let (mut state, mut failures) = stores(&dir);
        state.record_success("2019-03 Lisbon", "a.jpg", "album-1");
        failures.record_failure(
            FailureCategory::ExifErrors,
            FailureRecord::new(photo.clone(), "2019-03 Lisbon", "date mismatch"),
        );
        failures.save().await.unwrap();

        // No upload or album calls are expected on the client.
        let client = MockUploadClient::new();
        let mut exif = MockExifInspector::new();
        let from = NaiveDate::from_ymd_opt(2021, 7, 4)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .unwrap();
        let to = NaiveDate::from_ymd_opt(2019, 3, 1)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .unwrap();
        exif.expect_reconcile()
            .times(1)
            .returning(move |_, _| ExifVerdict::Corrected { from, to });

        let cancel = CancellationToken::new();
        let listener = ListenerLoop::new(Duration::ZERO);
        let summary = {
            let mut orch = RetryOrchestrator::new(&client, &mut state, &mut failures).with_exif(&exif);
            listener.run_cycle(&mut orch, &cancel).await.unwrap()
        };

        assert_eq!(summary.exif_resolved, 1);
        assert_eq!(summary.uploaded, 0);
        assert!(failures.is_empty());

        let on_disk = FailureStore::load(dir.path().join(FAILED_UPLOADS_FILE))
            .await
            .unwrap();
        assert!(on_disk.is_empty());
    }
}
