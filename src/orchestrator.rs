//! Per-file upload state machine.
//!
//! For every candidate file the orchestrator evaluates, in order:
//!
//! 1. **Skip** when the state store already lists the file for its album.
//! 2. **TooLarge** / 3. **UnsupportedFormat** rejections from the catalog rules.
//! 4. EXIF verification when an [`ExifInspector`] is attached; an unresolved
//!    mismatch is filed as `ExifErrors` and nothing is uploaded.
//! 5. **Upload**, filed as `UploadError` on failure.
//! 6. **Add to album**, creating the album on first use, filed as
//!    `AddToAlbumError` on failure. On success the file is recorded in the
//!    state store and its failure record is dropped.
//!
//! Files are processed strictly one after another, and every store mutation
//! is saved before the next file starts.

use std::{collections::BTreeMap, mem, path::Path};

use indicatif::ProgressBar;
use tokio_util::sync::CancellationToken;

use crate::{
    catalog,
    error::{ClientError, StoreError},
    exif::{ExifInspector, ExifVerdict},
    management::{FailureStore, UploadStateStore},
    photos::UploadClient,
    types::{AlbumUnit, FailureCategory, FailureRecord, MediaFile, SummaryTableRow},
};

/// What happened to a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Skipped,
    Uploaded,
    Failed(FailureCategory),
    /// The file recorded in a failure entry no longer exists.
    Missing,
    /// An already uploaded file whose pending EXIF record was settled.
    ExifResolved,
    WouldUpload,
    WouldFail(FailureCategory),
}

/// Outcome counters for one run (or one listener cycle).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub uploaded: usize,
    pub skipped: usize,
    pub missing: usize,
    pub exif_resolved: usize,
    pub would_upload: usize,
    pub failed: BTreeMap<FailureCategory, usize>,
    pub would_fail: BTreeMap<FailureCategory, usize>,
    pub albums_created: usize,
    pub album_errors: usize,
    pub albums_pending: usize,
    /// Stale failure records dropped because the file was already uploaded.
    pub cleared: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Skipped => self.skipped += 1,
            FileOutcome::Uploaded => self.uploaded += 1,
            FileOutcome::Missing => self.missing += 1,
            FileOutcome::ExifResolved => self.exif_resolved += 1,
            FileOutcome::WouldUpload => self.would_upload += 1,
            FileOutcome::Failed(category) => *self.failed.entry(category).or_default() += 1,
            FileOutcome::WouldFail(category) => {
                *self.would_fail.entry(category).or_default() += 1
            }
        }
    }

    pub fn merge(&mut self, other: &RunSummary) {
        self.uploaded += other.uploaded;
        self.skipped += other.skipped;
        self.missing += other.missing;
        self.exif_resolved += other.exif_resolved;
        self.would_upload += other.would_upload;
        self.albums_created += other.albums_created;
        self.album_errors += other.album_errors;
        self.albums_pending += other.albums_pending;
        self.cleared += other.cleared;
        for (category, count) in &other.failed {
            *self.failed.entry(*category).or_default() += count;
        }
        for (category, count) in &other.would_fail {
            *self.would_fail.entry(*category).or_default() += count;
        }
    }

    pub fn failed_total(&self) -> usize {
        self.failed.values().sum()
    }

    pub fn failed_in(&self, category: FailureCategory) -> usize {
        self.failed.get(&category).copied().unwrap_or(0)
    }

    /// Number of files that went through the state machine.
    pub fn processed(&self) -> usize {
        self.uploaded
            + self.skipped
            + self.missing
            + self.exif_resolved
            + self.would_upload
            + self.failed_total()
            + self.would_fail.values().sum::<usize>()
    }

    /// Non-zero counters as table rows, in a fixed order.
    pub fn rows(&self) -> Vec<SummaryTableRow> {
        let mut rows = vec![
            ("Uploaded".to_string(), self.uploaded),
            ("Skipped (already uploaded)".to_string(), self.skipped),
            ("Would upload".to_string(), self.would_upload),
            ("Missing on disk".to_string(), self.missing),
            ("EXIF resolved".to_string(), self.exif_resolved),
            ("Albums created".to_string(), self.albums_created),
            ("Albums to create".to_string(), self.albums_pending),
            ("Album errors".to_string(), self.album_errors),
            ("Stale failures cleared".to_string(), self.cleared),
        ];
        for category in FailureCategory::ALL {
            rows.push((format!("Failed: {}", category), self.failed_in(category)));
            rows.push((
                format!("Would fail: {}", category),
                self.would_fail.get(&category).copied().unwrap_or(0),
            ));
        }

        rows.into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(outcome, count)| SummaryTableRow { outcome, count })
            .collect()
    }
}

/// Drives files through the upload state machine against two owned stores.
pub struct RetryOrchestrator<'a> {
    client: &'a dyn UploadClient,
    exif: Option<&'a dyn ExifInspector>,
    state: &'a mut UploadStateStore,
    failures: &'a mut FailureStore,
    dry_run: bool,
    progress: ProgressBar,
    summary: RunSummary,
}

impl<'a> RetryOrchestrator<'a> {
    pub fn new(
        client: &'a dyn UploadClient,
        state: &'a mut UploadStateStore,
        failures: &'a mut FailureStore,
    ) -> Self {
        Self {
            client,
            exif: None,
            state,
            failures,
            dry_run: false,
            progress: ProgressBar::hidden(),
            summary: RunSummary::default(),
        }
    }

    /// Enables EXIF date correction before each upload.
    pub fn with_exif(mut self, exif: &'a dyn ExifInspector) -> Self {
        self.exif = Some(exif);
        self
    }

    /// In a dry run the client is never called and neither store is touched.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Returns the counters collected so far and starts a fresh set.
    pub fn take_summary(&mut self) -> RunSummary {
        mem::take(&mut self.summary)
    }

    pub fn into_summary(self) -> RunSummary {
        self.summary
    }

    pub fn failures(&self) -> &FailureStore {
        &*self.failures
    }

    /// Drops failure records for files that are already uploaded, which can
    /// only be left behind by an interruption between the two saves of a
    /// success. `ExifErrors` records stay until their EXIF check passes.
    pub async fn reconcile(&mut self) -> Result<usize, StoreError> {
        if self.dry_run {
            return Ok(0);
        }
        let removed = self.failures.reconcile(&*self.state);
        if removed > 0 {
            tracing::info!(removed, "dropped failure records of uploaded files");
            self.failures.save().await?;
            self.summary.cleared += removed;
        }
        Ok(removed)
    }

    /// Re-reads the failure log from disk, then reconciles it.
    pub async fn reload_failures(&mut self) -> Result<(), StoreError> {
        self.failures.reload().await?;
        self.reconcile().await.map(|_| ())
    }

    /// Processes every album of a scan. Returns `false` when the run was
    /// cancelled before all files were handled.
    pub async fn run_catalog(
        &mut self,
        albums: &[AlbumUnit],
        cancel: &CancellationToken,
    ) -> Result<bool, StoreError> {
        for album in albums {
            if !self.process_album(album, cancel).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub async fn process_album(
        &mut self,
        album: &AlbumUnit,
        cancel: &CancellationToken,
    ) -> Result<bool, StoreError> {
        let mut files: Vec<&MediaFile> = album
            .files
            .iter()
            .chain(album.rejected.iter().map(|r| &r.file))
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));

        tracing::info!(album = %album.name, files = files.len(), "processing album");
        for file in files {
            if cancel.is_cancelled() {
                return Ok(false);
            }
            self.process_file(&album.name, file).await?;
        }
        Ok(true)
    }

    /// Runs one file through the state machine and counts the outcome.
    ///
    /// Only store write failures are returned as errors; every per-file
    /// problem ends up in the failure log instead.
    pub async fn process_file(
        &mut self,
        album: &str,
        file: &MediaFile,
    ) -> Result<FileOutcome, StoreError> {
        self.progress.set_message(file.name.clone());
        let outcome = self.evaluate(album, file).await?;
        self.summary.record(outcome);
        self.progress.inc(1);
        Ok(outcome)
    }

    /// Replays every recorded failure. Each category is snapshotted before
    /// any record is processed, so a file that fails again under a different
    /// category is not retried twice in the same run.
    pub async fn retry_failed(&mut self, cancel: &CancellationToken) -> Result<bool, StoreError> {
        let snapshots: Vec<(FailureCategory, Vec<FailureRecord>)> = FailureCategory::ALL
            .into_iter()
            .map(|category| (category, self.failures.list_category(category).to_vec()))
            .collect();

        for (category, records) in snapshots {
            if !records.is_empty() {
                tracing::info!(%category, records = records.len(), "retrying category");
            }
            if !self.replay(&records, cancel).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Replays the records currently filed under one category.
    pub async fn retry_category(
        &mut self,
        category: FailureCategory,
        cancel: &CancellationToken,
    ) -> Result<bool, StoreError> {
        let records = self.failures.list_category(category).to_vec();
        self.replay(&records, cancel).await
    }

    /// Resolves a failure record back to a file on disk and processes it.
    /// A file that has disappeared keeps its record and counts as missing.
    pub async fn retry_record(&mut self, record: &FailureRecord) -> Result<FileOutcome, StoreError> {
        match catalog::resolve_file(&record.path) {
            Ok(file) => self.process_file(&record.album, &file).await,
            Err(e) => {
                tracing::warn!(path = %record.path.display(), "failed file not found: {}", e);
                self.summary.record(FileOutcome::Missing);
                self.progress.inc(1);
                Ok(FileOutcome::Missing)
            }
        }
    }

    /// Makes sure every album of a scan has a remote album id, without
    /// uploading any media.
    pub async fn create_albums(
        &mut self,
        albums: &[AlbumUnit],
        cancel: &CancellationToken,
    ) -> Result<bool, StoreError> {
        for album in albums {
            if cancel.is_cancelled() {
                return Ok(false);
            }
            self.progress.set_message(album.name.clone());

            if self.state.album_id(&album.name).is_some() {
                tracing::debug!(album = %album.name, "album already known");
            } else if self.dry_run {
                self.summary.albums_pending += 1;
            } else if let Err(e) = self.ensure_album(&album.name, Some(&album.path)).await? {
                tracing::error!(album = %album.name, "album creation failed: {}", e);
                self.summary.album_errors += 1;
            }

            self.progress.inc(1);
        }
        Ok(true)
    }

    async fn replay(
        &mut self,
        records: &[FailureRecord],
        cancel: &CancellationToken,
    ) -> Result<bool, StoreError> {
        for record in records {
            if cancel.is_cancelled() {
                return Ok(false);
            }
            self.retry_record(record).await?;
        }
        Ok(true)
    }

    async fn evaluate(&mut self, album: &str, file: &MediaFile) -> Result<FileOutcome, StoreError> {
        if self.state.is_uploaded(album, &file.name) {
            return self.revisit_uploaded(album, file).await;
        }

        if let Some(rejection) = catalog::classify(file) {
            return self
                .fail(album, file, rejection.category, rejection.reason)
                .await;
        }

        if self.dry_run {
            tracing::info!(album, file = %file.name, "would upload");
            return Ok(FileOutcome::WouldUpload);
        }

        if let Some(exif) = self.exif {
            match exif.reconcile(file, album).await {
                ExifVerdict::Consistent => {}
                ExifVerdict::Corrected { from, to } => {
                    tracing::info!(file = %file.path.display(), %from, %to, "EXIF date corrected");
                }
                ExifVerdict::Unresolved(reason) => {
                    return self
                        .fail(album, file, FailureCategory::ExifErrors, reason)
                        .await;
                }
            }
        }

        let media_id = match self.client.upload(file).await {
            Ok(id) => id,
            Err(e) => {
                return self
                    .fail(album, file, FailureCategory::UploadError, e.to_string())
                    .await;
            }
        };

        let album_id = match self.ensure_album(album, file.folder()).await? {
            Ok(id) => id,
            Err(e) => {
                return self
                    .fail(album, file, FailureCategory::AddToAlbumError, e.to_string())
                    .await;
            }
        };

        if let Err(e) = self.client.add_to_album(&media_id, &album_id, &file.name).await {
            return self
                .fail(album, file, FailureCategory::AddToAlbumError, e.to_string())
                .await;
        }

        self.commit_success(album, file, &album_id).await?;
        Ok(FileOutcome::Uploaded)
    }

    /// Handles a file the state store already lists. The upload is never
    /// repeated. A pending `ExifErrors` record is settled through the EXIF
    /// check when one is attached; any other record is stale and dropped.
    async fn revisit_uploaded(
        &mut self,
        album: &str,
        file: &MediaFile,
    ) -> Result<FileOutcome, StoreError> {
        if self.dry_run {
            tracing::debug!(album, file = %file.name, "already uploaded");
            return Ok(FileOutcome::Skipped);
        }

        let pending_exif =
            self.failures.category_of(&file.path) == Some(FailureCategory::ExifErrors);
        if !pending_exif {
            if self.failures.remove_everywhere(&file.path) {
                self.failures.save().await?;
                self.summary.cleared += 1;
            }
            tracing::debug!(album, file = %file.name, "already uploaded");
            return Ok(FileOutcome::Skipped);
        }

        let Some(exif) = self.exif else {
            tracing::debug!(album, file = %file.name, "already uploaded, EXIF check pending");
            return Ok(FileOutcome::Skipped);
        };

        match exif.reconcile(file, album).await {
            ExifVerdict::Unresolved(reason) => {
                self.fail(album, file, FailureCategory::ExifErrors, reason).await
            }
            verdict => {
                if let ExifVerdict::Corrected { from, to } = verdict {
                    tracing::info!(file = %file.path.display(), %from, %to, "EXIF date corrected");
                }
                self.failures.remove(FailureCategory::ExifErrors, &file.path);
                self.failures.save().await?;
                tracing::info!(album, file = %file.name, "EXIF record settled");
                Ok(FileOutcome::ExifResolved)
            }
        }
    }

    /// Album id from the state store, or a newly resolved one that is saved
    /// right away so later files and runs reuse it. The inner error is a
    /// per-file failure; the outer one is fatal.
    async fn ensure_album(
        &mut self,
        album: &str,
        folder: Option<&Path>,
    ) -> Result<Result<String, ClientError>, StoreError> {
        if let Some(id) = self.state.album_id(album) {
            return Ok(Ok(id.to_string()));
        }

        match self.client.create_album_if_absent(album).await {
            Ok(id) => {
                self.state.record_album(album, &id, folder);
                self.state.save().await?;
                self.summary.albums_created += 1;
                tracing::info!(album, album_id = %id, "album ready");
                Ok(Ok(id))
            }
            Err(e) => Ok(Err(e)),
        }
    }

    /// Records the upload and clears the failure log entry for the file.
    async fn commit_success(
        &mut self,
        album: &str,
        file: &MediaFile,
        album_id: &str,
    ) -> Result<(), StoreError> {
        self.state.record_success(album, &file.name, album_id);
        self.state.save().await?;

        if self.failures.remove_everywhere(&file.path) {
            self.failures.save().await?;
        }

        tracing::info!(album, file = %file.name, "uploaded");
        Ok(())
    }

    async fn fail(
        &mut self,
        album: &str,
        file: &MediaFile,
        category: FailureCategory,
        reason: String,
    ) -> Result<FileOutcome, StoreError> {
        if self.dry_run {
            tracing::info!(album, file = %file.name, %category, "would fail: {}", reason);
            return Ok(FileOutcome::WouldFail(category));
        }

        tracing::warn!(album, file = %file.path.display(), %category, "{}", reason);
        self.failures
            .record_failure(category, FailureRecord::new(file.path.clone(), album, reason));
        self.failures.save().await?;
        Ok(FileOutcome::Failed(category))
    }
}
