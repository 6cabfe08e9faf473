use tokio_util::sync::CancellationToken;

use crate::{
    cli::{self, RunSettings},
    error, info,
    orchestrator::RetryOrchestrator,
    success, utils,
};

/// Replays every record in the failure log, category by category.
pub async fn retry_failed(settings: &RunSettings, cancel: &CancellationToken) {
    let (mut state, mut failures) = cli::open_stores(settings).await;
    if failures.is_empty() {
        success!("Failure log is empty, nothing to retry.");
        return;
    }

    let client = cli::connect(settings).await;
    let exiftool = cli::exif_inspector(settings).await;

    info!("Retrying {} failed file(s)", failures.len());
    let pb = utils::progress_bar(failures.len() as u64);
    let mut orchestrator = RetryOrchestrator::new(&client, &mut state, &mut failures)
        .dry_run(settings.dry_run)
        .with_progress(pb.clone());
    if let Some(exiftool) = exiftool.as_ref() {
        orchestrator = orchestrator.with_exif(exiftool);
    }

    if let Err(e) = orchestrator.reconcile().await {
        pb.finish_and_clear();
        error!("Cannot repair failure log. Err: {}", e);
    }

    let completed = match orchestrator.retry_failed(cancel).await {
        Ok(completed) => completed,
        Err(e) => {
            pb.finish_and_clear();
            error!("Cannot save progress. Err: {}", e)
        }
    };
    pb.finish_and_clear();

    cli::report(orchestrator.summary(), completed);
}
