use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::{
    cli::{self, RunSettings},
    error, info,
    orchestrator::RetryOrchestrator,
    utils,
};

/// Uploads every album below `root`.
///
/// Files already listed in the upload state are skipped, so running the same
/// command twice over an unchanged tree uploads nothing the second time.
pub async fn upload(root: &Path, settings: &RunSettings, cancel: &CancellationToken) {
    let albums = cli::scan_root(root);
    let (mut state, mut failures) = cli::open_stores(settings).await;
    let client = cli::connect(settings).await;
    let exiftool = cli::exif_inspector(settings).await;

    if settings.dry_run {
        info!("Dry run, nothing will be uploaded or recorded");
    }

    let pb = utils::progress_bar(utils::count_files(&albums));
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

    let completed = match orchestrator.run_catalog(&albums, cancel).await {
        Ok(completed) => completed,
        Err(e) => {
            pb.finish_and_clear();
            error!("Cannot save progress. Err: {}", e)
        }
    };
    pb.finish_and_clear();

    cli::report(orchestrator.summary(), completed);
}
