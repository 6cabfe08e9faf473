use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::{
    cli::{self, RunSettings},
    error,
    orchestrator::RetryOrchestrator,
    utils,
};

/// Creates (or looks up) a remote album for every folder below `root`
/// without uploading any media.
pub async fn create_albums(root: &Path, settings: &RunSettings, cancel: &CancellationToken) {
    let albums = cli::scan_root(root);
    let (mut state, mut failures) = cli::open_stores(settings).await;
    let client = cli::connect(settings).await;

    let pb = utils::progress_bar(albums.len() as u64);
    let mut orchestrator = RetryOrchestrator::new(&client, &mut state, &mut failures)
        .dry_run(settings.dry_run)
        .with_progress(pb.clone());

    let completed = match orchestrator.create_albums(&albums, cancel).await {
        Ok(completed) => completed,
        Err(e) => {
            pb.finish_and_clear();
            error!("Cannot save album ids. Err: {}", e)
        }
    };
    pb.finish_and_clear();

    cli::report(orchestrator.summary(), completed);
}
