use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{
    cli::{self, RunSettings},
    error, info,
    listener::ListenerLoop,
    orchestrator::RetryOrchestrator,
    success,
};

/// Re-drives `ExifErrors` records every `interval` until Ctrl-C.
///
/// Those records can only be settled by the EXIF check, so exiftool is
/// always attached here, with or without the correction flag.
pub async fn listen(settings: &RunSettings, interval: Duration, cancel: &CancellationToken) {
    let (mut state, mut failures) = cli::open_stores(settings).await;
    let client = cli::connect(settings).await;
    let exiftool = cli::exif_inspector(&RunSettings {
        update_exif: true,
        ..settings.clone()
    })
    .await;

    let listener = ListenerLoop::new(interval);
    info!(
        "Watching {} every {}s, press Ctrl-C to stop",
        listener.category(),
        interval.as_secs()
    );

    let mut orchestrator =
        RetryOrchestrator::new(&client, &mut state, &mut failures).dry_run(settings.dry_run);
    if let Some(exiftool) = exiftool.as_ref() {
        orchestrator = orchestrator.with_exif(exiftool);
    }

    let report = match listener.run(&mut orchestrator, cancel).await {
        Ok(report) => report,
        Err(e) => error!("Listener stopped. Err: {}", e),
    };

    success!("Listener stopped after {} cycle(s)", report.cycles);
    cli::report(&report.summary, true);
}
