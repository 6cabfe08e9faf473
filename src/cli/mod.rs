//! # CLI Module
//!
//! This module is the command-line layer of the uploader. Each run mode lives
//! in its own file and follows the same shape: open the two stores, connect
//! the photo client, drive a [`RetryOrchestrator`] and print a summary.
//!
//! ## Run Modes
//!
//! - [`upload`] - scans a folder tree and uploads every album in it
//! - [`retry_failed`] - replays every record of the failure log
//! - [`listen`] - keeps re-driving one failure category until Ctrl-C
//! - [`create_albums`] - makes sure a remote album exists for every folder
//!
//! ## Architecture
//!
//! ```text
//! CLI Layer (flags, console output, progress bars)
//!     ↓
//! RetryOrchestrator / ListenerLoop
//!     ↓                    ↓
//! management (stores)   photos (UploadClient), exif (ExifInspector)
//! ```
//!
//! ## Error Handling
//!
//! Per-file problems never end a run; they are filed in the failure log and
//! counted in the summary. An unreadable root, a corrupt store, a store that
//! cannot be written or a missing access token abort the run through the
//! `error!` macro, which exits with status 1.
//!
//! ## Cancellation
//!
//! Every mode receives a [`CancellationToken`] that is cancelled on Ctrl-C.
//! The file in flight is finished and saved before the run stops.
//!
//! [`RetryOrchestrator`]: crate::orchestrator::RetryOrchestrator
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

mod albums;
mod listen;
mod retry;
mod upload;

pub use albums::create_albums;
pub use listen::listen;
pub use retry::retry_failed;
pub use upload::upload;

use std::path::{Path, PathBuf};

use crate::{
    catalog, config, error,
    exif::Exiftool,
    management::{
        FAILED_UPLOADS_FILE, FailureStore, TOKEN_FILE, TokenManager, UPLOAD_STATE_FILE,
        UploadStateStore,
    },
    orchestrator::RunSummary,
    photos::GooglePhotosClient,
    success,
    types::AlbumUnit,
    utils, warning,
};

/// Options shared by every run mode.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub state_dir: PathBuf,
    pub dry_run: bool,
    pub update_exif: bool,
}

impl RunSettings {
    pub fn state_file(&self) -> PathBuf {
        self.state_dir.join(UPLOAD_STATE_FILE)
    }

    pub fn failures_file(&self) -> PathBuf {
        self.state_dir.join(FAILED_UPLOADS_FILE)
    }

    pub fn token_file(&self) -> PathBuf {
        self.state_dir.join(TOKEN_FILE)
    }
}

/// Loads both stores. A store that exists but cannot be parsed is fatal.
async fn open_stores(settings: &RunSettings) -> (UploadStateStore, FailureStore) {
    let state = match UploadStateStore::load(settings.state_file()).await {
        Ok(state) => state,
        Err(e) => error!("Cannot load upload state. Err: {}", e),
    };

    let failures = match FailureStore::load(settings.failures_file()).await {
        Ok(failures) => failures,
        Err(e) => error!("Cannot load failure log. Err: {}", e),
    };

    for key in failures.unknown_categories() {
        warning!("Keeping unknown failure category '{}' untouched", key);
    }

    (state, failures)
}

/// Builds the photo client. Dry runs never talk to the service and therefore
/// do not need a token.
async fn connect(settings: &RunSettings) -> GooglePhotosClient {
    if settings.dry_run {
        return GooglePhotosClient::new(config::api_url(), String::new());
    }

    let tokens = match TokenManager::load(&settings.token_file()).await {
        Ok(tokens) => tokens,
        Err(e) => error!(
            "Cannot load access token. Set GPHOTOS_ACCESS_TOKEN or provide {}\n Error: {}",
            settings.token_file().display(),
            e
        ),
    };

    match tokens.access_token() {
        Ok(token) => GooglePhotosClient::new(config::api_url(), token),
        Err(e) => error!("Access token unusable. Err: {}", e),
    }
}

/// Canonicalizes `root` and scans it into album units.
fn scan_root(root: &Path) -> Vec<AlbumUnit> {
    let root = match root.canonicalize() {
        Ok(root) => root,
        Err(e) => error!("Invalid root {}. Err: {}", root.display(), e),
    };

    let pb = utils::spinner(&format!("Scanning {}...", root.display()));
    let albums = match catalog::scan(&root) {
        Ok(albums) => albums,
        Err(e) => {
            pb.finish_and_clear();
            error!("Cannot scan media folder. Err: {}", e)
        }
    };
    pb.finish_and_clear();

    success!(
        "Found {} albums with {} files in {}",
        albums.len(),
        utils::count_files(&albums),
        root.display()
    );
    albums
}

/// Exiftool wrapper when EXIF correction was requested. Asking for the
/// correction without a working exiftool is fatal.
async fn exif_inspector(settings: &RunSettings) -> Option<Exiftool> {
    if !settings.update_exif || settings.dry_run {
        return None;
    }

    let exiftool = Exiftool::new(config::exiftool());
    match exiftool.probe().await {
        Ok(version) => {
            tracing::info!(%version, "using exiftool");
            Some(exiftool)
        }
        Err(e) => error!("EXIF correction requested but exiftool is unavailable. Err: {}", e),
    }
}

fn report(summary: &RunSummary, completed: bool) {
    if !completed {
        warning!("Interrupted, progress so far has been saved");
    }

    match utils::summary_table(summary) {
        Some(table) => println!("{}", table),
        None => success!("Nothing to do."),
    }

    let failed = summary.failed_total();
    if failed > 0 {
        warning!("{} file(s) were filed in the failure log", failed);
    }
}
