use std::{path::PathBuf, time::Duration};

use clap::{
    CommandFactory, Parser,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};
use tokio_util::sync::CancellationToken;

use gphotos_uploader::{cli, config, error, logging, warning};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// Root folder; every sub-folder becomes one album
    #[clap(long, required_unless_present_any = ["retry_failed", "listener", "completions"])]
    path: Option<PathBuf>,

    /// Only make sure a remote album exists for every folder
    #[clap(long, conflicts_with_all = ["retry_failed", "listener"])]
    create_albums_only: bool,

    /// Rewrite the EXIF capture date to the folder's year and month when they disagree
    #[clap(long)]
    update_exif_from_folder_if_mismatch: bool,

    /// Report what would happen without uploading or recording anything
    #[clap(long)]
    dry_run: bool,

    /// Replay every record of the failure log instead of scanning a folder
    #[clap(long, conflicts_with = "listener")]
    retry_failed: bool,

    /// Keep re-driving EXIF failures until interrupted. Always needs exiftool
    #[clap(long)]
    listener: bool,

    /// Directory holding the upload state, failure log, token and log file
    #[clap(long)]
    state_dir: Option<PathBuf>,

    /// Seconds between listener cycles
    #[clap(long)]
    interval: Option<u64>,

    /// Print a shell completion script and exit
    #[clap(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    let settings = cli::RunSettings {
        state_dir: cli.state_dir.clone().unwrap_or_else(config::state_dir),
        dry_run: cli.dry_run,
        update_exif: cli.update_exif_from_folder_if_mismatch,
    };

    let log_path = logging::log_path(&settings.state_dir);
    if let Err(e) = logging::init(&log_path) {
        error!("Cannot set up logging. Err: {}", e);
    }
    tracing::info!(state_dir = %settings.state_dir.display(), dry_run = settings.dry_run, "run started");

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warning!("Interrupt received, finishing the current file...");
            on_interrupt.cancel();
        }
    });

    if cli.listener {
        let interval = cli
            .interval
            .map(Duration::from_secs)
            .unwrap_or_else(config::listener_interval);
        cli::listen(&settings, interval, &cancel).await;
    } else if cli.retry_failed {
        cli::retry_failed(&settings, &cancel).await;
    } else if let Some(root) = cli.path.as_deref() {
        if cli.create_albums_only {
            cli::create_albums(root, &settings, &cancel).await;
        } else {
            cli::upload(root, &settings, &cancel).await;
        }
    }

    tracing::info!("run finished");
}
