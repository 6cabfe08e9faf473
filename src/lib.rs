//! Google Photos uploader library
//!
//! Mirrors a local folder tree into remote albums: every direct sub-folder of
//! the root becomes one album and its media files are uploaded into it.
//! Progress is kept in two JSON stores so that repeated runs only upload
//! what is new, and every file that could not be uploaded is filed in a
//! categorized failure log that retry and listener runs can replay.
//!
//! # Modules
//!
//! - `catalog` - folder scan and media classification
//! - `cli` - run modes behind the command-line flags
//! - `config` - configuration from environment variables and `.env`
//! - `error` - error types
//! - `exif` - EXIF capture date verification through `exiftool`
//! - `listener` - long-running retry loop over one failure category
//! - `logging` - file logging through `tracing`
//! - `management` - upload state, failure log and access token stores
//! - `orchestrator` - the per-file upload state machine
//! - `photos` - Photos Library API client
//! - `types` - data structures and type definitions
//! - `utils` - progress bars and summary rendering

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod exif;
pub mod listener;
pub mod logging;
pub mod management;
pub mod orchestrator;
pub mod photos;
pub mod types;
pub mod utils;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Scanning {}...", root.display());
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only for fatal errors: the process terminates with exit code 1 right after
/// the message is printed.
///
/// # Example
///
/// ```
/// error!("Cannot load upload state. Err: {}", e);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
