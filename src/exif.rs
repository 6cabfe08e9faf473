//! EXIF date verification against the album folder name.
//!
//! Album folders named like `2019-03 Lisbon` or `201903_trip` carry the month
//! the photos were taken. When the `DateTimeOriginal` tag of a file disagrees,
//! the tag is rewritten to the folder's year and month before upload.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tokio::{process::Command, time::timeout};

use crate::types::MediaFile;

const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

const READ_TIMEOUT: Duration = Duration::from_secs(5);

const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Extensions whose capture date is checked.
pub const READABLE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "tif", "tiff", "heic", "heif", "cr2",
];

/// Extensions whose capture date can be rewritten in place.
pub const WRITABLE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "tif", "tiff", "heic", "heif", "cr2"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExifVerdict {
    /// Nothing to do: dates agree, or the file/folder carries no date.
    Consistent,
    Corrected {
        from: NaiveDateTime,
        to: NaiveDateTime,
    },
    /// A mismatch was found and could not be fixed.
    Unresolved(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExifInspector: Send + Sync {
    async fn reconcile(&self, file: &MediaFile, album: &str) -> ExifVerdict;
}

/// [`ExifInspector`] that shells out to `exiftool`.
#[derive(Debug, Clone)]
pub struct Exiftool {
    binary: PathBuf,
}

impl Exiftool {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Checks that the binary can be executed. Returns its version string.
    pub async fn probe(&self) -> Result<String, String> {
        let output = self.run(&["-ver"], READ_TIMEOUT).await?;
        Ok(output.trim().to_string())
    }

    async fn read_date(&self, path: &Path) -> Result<Option<NaiveDateTime>, String> {
        let path_arg = path.to_string_lossy();
        let output = self
            .run(
                &["-s", "-s", "-s", "-DateTimeOriginal", path_arg.as_ref()],
                READ_TIMEOUT,
            )
            .await?;
        Ok(parse_exif_date(&output))
    }

    async fn write_date(&self, path: &Path, date: NaiveDateTime) -> Result<(), String> {
        let stamp = date.format(EXIF_DATE_FORMAT).to_string();
        let path_arg = path.to_string_lossy();
        self.run(
            &[
                "-overwrite_original",
                &format!("-DateTimeOriginal={}", stamp),
                &format!("-CreateDate={}", stamp),
                &format!("-ModifyDate={}", stamp),
                path_arg.as_ref(),
            ],
            WRITE_TIMEOUT,
        )
        .await
        .map(|_| ())
    }

    async fn run(&self, args: &[&str], limit: Duration) -> Result<String, String> {
        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = timeout(limit, command.output())
            .await
            .map_err(|_| format!("{} timed out after {:?}", self.binary.display(), limit))?
            .map_err(|e| format!("cannot run {}: {}", self.binary.display(), e))?;

        if !output.status.success() {
            return Err(format!(
                "{} failed ({}): {}",
                self.binary.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ExifInspector for Exiftool {
    async fn reconcile(&self, file: &MediaFile, album: &str) -> ExifVerdict {
        let Some((year, month)) = folder_year_month(album) else {
            return ExifVerdict::Consistent;
        };
        if !READABLE_EXTENSIONS.contains(&file.extension.as_str()) {
            return ExifVerdict::Consistent;
        }

        let original = match self.read_date(&file.path).await {
            Ok(Some(date)) => date,
            Ok(None) => {
                tracing::debug!(file = %file.path.display(), "no EXIF capture date");
                return ExifVerdict::Consistent;
            }
            Err(e) => {
                tracing::warn!(file = %file.path.display(), "cannot read EXIF date: {}", e);
                return ExifVerdict::Consistent;
            }
        };

        if original.year() == year && original.month() == month {
            return ExifVerdict::Consistent;
        }

        let mismatch = format!(
            "EXIF date {} does not match folder date {}-{:02}",
            original, year, month
        );
        let Some(corrected) = corrected_date(original, year, month) else {
            return ExifVerdict::Unresolved(mismatch);
        };
        if !WRITABLE_EXTENSIONS.contains(&file.extension.as_str()) {
            return ExifVerdict::Unresolved(format!(
                "{}; .{} files cannot be rewritten",
                mismatch, file.extension
            ));
        }

        match self.write_date(&file.path, corrected).await {
            Ok(()) => ExifVerdict::Corrected {
                from: original,
                to: corrected,
            },
            Err(e) => ExifVerdict::Unresolved(format!("{}; rewrite failed: {}", mismatch, e)),
        }
    }
}

/// Finds the first `YYYY[-_]?MM` group with a valid month in a folder name.
pub fn folder_year_month(name: &str) -> Option<(i32, u32)> {
    let bytes = name.as_bytes();
    let digits = |from: usize, len: usize| -> Option<u32> {
        let slice = bytes.get(from..from + len)?;
        if !slice.iter().all(u8::is_ascii_digit) {
            return None;
        }
        std::str::from_utf8(slice).ok()?.parse().ok()
    };

    for start in 0..bytes.len() {
        let Some(year) = digits(start, 4) else {
            continue;
        };
        let mut month_at = start + 4;
        if matches!(bytes.get(month_at), Some(b'-') | Some(b'_')) {
            month_at += 1;
        }
        if let Some(month) = digits(month_at, 2) {
            if (1..=12).contains(&month) {
                return Some((year as i32, month));
            }
        }
    }
    None
}

/// Moves `original` into `year`/`month`, keeping day and time. Falls back to
/// the first of the month when the day does not exist there.
pub fn corrected_date(original: NaiveDateTime, year: i32, month: u32) -> Option<NaiveDateTime> {
    let date = NaiveDate::from_ymd_opt(year, month, original.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, month, 1))?;
    Some(date.and_time(original.time()))
}

fn parse_exif_date(output: &str) -> Option<NaiveDateTime> {
    let trimmed = output.trim();
    let stamp = trimmed.get(..19).unwrap_or(trimmed);
    NaiveDateTime::parse_from_str(stamp, EXIF_DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, EXIF_DATE_FORMAT).unwrap()
    }

    #[test]
    fn folder_dates_with_and_without_separator() {
        assert_eq!(folder_year_month("2019-03 Lisbon"), Some((2019, 3)));
        assert_eq!(folder_year_month("trip_2021_11"), Some((2021, 11)));
        assert_eq!(folder_year_month("201807"), Some((2018, 7)));
    }

    #[test]
    fn folder_without_valid_month_has_no_date() {
        assert_eq!(folder_year_month("Chromosphere"), None);
        assert_eq!(folder_year_month("1999-99"), None);
        assert_eq!(folder_year_month("12"), None);
    }

    #[test]
    fn correction_keeps_day_and_time() {
        let fixed = corrected_date(dt("2017:08:14 10:20:30"), 2019, 3).unwrap();
        assert_eq!(fixed, dt("2019:03:14 10:20:30"));
    }

    #[test]
    fn correction_clamps_missing_day_to_first() {
        let fixed = corrected_date(dt("2020:01:31 08:00:00"), 2021, 2).unwrap();
        assert_eq!(fixed, dt("2021:02:01 08:00:00"));
    }

    #[test]
    fn exiftool_output_is_parsed() {
        assert_eq!(
            parse_exif_date("2019:03:12 10:11:12\n"),
            Some(dt("2019:03:12 10:11:12"))
        );
        assert_eq!(
            parse_exif_date("2019:03:12 10:11:12.345+01:00"),
            Some(dt("2019:03:12 10:11:12"))
        );
        assert_eq!(parse_exif_date(""), None);
    }
}
