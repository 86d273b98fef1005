//! EXIF metadata extraction for HDR detection
//!
//! Only two facts matter per file: when it was captured and how much exposure
//! compensation the camera applied. Both are read through [`MetadataSource`]
//! so the collector can be driven by an in-memory source in tests.

use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use rexif::{ExifTag, TagValue};
use thiserror::Error;
use tracing::{debug, warn};

use crate::record::{ExposureBias, SkipReason};

/// EXIF tag id of SubSecTimeOriginal
const SUBSEC_TIME_ORIGINAL: u16 = 0x9291;

/// What the collector needs from one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMetadata {
    pub captured_at: DateTime<Utc>,
    pub exposure_bias: ExposureBias,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("DateTimeOriginal tag is missing or unparsable")]
    MissingTimestamp,
    #[error("ExposureBiasValue tag is missing or unparsable")]
    MissingExposureBias,
    /// `transient` marks failures worth retrying (locked or half-written files)
    #[error("{message}")]
    Read { message: String, transient: bool },
}

impl ExtractError {
    pub fn permanent(message: impl Into<String>) -> Self {
        ExtractError::Read { message: message.into(), transient: false }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        ExtractError::Read { message: message.into(), transient: true }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ExtractError::Read { transient: true, .. })
    }
}

impl From<ExtractError> for SkipReason {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::MissingTimestamp => SkipReason::MissingTimestamp,
            ExtractError::MissingExposureBias => SkipReason::MissingExposureBias,
            ExtractError::Read { message, .. } => SkipReason::ReadError(message),
        }
    }
}

/// Anything that can answer "when, and at what bias" for a file
pub trait MetadataSource {
    fn read(&self, path: &Path) -> Result<RawMetadata, ExtractError>;
}

/// Reads EXIF straight out of TIFF-based RAW files (NEF, CR2, ARW, DNG, ...)
#[derive(Debug, Default, Clone, Copy)]
pub struct RexifSource;

impl MetadataSource for RexifSource {
    fn read(&self, path: &Path) -> Result<RawMetadata, ExtractError> {
        let contents = std::fs::read(path).map_err(|e| classify_io_error(&e))?;
        let exif = rexif::parse_buffer(&contents).map_err(classify_exif_error)?;

        let mut date_time_original: Option<String> = None;
        let mut subsec_time_original: Option<String> = None;
        let mut exposure_bias: Option<ExposureBias> = None;

        for entry in &exif.entries {
            if entry.ifd.tag == SUBSEC_TIME_ORIGINAL {
                subsec_time_original = Some(match &entry.value {
                    TagValue::Ascii(s) => s.clone(),
                    _ => entry.value_more_readable.to_string(),
                });
                continue;
            }

            match entry.tag {
                ExifTag::DateTimeOriginal => {
                    if let TagValue::Ascii(s) = &entry.value {
                        date_time_original = Some(s.clone());
                    }
                }
                ExifTag::ExposureBiasValue => {
                    if let TagValue::IRational(values) = &entry.value {
                        exposure_bias = values
                            .first()
                            .and_then(|r| ExposureBias::new(r.numerator, r.denominator));
                    }
                }
                _ => {}
            }
        }

        let captured_at = parse_capture_time(
            date_time_original.as_deref(),
            subsec_time_original.as_deref(),
        )
        .ok_or(ExtractError::MissingTimestamp)?;
        let exposure_bias = exposure_bias.ok_or(ExtractError::MissingExposureBias)?;

        Ok(RawMetadata { captured_at, exposure_bias })
    }
}

fn classify_io_error(err: &io::Error) -> ExtractError {
    match err.kind() {
        io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock
        | io::ErrorKind::TimedOut
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::PermissionDenied => ExtractError::transient(err.to_string()),
        _ => ExtractError::permanent(err.to_string()),
    }
}

fn classify_exif_error(err: rexif::ExifError) -> ExtractError {
    match err {
        rexif::ExifError::IoError(e) => classify_io_error(&e),
        // A RAW still being copied off the card looks truncated until it lands.
        rexif::ExifError::TiffTruncated | rexif::ExifError::IfdTruncated => {
            ExtractError::transient(err.to_string())
        }
        other => ExtractError::permanent(other.to_string()),
    }
}

/// Parse capture time with subsecond precision
pub fn parse_capture_time(
    date_time_original: Option<&str>,
    subsec_time_original: Option<&str>,
) -> Option<DateTime<Utc>> {
    let date_str = date_time_original?.trim_end_matches('\0').trim();

    let naive_dt = NaiveDateTime::parse_from_str(date_str, "%Y:%m:%d %H:%M:%S").ok()?;

    // SubSecTime is the digits after the decimal point: "5" = .5s, "050" = .05s
    let dt_with_subsec = match subsec_time_original.map(|s| s.trim_end_matches('\0').trim()) {
        Some(subsec) if !subsec.is_empty() && subsec.len() <= 9 => match subsec.parse::<u32>() {
            Ok(subsec_num) => {
                let subsec_nanos = subsec_num * 10u32.pow(9 - subsec.len() as u32);
                naive_dt.with_nanosecond(subsec_nanos).unwrap_or(naive_dt)
            }
            Err(_) => naive_dt,
        },
        _ => naive_dt,
    };

    Some(DateTime::from_naive_utc_and_offset(dt_with_subsec, Utc))
}

/// Bounded retry for transient read failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Sleep before retry `n` is `backoff * n`
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(250),
        }
    }
}

/// Read one file, retrying transient failures up to `policy.max_attempts`.
///
/// Missing tags and permanent read errors return immediately. A transient
/// error that survives the last attempt is returned as-is; the caller turns
/// it into a skipped entry.
pub fn extract_with_retry<S>(source: &S, path: &Path, policy: &RetryPolicy) -> Result<RawMetadata, ExtractError>
where
    S: MetadataSource + ?Sized,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match source.read(path) {
            Ok(metadata) => {
                if attempt > 1 {
                    debug!(path = %path.display(), attempt, "read succeeded after retry");
                }
                return Ok(metadata);
            }
            Err(err) if err.is_transient() && attempt < max_attempts => {
                warn!(
                    path = %path.display(),
                    attempt,
                    max_attempts,
                    error = %err,
                    "transient read failure, retrying"
                );
                thread::sleep(policy.backoff * attempt);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
