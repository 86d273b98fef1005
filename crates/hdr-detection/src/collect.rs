//! Folder scanning and record collection

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::exif::{extract_with_retry, MetadataSource, RetryPolicy};
use crate::progress::{Progress, Stage};
use crate::record::{PhotoRecord, SkipReason, SkippedEntry};

/// RAW extensions the scanner will accept when asked for them
pub const RAW_EXTENSIONS: &[&str] = &[
    "nef", "nrw", "cr2", "cr3", "arw", "dng", "orf", "rw2", "raf", "pef",
];

/// Extension scanned when nothing else is requested
pub const DEFAULT_EXTENSION: &str = "nef";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Lowercase extensions without the leading dot
    pub extensions: Vec<String>,
    pub retry: RetryPolicy,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: vec![DEFAULT_EXTENSION.to_string()],
            retry: RetryPolicy::default(),
        }
    }
}

impl ScanOptions {
    /// Options for the given extensions; unknown or non-RAW ones are an error
    pub fn with_extensions<I, S>(extensions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for ext in extensions {
            let ext = ext.as_ref().trim().trim_start_matches('.').to_lowercase();
            if !RAW_EXTENSIONS.contains(&ext.as_str()) {
                bail!(
                    "Unsupported extension '{}'. Expected one of: {}",
                    ext,
                    RAW_EXTENSIONS.join(", ")
                );
            }
            if !normalized.contains(&ext) {
                normalized.push(ext);
            }
        }

        if normalized.is_empty() {
            return Ok(Self::default());
        }

        Ok(Self {
            extensions: normalized,
            ..Self::default()
        })
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

/// Output of one folder scan
#[derive(Debug, Clone, Default, Serialize)]
pub struct Collection {
    /// Sorted by capture time, then file name
    pub records: Vec<PhotoRecord>,
    pub skipped: Vec<SkippedEntry>,
}

impl Collection {
    pub fn files_seen(&self) -> usize {
        self.records.len() + self.skipped.len()
    }
}

/// List matching files directly inside `folder`, sorted by path.
///
/// Fails only when the folder itself cannot be enumerated.
pub fn scan_folder(folder: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>> {
    if !folder.exists() {
        bail!("The specified path does not exist: {}", folder.display());
    }
    if !folder.is_dir() {
        bail!("Not a directory: {}", folder.display());
    }

    let entries = std::fs::read_dir(folder)
        .with_context(|| format!("Failed to read directory: {}", folder.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(folder = %folder.display(), error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() && options.matches(&path) {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

/// Scan `folder` and read every matching file through `source`.
///
/// Per-file failures land in [`Collection::skipped`]; only an unreadable
/// folder is an error.
pub fn collect_records<S>(
    folder: &Path,
    source: &S,
    options: &ScanOptions,
    progress: &mut dyn Progress,
) -> Result<Collection>
where
    S: MetadataSource + ?Sized,
{
    let paths = scan_folder(folder, options)?;
    info!(folder = %folder.display(), files = paths.len(), "scanning folder");

    let mut collection = Collection::default();
    progress.start(Stage::Extracting, paths.len());

    for path in paths {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        match extract_with_retry(source, &path, &options.retry) {
            Ok(metadata) => {
                debug!(
                    file = %filename,
                    captured_at = %metadata.captured_at,
                    bias = %metadata.exposure_bias,
                    "read metadata"
                );
                collection.records.push(PhotoRecord::new(
                    path,
                    metadata.captured_at,
                    metadata.exposure_bias,
                ));
            }
            Err(err) => {
                debug!(file = %filename, error = %err, "skipping file");
                collection.skipped.push(SkippedEntry {
                    filename: filename.clone(),
                    reason: SkipReason::from(err),
                });
            }
        }

        progress.advance(Stage::Extracting, &filename);
    }

    progress.finish(Stage::Extracting);
    collection.records.sort_by(PhotoRecord::chronological);

    info!(
        records = collection.records.len(),
        skipped = collection.skipped.len(),
        "metadata extraction complete"
    );
    Ok(collection)
}
