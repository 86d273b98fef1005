//! End-of-run summary: what was grouped, skipped, left ungrouped or failed to move

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::collect::Collection;
use crate::partition::{Partition, RejectReason};
use crate::record::SkippedEntry;
use crate::relocate::{MoveFailure, RelocationReport};

#[derive(Debug, Clone, Serialize)]
pub struct SetSummary {
    pub folder_name: String,
    pub files: Vec<String>,
    /// Bias of each file, same order as `files`
    pub biases: Vec<String>,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UngroupedSummary {
    pub filename: String,
    pub reason: RejectReason,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub folder: PathBuf,
    pub sets: Vec<SetSummary>,
    pub skipped: Vec<SkippedEntry>,
    pub ungrouped: Vec<UngroupedSummary>,
    pub move_failures: Vec<MoveFailure>,
    pub elapsed_secs: f64,
}

impl RunSummary {
    pub fn new(
        folder: &Path,
        collection: &Collection,
        partition: &Partition,
        relocation: &RelocationReport,
        elapsed_secs: f64,
    ) -> Self {
        let sets = partition
            .sets
            .iter()
            .map(|set| SetSummary {
                folder_name: set.folder_name.clone(),
                files: set.members.iter().map(|m| m.filename.clone()).collect(),
                biases: set.members.iter().map(|m| m.exposure_bias.to_string()).collect(),
                duration_ms: set.duration_ms,
            })
            .collect();

        let ungrouped = partition
            .ungrouped
            .iter()
            .map(|entry| UngroupedSummary {
                filename: entry.record.filename.clone(),
                reason: entry.reason,
                detail: entry.reason.to_string(),
            })
            .collect();

        Self {
            folder: folder.to_path_buf(),
            sets,
            skipped: collection.skipped.clone(),
            ungrouped,
            move_failures: relocation.failures.clone(),
            elapsed_secs,
        }
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    pub fn grouped_files(&self) -> usize {
        self.sets.iter().map(|s| s.files.len()).sum()
    }

    /// Human-readable report for the console and the log file
    pub fn render(&self) -> String {
        let mut out = String::new();

        // Writing to a String cannot fail.
        let _ = writeln!(out, "HDR grouping report for {}", self.folder.display());
        let _ = writeln!(out, "==================");
        let _ = writeln!(out, "HDR sets:        {}", self.set_count());
        let _ = writeln!(out, "Grouped files:   {}", self.grouped_files());
        let _ = writeln!(out, "Skipped files:   {}", self.skipped.len());
        let _ = writeln!(out, "Ungrouped files: {}", self.ungrouped.len());
        if !self.move_failures.is_empty() {
            let _ = writeln!(out, "Failed moves:    {}", self.move_failures.len());
        }

        if !self.sets.is_empty() {
            let _ = writeln!(out, "\nHDR sets:");
            for set in &self.sets {
                let _ = writeln!(
                    out,
                    "  {} ({} shots, {:.1}s)",
                    set.folder_name,
                    set.files.len(),
                    set.duration_ms as f64 / 1000.0
                );
                for (file, bias) in set.files.iter().zip(&set.biases) {
                    let _ = writeln!(out, "    {}  {}", file, bias);
                }
            }
        }

        if !self.skipped.is_empty() {
            let _ = writeln!(out, "\nSkipped (unreadable EXIF):");
            for entry in &self.skipped {
                let _ = writeln!(out, "  {}: {}", entry.filename, entry.reason);
            }
        }

        if !self.ungrouped.is_empty() {
            let _ = writeln!(out, "\nUngrouped (not a valid HDR bracket):");
            for entry in &self.ungrouped {
                let _ = writeln!(out, "  {}: {}", entry.filename, entry.detail);
            }
        }

        if !self.move_failures.is_empty() {
            let _ = writeln!(out, "\nFailed moves:");
            for failure in &self.move_failures {
                let _ = writeln!(out, "  {} -> {}: {}", failure.filename, failure.folder_name, failure.error);
            }
        }

        let _ = writeln!(out, "\nTotal run time: {:.2} seconds.", self.elapsed_secs);
        out
    }

    pub fn write_log(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render())
            .with_context(|| format!("Failed to write log file: {}", path.display()))
    }
}
