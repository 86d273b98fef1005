//! Collect, partition, relocate: one linear pass over a folder

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use tracing::info;

use crate::collect::{collect_records, Collection, ScanOptions};
use crate::exif::MetadataSource;
use crate::partition::{partition, Partition};
use crate::progress::Progress;
use crate::relocate::{relocate, RelocationReport};
use crate::report::RunSummary;

/// Everything one run produced, for callers that want more than the summary
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub collection: Collection,
    pub partition: Partition,
    pub relocation: RelocationReport,
    pub summary: RunSummary,
}

/// Group the RAW files in `folder` into `HDR_xx` subfolders.
///
/// Errors only if the folder cannot be enumerated; everything else ends up
/// in the summary.
pub fn run<S>(
    folder: &Path,
    source: &S,
    options: &ScanOptions,
    progress: &mut dyn Progress,
) -> Result<RunOutcome>
where
    S: MetadataSource + ?Sized,
{
    let started = Instant::now();

    let collection = collect_records(folder, source, options, progress)?;
    let partition = partition(collection.records.clone());
    info!(
        sets = partition.sets.len(),
        grouped = partition.grouped_files(),
        ungrouped = partition.ungrouped.len(),
        "partitioned records"
    );

    let relocation = relocate(folder, &partition.sets, progress);
    let summary = RunSummary::new(
        folder,
        &collection,
        &partition,
        &relocation,
        started.elapsed().as_secs_f64(),
    );

    Ok(RunOutcome {
        collection,
        partition,
        relocation,
        summary,
    })
}
