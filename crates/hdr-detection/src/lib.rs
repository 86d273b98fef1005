//! HDR bracket detection and grouping for camera RAW files
//!
//! Reads capture time and exposure bias from every RAW file in a folder,
//! finds runs of shots that form a bracketed exposure sequence, and moves
//! each run into its own `HDR_01`, `HDR_02`, ... subfolder.

pub mod collect;
pub mod exif;
pub mod partition;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod relocate;
pub mod report;

pub use collect::{collect_records, scan_folder, Collection, ScanOptions, DEFAULT_EXTENSION, RAW_EXTENSIONS};
pub use exif::{extract_with_retry, ExtractError, MetadataSource, RawMetadata, RetryPolicy, RexifSource};
pub use partition::{partition, HdrSet, Partition, RejectReason, UngroupedEntry, MAX_SHOT_GAP_MS, MIN_SET_SIZE};
pub use pipeline::{run, RunOutcome};
pub use progress::{NoProgress, Progress, Stage};
pub use record::{ExposureBias, PhotoRecord, SkipReason, SkippedEntry};
pub use relocate::{relocate, MoveError, MoveFailure, MovedFile, RelocationReport};
pub use report::RunSummary;
