//! HDR bracket detection and grouping
//!
//! Records are walked once in capture order. Consecutive shots no more than
//! [`MAX_SHOT_GAP_MS`] apart form a candidate; each closed candidate is then
//! accepted as an HDR set or rejected as ungrouped. Accepted sets are
//! numbered from 1 in time order and map to `HDR_01`, `HDR_02`, ...
//!
//! This module is pure: no filesystem access and no progress reporting.

use std::collections::HashSet;
use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::record::{ExposureBias, PhotoRecord};

/// Largest gap between consecutive shots of one bracket (milliseconds)
pub const MAX_SHOT_GAP_MS: i64 = 1000;

/// Fewest shots an HDR set may have
pub const MIN_SET_SIZE: usize = 3;

/// Destination folder name for the `index`-th accepted set (1-based)
pub fn folder_name(index: usize) -> String {
    format!("HDR_{:02}", index)
}

/// An accepted bracket, ready to be moved into its own folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HdrSet {
    /// 1-based, contiguous, in time order
    pub group_index: usize,
    /// e.g. `HDR_01`
    pub folder_name: String,
    /// Members in capture order
    pub members: Vec<PhotoRecord>,
    /// Time between first and last shot (milliseconds)
    pub duration_ms: i64,
}

impl HdrSet {
    fn new(group_index: usize, members: Vec<PhotoRecord>) -> Self {
        let duration_ms = match (members.first(), members.last()) {
            (Some(first), Some(last)) => last
                .captured_at
                .signed_duration_since(first.captured_at)
                .num_milliseconds(),
            _ => 0,
        };

        Self {
            group_index,
            folder_name: folder_name(group_index),
            members,
            duration_ms,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Distinct biases in ascending order
    pub fn biases(&self) -> Vec<ExposureBias> {
        let mut biases: Vec<ExposureBias> = self.members.iter().map(|m| m.exposure_bias).collect();
        biases.sort();
        biases.dedup();
        biases
    }
}

/// Why a candidate group did not become an HDR set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Fewer than [`MIN_SET_SIZE`] shots
    TooFewShots { count: usize },
    /// Brackets are 3, 5, 7, ... shots around a centre exposure
    EvenShotCount { count: usize },
    /// Every shot has the same bias; a burst rather than a bracket
    UniformBias,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::TooFewShots { count } => {
                write!(f, "only {} shot(s) in sequence, need at least {}", count, MIN_SET_SIZE)
            }
            RejectReason::EvenShotCount { count } => {
                write!(f, "{} shots in sequence, bracket must be odd", count)
            }
            RejectReason::UniformBias => write!(f, "no exposure bias variation in sequence"),
        }
    }
}

/// A readable file whose candidate group failed the acceptance rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UngroupedEntry {
    pub record: PhotoRecord,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Partition {
    pub sets: Vec<HdrSet>,
    /// In capture order
    pub ungrouped: Vec<UngroupedEntry>,
}

impl Partition {
    /// Files that will be moved into HDR folders
    pub fn grouped_files(&self) -> usize {
        self.sets.iter().map(HdrSet::len).sum()
    }

    /// Every record the partitioner was given
    pub fn total_records(&self) -> usize {
        self.grouped_files() + self.ungrouped.len()
    }
}

/// Acceptance rules, checked in order; the first failure is reported
pub fn check_candidate(candidate: &[PhotoRecord]) -> Result<(), RejectReason> {
    let count = candidate.len();
    if count < MIN_SET_SIZE {
        return Err(RejectReason::TooFewShots { count });
    }
    if count % 2 == 0 {
        return Err(RejectReason::EvenShotCount { count });
    }

    let distinct: HashSet<ExposureBias> = candidate.iter().map(|r| r.exposure_bias).collect();
    if distinct.len() < 2 {
        return Err(RejectReason::UniformBias);
    }

    Ok(())
}

/// Split records into HDR sets and ungrouped files.
///
/// Input order does not matter; records are sorted by capture time and file
/// name first so the result is deterministic. Every input record ends up in
/// exactly one set or in `ungrouped`.
pub fn partition(mut records: Vec<PhotoRecord>) -> Partition {
    records.sort_by(PhotoRecord::chronological);

    let max_gap = Duration::milliseconds(MAX_SHOT_GAP_MS);
    let mut result = Partition::default();
    let mut current: Vec<PhotoRecord> = Vec::new();

    for record in records {
        let extends_candidate = current
            .last()
            .map(|prev| record.captured_at.signed_duration_since(prev.captured_at) <= max_gap)
            .unwrap_or(true);

        if !extends_candidate {
            close_candidate(std::mem::take(&mut current), &mut result);
        }
        current.push(record);
    }

    close_candidate(current, &mut result);
    result
}

fn close_candidate(candidate: Vec<PhotoRecord>, result: &mut Partition) {
    if candidate.is_empty() {
        return;
    }

    match check_candidate(&candidate) {
        Ok(()) => {
            let index = result.sets.len() + 1;
            result.sets.push(HdrSet::new(index, candidate));
        }
        Err(reason) => {
            result
                .ungrouped
                .extend(candidate.into_iter().map(|record| UngroupedEntry { record, reason }));
        }
    }
}
