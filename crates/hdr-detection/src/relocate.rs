//! Moving accepted HDR sets into their `HDR_xx` folders

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::partition::HdrSet;
use crate::progress::{Progress, Stage};

#[derive(Debug, Error)]
pub enum MoveError {
    #[error("permission denied: {0}")]
    PermissionDenied(#[source] io::Error),
    #[error("{} already exists", .0.display())]
    DestinationExists(PathBuf),
    #[error("io error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for MoveError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => MoveError::PermissionDenied(err),
            _ => MoveError::Io(err),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MovedFile {
    pub filename: String,
    pub folder_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MoveFailure {
    pub filename: String,
    pub folder_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RelocationReport {
    pub moved: Vec<MovedFile>,
    pub failures: Vec<MoveFailure>,
}

/// Move every member of every set into `base_dir/<folder_name>/`.
///
/// Existing folders are reused. A failure affects only the file (or, for a
/// folder that cannot be created, the set) it happened on; the rest carry on.
/// Moves are not undone.
pub fn relocate(base_dir: &Path, sets: &[HdrSet], progress: &mut dyn Progress) -> RelocationReport {
    let mut report = RelocationReport::default();
    progress.start(Stage::Moving, sets.len());

    for set in sets {
        let folder = base_dir.join(&set.folder_name);

        if let Err(err) = fs::create_dir_all(&folder) {
            let err = MoveError::from(err);
            warn!(folder = %folder.display(), error = %err, "cannot create HDR folder");
            report.failures.extend(set.members.iter().map(|member| MoveFailure {
                filename: member.filename.clone(),
                folder_name: set.folder_name.clone(),
                error: err.to_string(),
            }));
            progress.advance(Stage::Moving, &set.folder_name);
            continue;
        }

        for member in &set.members {
            let source = base_dir.join(&member.filename);
            match move_file(&source, &folder.join(&member.filename)) {
                Ok(()) => {
                    debug!(file = %member.filename, folder = %set.folder_name, "moved");
                    report.moved.push(MovedFile {
                        filename: member.filename.clone(),
                        folder_name: set.folder_name.clone(),
                    });
                }
                Err(err) => {
                    warn!(file = %member.filename, folder = %set.folder_name, error = %err, "move failed");
                    report.failures.push(MoveFailure {
                        filename: member.filename.clone(),
                        folder_name: set.folder_name.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        progress.advance(Stage::Moving, &set.folder_name);
    }

    progress.finish(Stage::Moving);
    info!(
        moved = report.moved.len(),
        failed = report.failures.len(),
        "relocation complete"
    );
    report
}

/// Rename `source` to `target`, refusing to overwrite
pub fn move_file(source: &Path, target: &Path) -> Result<(), MoveError> {
    if target.exists() {
        return Err(MoveError::DestinationExists(target.to_path_buf()));
    }
    fs::rename(source, target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;
    use crate::progress::testing::RecordingProgress;
    use crate::progress::NoProgress;
    use crate::record::{ExposureBias, PhotoRecord};
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::tempdir;

    fn bracket(dir: &Path, names: &[&str], start_secs: i64) -> Vec<PhotoRecord> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let path = dir.join(name);
                fs::write(&path, name.as_bytes()).unwrap();
                let t = Utc.timestamp_opt(start_secs, 0).unwrap() + Duration::milliseconds(i as i64 * 300);
                PhotoRecord::new(path, t, ExposureBias::ev(i as i32 - 1))
            })
            .collect()
    }

    #[test]
    fn test_relocate_moves_members_into_folders() {
        let dir = tempdir().unwrap();
        let mut records = bracket(dir.path(), &["a.nef", "b.nef", "c.nef"], 1000);
        records.extend(bracket(dir.path(), &["d.nef", "e.nef", "f.nef"], 2000));
        let sets = partition(records).sets;

        let mut progress = RecordingProgress::default();
        let report = relocate(dir.path(), &sets, &mut progress);

        assert_eq!(report.moved.len(), 6);
        assert!(report.failures.is_empty());
        assert!(dir.path().join("HDR_01").join("a.nef").is_file());
        assert!(dir.path().join("HDR_02").join("f.nef").is_file());
        assert!(!dir.path().join("a.nef").exists());
        assert_eq!(
            progress.events,
            vec![
                (Stage::Moving, "start:2".to_string()),
                (Stage::Moving, "HDR_01".to_string()),
                (Stage::Moving, "HDR_02".to_string()),
                (Stage::Moving, "finish".to_string()),
            ]
        );
    }

    #[test]
    fn test_existing_folder_is_reused() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("HDR_01")).unwrap();
        fs::write(dir.path().join("HDR_01").join("keep.txt"), b"old").unwrap();
        let sets = partition(bracket(dir.path(), &["a.nef", "b.nef", "c.nef"], 1000)).sets;

        let report = relocate(dir.path(), &sets, &mut NoProgress);

        assert_eq!(report.moved.len(), 3);
        assert!(dir.path().join("HDR_01").join("keep.txt").is_file());
    }

    #[test]
    fn test_failures_are_per_file() {
        let dir = tempdir().unwrap();
        let sets = partition(bracket(dir.path(), &["a.nef", "b.nef", "c.nef"], 1000)).sets;
        fs::remove_file(dir.path().join("b.nef")).unwrap();

        let report = relocate(dir.path(), &sets, &mut NoProgress);

        assert_eq!(report.moved.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].filename, "b.nef");
        assert_eq!(report.failures[0].folder_name, "HDR_01");
    }

    #[test]
    fn test_move_never_overwrites() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.nef");
        let target = dir.path().join("b.nef");
        fs::write(&source, b"new").unwrap();
        fs::write(&target, b"old").unwrap();

        let err = move_file(&source, &target).unwrap_err();

        assert!(matches!(err, MoveError::DestinationExists(_)));
        assert_eq!(fs::read(&target).unwrap(), b"old");
        assert!(source.exists());
    }

    #[test]
    fn test_uncreatable_folder_fails_whole_set() {
        let dir = tempdir().unwrap();
        let sets = partition(bracket(dir.path(), &["a.nef", "b.nef", "c.nef"], 1000)).sets;
        // a plain file squatting on the folder name
        fs::write(dir.path().join("HDR_01"), b"").unwrap();

        let report = relocate(dir.path(), &sets, &mut NoProgress);

        assert!(report.moved.is_empty());
        assert_eq!(report.failures.len(), 3);
        assert!(dir.path().join("a.nef").exists());
    }

    #[test]
    fn test_io_error_kind_mapping() {
        let err = MoveError::from(io::Error::new(io::ErrorKind::PermissionDenied, "ro"));
        assert!(matches!(err, MoveError::PermissionDenied(_)));
        let err = MoveError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(matches!(err, MoveError::Io(_)));
    }
}
