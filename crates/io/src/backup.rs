// Timestamped snapshots taken before a workbook is mutated.
//
// Layout: <dir of file>/backups/<file name>.<YYYYMMDD_HHMMSS>.bak
// Best effort: every failure is logged and reported as None, never raised.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};

/// Name of the sibling directory holding snapshots
pub const BACKUP_DIR: &str = "backups";

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Snapshot `path` now. Returns the backup path, or None when the file does
/// not exist or the copy failed. A snapshot already taken within the same
/// second is kept as is.
pub fn create_backup(path: &Path) -> Option<PathBuf> {
    create_backup_at(path, Local::now().naive_local())
}

/// Snapshot `path` using `now` for the file name stamp
pub fn create_backup_at(path: &Path, now: NaiveDateTime) -> Option<PathBuf> {
    if !path.is_file() {
        log::warn!("Backup skipped, file not found: {}", path.display());
        return None;
    }

    let target = backup_path(path, now)?;
    // The first snapshot of a second is the state before all of its writes
    if target.exists() {
        log::debug!("Backup already taken this second: {}", target.display());
        return Some(target);
    }
    let result = target
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|()| fs::copy(path, &target));

    match result {
        Ok(_) => {
            log::info!("Backup created: {}", target.display());
            Some(target)
        }
        Err(e) => {
            log::error!("Backup of {} failed: {}", path.display(), e);
            None
        }
    }
}

/// Where a snapshot of `path` taken at `now` goes
pub fn backup_path(path: &Path, now: NaiveDateTime) -> Option<PathBuf> {
    let file_name = path.file_name()?.to_string_lossy();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    Some(
        dir.join(BACKUP_DIR)
            .join(format!("{}.{}.bak", file_name, now.format(STAMP_FORMAT))),
    )
}

/// Existing snapshots of `path`, newest first
pub fn list_backups(path: &Path) -> Vec<PathBuf> {
    let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Vec::new();
    };
    let dir = path.parent().unwrap_or_else(|| Path::new(".")).join(BACKUP_DIR);
    let prefix = format!("{}.", file_name);

    let Ok(entries) = fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut backups: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy())
                .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".bak"))
        })
        .collect();
    // Stamps sort lexicographically in time order
    backups.sort();
    backups.reverse();
    backups
}
