//! Retention sweeper: deletes a target's expired artifacts.
//!
//! Only regular files directly inside the target's storage directory whose
//! name matches `{prefix}_backup_{database}_*.zip` are candidates; anything
//! else in the directory is left alone no matter how old it is. One file
//! failing to delete does not abort the sweep of the rest.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::fs;

use crate::artifact;
use crate::config::BackupTarget;
use crate::retention::{cutoff_instant, RetentionError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub deleted: usize,
    pub kept: usize,
}

/// Delete artifacts of `target` strictly older than the retention cutoff.
///
/// No-op when the target carries no retention rule or the storage directory
/// does not exist. Idempotent: a second sweep with no new files deletes
/// nothing further.
pub fn sweep(target: &BackupTarget, now: DateTime<Utc>) -> Result<SweepStats, RetentionError> {
    let Some(rule) = &target.retention else {
        return Ok(SweepStats::default());
    };
    if !target.storage_dir.is_dir() {
        return Ok(SweepStats::default());
    }

    let cutoff = cutoff_instant(rule, now)?;
    let mut stats = SweepStats::default();

    let entries = match fs::read_dir(&target.storage_dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(
                "cannot list backup directory {}: {err}",
                target.storage_dir.display()
            );
            return Ok(stats);
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping unreadable directory entry: {err}");
                continue;
            }
        };

        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !artifact::belongs_to_target(name, target) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!("cannot stat {name}: {err}");
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let modified: DateTime<Utc> = match metadata.modified() {
            Ok(modified) => modified.into(),
            Err(err) => {
                warn!("no modification time for {name}: {err}");
                continue;
            }
        };

        if modified < cutoff {
            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    debug!("deleted expired backup {name}");
                    stats.deleted += 1;
                }
                Err(err) => {
                    warn!("could not delete expired backup {name}: {err}");
                    stats.kept += 1;
                }
            }
        } else {
            stats.kept += 1;
        }
    }

    Ok(stats)
}
