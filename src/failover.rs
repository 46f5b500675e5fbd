//! Source failover: try a target's sources in operator-assigned priority
//! order, stop at the first success. The order is deliberate configuration
//! ("prefer the local mirror, then the cloud replica"), so it is never
//! re-shuffled or load-balanced here.

use chrono::Local;
use log::{info, warn};
use std::path::PathBuf;
use thiserror::Error;

use crate::artifact;
use crate::config::BackupTarget;
use crate::download::{DownloadFailure, Downloader};

/// Every source for a target exhausted its retries. Reported for the
/// target, never retried at this layer; the next scheduled run is the
/// retry mechanism.
#[derive(Debug, Error)]
#[error("all {count} source(s) for database '{database}' failed", count = .failures.len())]
pub struct AllSourcesFailed {
    pub database: String,
    pub failures: Vec<DownloadFailure>,
}

/// Returns the path of the artifact produced by the first source that
/// succeeds. The destination is computed per source, since the filename
/// embeds the source host and a fresh timestamp.
pub fn backup_with_failover(
    target: &BackupTarget,
    downloader: &Downloader,
) -> Result<PathBuf, AllSourcesFailed> {
    let total = target.sources.len();
    let mut failures = Vec::new();

    for (idx, source) in target.sources.iter().enumerate() {
        info!(
            "trying source {}/{} for '{}': {}",
            idx + 1,
            total,
            target.database,
            source.base_url
        );

        let dest = artifact::destination_path(target, &source.base_url, Local::now());
        match downloader.download(&target.database, source, &dest) {
            Ok(()) => {
                info!("backup of '{}' succeeded from {}", target.database, source.base_url);
                return Ok(dest);
            }
            Err(failure) => {
                warn!("{failure}");
                failures.push(failure);
            }
        }
    }

    Err(AllSourcesFailed {
        database: target.database.clone(),
        failures,
    })
}
