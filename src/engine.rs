//! Backup run orchestrator. One pass over the configured targets, in
//! order: sweep expired artifacts, then back up through the failover chain,
//! and record a per-target outcome. One target failing never aborts the
//! rest of the run.

use chrono::Utc;
use log::{error, info, warn};
use std::path::PathBuf;

use crate::config::BackupTarget;
use crate::download::Downloader;
use crate::failover::{self, AllSourcesFailed};
use crate::sweep::{self, SweepStats};

/// When the retention sweep runs relative to the download. The default is
/// sweep-first (free the space before the new archive lands); sweeping
/// after keeps the previous backup around in case the new one fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepOrder {
    #[default]
    BeforeBackup,
    AfterBackup,
}

/// Result of processing one target.
#[derive(Debug)]
pub struct TargetOutcome {
    pub database: String,
    pub artifact: Option<PathBuf>,
    pub failure: Option<AllSourcesFailed>,
    pub sweep: SweepStats,
}

impl TargetOutcome {
    pub fn succeeded(&self) -> bool {
        self.artifact.is_some()
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<TargetOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

pub struct Engine<'a> {
    downloader: Downloader<'a>,
    sweep_order: SweepOrder,
}

impl<'a> Engine<'a> {
    pub fn new(downloader: Downloader<'a>) -> Self {
        Self {
            downloader,
            sweep_order: SweepOrder::default(),
        }
    }

    pub fn sweep_order(mut self, order: SweepOrder) -> Self {
        self.sweep_order = order;
        self
    }

    /// One full pass: every target, sequentially, no early abort.
    pub fn run(&self, targets: &[BackupTarget]) -> RunReport {
        let mut report = RunReport::default();
        for target in targets {
            report.outcomes.push(self.run_target(target));
        }
        report
    }

    fn run_target(&self, target: &BackupTarget) -> TargetOutcome {
        info!(
            "starting backup for '{}' with {} source(s)",
            target.database,
            target.sources.len()
        );

        let mut sweep = SweepStats::default();
        if self.sweep_order == SweepOrder::BeforeBackup {
            sweep = self.sweep_target(target);
        }

        let (artifact, failure) = match failover::backup_with_failover(target, &self.downloader) {
            Ok(path) => {
                info!("backup for '{}' complete: {}", target.database, path.display());
                (Some(path), None)
            }
            Err(err) => {
                error!("{err}");
                (None, Some(err))
            }
        };

        if self.sweep_order == SweepOrder::AfterBackup {
            sweep = self.sweep_target(target);
        }

        TargetOutcome {
            database: target.database.clone(),
            artifact,
            failure,
            sweep,
        }
    }

    fn sweep_target(&self, target: &BackupTarget) -> SweepStats {
        match sweep::sweep(target, Utc::now()) {
            Ok(stats) => {
                if stats.deleted > 0 {
                    info!(
                        "retention sweep for '{}': {} deleted, {} kept",
                        target.database, stats.deleted, stats.kept
                    );
                }
                stats
            }
            // Bad retention config breaks the sweep for this target only;
            // the backup itself still runs.
            Err(err) => {
                warn!("retention sweep for '{}' skipped: {err}", target.database);
                SweepStats::default()
            }
        }
    }
}
