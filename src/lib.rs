//! # Odoo Backup Agent
//!
//! A small sequential backup engine for Odoo databases. Each configured
//! system is reachable through one or more redundant HTTP sources; the agent
//! downloads a fresh backup archive through the first source that works,
//! retrying each source with escalating backoff before failing over to the
//! next, and prunes archives older than the system's retention window.
//!
//! ```text
//! ┌──────────┐   per target   ┌───────────┐   per source   ┌────────────┐
//! │  Engine  │───────────────▶│ Failover  │───────────────▶│ Downloader │
//! │ (run)    │                │ (ordered) │                │ (3 retries)│
//! └────┬─────┘                └───────────┘                └─────┬──────┘
//!      │ sweep before backup                                     │ POST
//!      ▼                                                         ▼
//! ┌──────────┐                                             ┌────────────┐
//! │ Sweeper  │  deletes `{prefix}_backup_{db}_*.zip`       │ /web/data- │
//! │          │  older than the retention cutoff            │ base/backup│
//! └──────────┘                                             └────────────┘
//! ```
//!
//! Everything runs on one thread: one target at a time, one source at a
//! time. The only injection points are the [`fetch::BackupFetcher`] trait
//! (the HTTP seam) and the downloader's backoff sleep, which is all the
//! tests need to drive the engine without a network.

pub mod artifact;
pub mod config;
pub mod download;
pub mod engine;
pub mod failover;
pub mod fetch;
pub mod retention;
pub mod sweep;
