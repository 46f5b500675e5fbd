//! The HTTP seam. [`BackupFetcher`] is the one trait in the engine: it
//! issues the backup request against a single source and streams the
//! response body into a sink. The production implementation is
//! [`HttpFetcher`]; tests substitute in-memory fakes.

use std::io::{Read, Write};
use std::time::Duration;

use anyhow::Result;
use thiserror::Error;

use crate::config::SourceEndpoint;

/// Copy granularity for the response body. Backups can be multiple
/// gigabytes, so the body is never buffered whole.
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Minimum plausible size for a backup archive. Odoo instances behind a
/// misconfigured proxy have been seen returning an HTML error page with a
/// 200 status; anything under this is treated as a failed transfer.
pub const MIN_ARTIFACT_BYTES: u64 = 1024;

/// Why one fetch attempt failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("streaming backup body: {0}")]
    Stream(#[from] std::io::Error),
    #[error("backup file too small: {bytes} bytes")]
    Undersized { bytes: u64 },
}

pub trait BackupFetcher {
    /// POST the backup request for `database` to `source` and stream the
    /// response body into `sink`. Returns the number of bytes written.
    fn fetch(
        &self,
        source: &SourceEndpoint,
        database: &str,
        sink: &mut dyn Write,
    ) -> Result<u64, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// `timeout` bounds each HTTP attempt end to end, body included.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl BackupFetcher for HttpFetcher {
    fn fetch(
        &self,
        source: &SourceEndpoint,
        database: &str,
        sink: &mut dyn Write,
    ) -> Result<u64, FetchError> {
        let url = format!("{}/web/database/backup", source.base_url);
        let form = [
            ("master_pwd", source.credential.as_str()),
            ("name", database),
            ("backup_format", "zip"),
        ];

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .map_err(|e| FetchError::Transport {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        copy_chunked(response, sink)
    }
}

fn copy_chunked(mut body: impl Read, sink: &mut dyn Write) -> Result<u64, FetchError> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;
    loop {
        let n = body.read(&mut buf)?;
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n])?;
        written += n as u64;
    }
    Ok(written)
}
