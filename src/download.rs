//! Backup downloader: one source, one database, bounded retries.
//!
//! Each attempt writes to a `.part` file next to the final destination and
//! renames only after the size check passes, so neither the sweeper nor an
//! operator ever sees a half-written archive under the final name. Failed
//! attempts back off 2, 4, 8 seconds before the source is given up on.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;
use thiserror::Error;

use crate::config::SourceEndpoint;
use crate::fetch::{BackupFetcher, FetchError, MIN_ARTIFACT_BYTES};

pub const MAX_ATTEMPTS: u32 = 3;

/// One source exhausted its retry budget. Carries the last underlying
/// error; the failover coordinator moves on to the next source.
#[derive(Debug, Error)]
#[error("source {base_url} failed after {attempts} attempts: {last}")]
pub struct DownloadFailure {
    pub base_url: String,
    pub attempts: u32,
    #[source]
    pub last: FetchError,
}

pub type SleepFn = Box<dyn Fn(Duration)>;

pub struct Downloader<'a> {
    fetcher: &'a dyn BackupFetcher,
    sleep: SleepFn,
}

impl<'a> Downloader<'a> {
    pub fn new(fetcher: &'a dyn BackupFetcher) -> Self {
        Self {
            fetcher,
            sleep: Box::new(std::thread::sleep),
        }
    }

    /// Replace the backoff sleep. Tests use this to record the delays
    /// instead of waiting them out.
    pub fn with_sleep(fetcher: &'a dyn BackupFetcher, sleep: SleepFn) -> Self {
        Self { fetcher, sleep }
    }

    /// Transfer a backup of `database` from `source` into `dest`.
    ///
    /// On success exactly `dest` exists. On failure neither `dest` nor its
    /// `.part` sibling is left behind (partial deletion is best-effort and
    /// only logged).
    pub fn download(
        &self,
        database: &str,
        source: &SourceEndpoint,
        dest: &Path,
    ) -> Result<(), DownloadFailure> {
        let part = part_path(dest);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(database, source, dest, &part) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(
                        "attempt {attempt}/{MAX_ATTEMPTS} from {} failed: {err}",
                        source.base_url
                    );
                    remove_partial(&part);
                    (self.sleep)(Duration::from_secs(1u64 << attempt));
                    if attempt >= MAX_ATTEMPTS {
                        return Err(DownloadFailure {
                            base_url: source.base_url.clone(),
                            attempts: attempt,
                            last: err,
                        });
                    }
                }
            }
        }
    }

    fn attempt(
        &self,
        database: &str,
        source: &SourceEndpoint,
        dest: &Path,
        part: &Path,
    ) -> Result<(), FetchError> {
        if let Some(dir) = part.parent() {
            fs::create_dir_all(dir)?;
        }

        let mut file = fs::File::create(part)?;
        self.fetcher.fetch(source, database, &mut file)?;
        drop(file);

        let bytes = fs::metadata(part)?.len();
        if bytes < MIN_ARTIFACT_BYTES {
            return Err(FetchError::Undersized { bytes });
        }

        fs::rename(part, dest)?;
        Ok(())
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

fn remove_partial(part: &Path) {
    if part.exists() {
        if let Err(err) = fs::remove_file(part) {
            warn!("could not remove partial file {}: {err}", part.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;

    struct ScriptedFetcher {
        /// Payload per call, in order; the last entry repeats.
        bodies: Vec<Result<Vec<u8>, u16>>,
        calls: RefCell<usize>,
    }

    impl ScriptedFetcher {
        fn new(bodies: Vec<Result<Vec<u8>, u16>>) -> Self {
            Self {
                bodies,
                calls: RefCell::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.borrow()
        }
    }

    impl BackupFetcher for ScriptedFetcher {
        fn fetch(
            &self,
            source: &SourceEndpoint,
            _database: &str,
            sink: &mut dyn Write,
        ) -> Result<u64, FetchError> {
            let mut calls = self.calls.borrow_mut();
            let idx = (*calls).min(self.bodies.len() - 1);
            *calls += 1;
            match &self.bodies[idx] {
                Ok(body) => {
                    sink.write_all(body)?;
                    Ok(body.len() as u64)
                }
                Err(status) => Err(FetchError::Status {
                    url: source.base_url.clone(),
                    status: *status,
                }),
            }
        }
    }

    fn source() -> SourceEndpoint {
        SourceEndpoint {
            base_url: "http://erp.test".to_string(),
            credential: "pw".to_string(),
        }
    }

    fn no_sleep() -> SleepFn {
        Box::new(|_| {})
    }

    #[test]
    fn success_leaves_only_the_final_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("backup.zip");
        let fetcher = ScriptedFetcher::new(vec![Ok(vec![1u8; 4096])]);
        let downloader = Downloader::with_sleep(&fetcher, no_sleep());

        downloader.download("prod", &source(), &dest).unwrap();

        assert_eq!(fs::metadata(&dest).unwrap().len(), 4096);
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn retries_then_succeeds() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("backup.zip");
        let fetcher = ScriptedFetcher::new(vec![Err(503), Err(503), Ok(vec![1u8; 2048])]);
        let downloader = Downloader::with_sleep(&fetcher, no_sleep());

        downloader.download("prod", &source(), &dest).unwrap();

        assert_eq!(fetcher.calls(), 3);
        assert!(dest.exists());
    }

    #[test]
    fn exhausted_source_leaves_no_file_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("backup.zip");
        let fetcher = ScriptedFetcher::new(vec![Err(500)]);
        let downloader = Downloader::with_sleep(&fetcher, no_sleep());

        let failure = downloader.download("prod", &source(), &dest).unwrap_err();

        assert_eq!(failure.attempts, MAX_ATTEMPTS);
        assert_eq!(fetcher.calls(), MAX_ATTEMPTS as usize);
        assert!(matches!(failure.last, FetchError::Status { status: 500, .. }));
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn undersized_body_is_a_failed_transfer() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("backup.zip");
        // Server "succeeds" but returns a 200-byte error page every time.
        let fetcher = ScriptedFetcher::new(vec![Ok(vec![b'!'; 200])]);
        let downloader = Downloader::with_sleep(&fetcher, no_sleep());

        let failure = downloader.download("prod", &source(), &dest).unwrap_err();

        assert!(matches!(failure.last, FetchError::Undersized { bytes: 200 }));
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn backoff_escalates_per_attempt() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("backup.zip");
        let fetcher = ScriptedFetcher::new(vec![Err(502)]);

        let sleeps: Rc<RefCell<Vec<Duration>>> = Rc::new(RefCell::new(Vec::new()));
        let recorder = Rc::clone(&sleeps);
        let downloader =
            Downloader::with_sleep(&fetcher, Box::new(move |d| recorder.borrow_mut().push(d)));

        downloader.download("prod", &source(), &dest).unwrap_err();

        assert_eq!(
            *sleeps.borrow(),
            vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8)
            ]
        );
    }
}
