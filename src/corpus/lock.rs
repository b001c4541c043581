//! Inter-process exclusive lock with a bounded wait.
//!
//! Sessions are separate processes sharing nothing but the filesystem, so the
//! critical section of a commit is guarded by an advisory lock on a dedicated
//! lock file. Acquisition polls until a deadline; it never blocks forever.

use crate::error::{Error, Result};

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Held exclusive lock. Released on drop.
#[derive(Debug)]
pub struct CorpusLock {
    file: File,
    path: PathBuf,
}

impl CorpusLock {
    /// Acquire the lock at `path`, waiting at most `timeout`.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| Error::storage(path, e))?;

        let started = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    debug!(path = %path.display(), waited = ?started.elapsed(), "corpus lock acquired");
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if is_contended(&e) => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(Error::LockTimeout {
                            path: path.to_path_buf(),
                            waited,
                        });
                    }
                    thread::sleep(LOCK_POLL_INTERVAL.min(timeout - waited));
                }
                Err(e) => return Err(Error::storage(path, e)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CorpusLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!(path = %self.path.display(), error = %e, "corpus lock release failed");
        }
    }
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_holder_times_out_then_succeeds_after_release() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corpus.lock");

        let first = CorpusLock::acquire(&path, Duration::from_millis(100)).unwrap();
        let err = CorpusLock::acquire(&path, Duration::from_millis(60)).unwrap_err();
        match err {
            Error::LockTimeout { waited, .. } => assert!(waited >= Duration::from_millis(60)),
            other => panic!("expected lock timeout, got {other:?}"),
        }

        drop(first);
        let second = CorpusLock::acquire(&path, Duration::from_millis(100)).unwrap();
        assert_eq!(second.path(), path.as_path());
    }
}
