//! Corpus store: the only writer of the persisted corpus.
//!
//! Readers take snapshots without locking; every write replaces the canonical
//! file by renaming a fully written temp file over it, so a snapshot always
//! sees one whole version of the table.
//!
//! A commit is a read-modify-write of the whole table under the lock:
//! 1) acquire the lock (bounded wait)
//! 2) re-read the canonical file, not the caller's snapshot
//! 3) re-validate the target slot against what is on disk now
//! 4) write the private backup, then the canonical file
//!
//! Step 3 is what turns a stale snapshot into a `Conflict` instead of a lost
//! update. The canonical rename is the last write, so any failure up to it
//! leaves the canonical file unchanged.

use crate::corpus::lock::CorpusLock;
use crate::corpus::row::{Corpus, RowId, Slot};
use crate::corpus::table;
use crate::error::{Error, Result};
use crate::label::Value;

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// The persisted corpus moved since the caller's snapshot; nothing was written.
    Conflict(ConflictReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    /// The slot is no longer pending.
    SlotTaken { by: Option<String> },
    /// The annotator already holds another slot of this row.
    AlreadyAnnotated { slot: usize },
    /// The row no longer exists in the persisted corpus.
    RowMissing,
}

#[derive(Debug, Clone)]
pub struct CorpusStore {
    corpus_path: PathBuf,
    backup_path: PathBuf,
    lock_path: PathBuf,
    quota: usize,
    lock_timeout: Duration,
}

impl CorpusStore {
    pub fn new(
        corpus_path: impl Into<PathBuf>,
        backup_path: impl Into<PathBuf>,
        lock_path: impl Into<PathBuf>,
        quota: usize,
    ) -> Self {
        Self {
            corpus_path: corpus_path.into(),
            backup_path: backup_path.into(),
            lock_path: lock_path.into(),
            quota,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn corpus_path(&self) -> &Path {
        &self.corpus_path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Point-in-time copy of the persisted corpus.
    pub fn snapshot(&self) -> Result<Corpus> {
        let corpus = table::read_corpus(&self.corpus_path, self.quota)?;
        debug!(rows = corpus.rows.len(), "corpus snapshot taken");
        Ok(corpus)
    }

    /// Fill slot `slot` of row `row` with `(annotator, label)`.
    ///
    /// Returns `Conflict` rather than overwriting when the slot was filled, or
    /// the annotator placed in another slot of the row, after the caller's
    /// snapshot. On `Committed` the canonical file and the backup are both on
    /// disk.
    pub fn commit(
        &self,
        row: RowId,
        slot: usize,
        annotator: &str,
        label: &Value,
    ) -> Result<CommitOutcome> {
        if slot >= self.quota {
            return Err(Error::usage(format!(
                "slot {} is out of range for {} annotations per text",
                slot + 1,
                self.quota
            )));
        }

        let _lock = CorpusLock::acquire(&self.lock_path, self.lock_timeout)?;
        let mut current = table::read_corpus(&self.corpus_path, self.quota)?;

        let Some(target) = current.row_mut(row) else {
            return Ok(CommitOutcome::Conflict(ConflictReason::RowMissing));
        };
        if !target.slots[slot].is_pending() {
            return Ok(CommitOutcome::Conflict(ConflictReason::SlotTaken {
                by: target.slots[slot].annotator.clone(),
            }));
        }
        if let Some(existing) = target.slot_of(annotator) {
            return Ok(CommitOutcome::Conflict(ConflictReason::AlreadyAnnotated {
                slot: existing,
            }));
        }

        target.slots[slot] = Slot::filled(annotator, &label.to_string());

        self.persist(&current)?;
        info!(row, slot = slot + 1, annotator, "annotation committed");
        Ok(CommitOutcome::Committed)
    }

    /// Replace the persisted corpus wholesale. Used once, at setup.
    pub fn initialize(&self, corpus: &Corpus) -> Result<()> {
        let _lock = CorpusLock::acquire(&self.lock_path, self.lock_timeout)?;
        self.persist(corpus)
    }

    fn persist(&self, corpus: &Corpus) -> Result<()> {
        write_atomically(&self.backup_path, corpus)?;
        write_atomically(&self.corpus_path, corpus)
    }
}

/// Write to a temp file next to `path`, fsync, rename over `path`, then fsync
/// the directory so the rename itself survives a crash.
fn write_atomically(path: &Path, corpus: &Corpus) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::storage(dir, e))?;
    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        table::write_corpus(corpus, &mut out)?;
        out.flush().map_err(|e| Error::storage(path, e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| Error::storage(path, e))?;
    tmp.persist(path).map_err(|e| Error::storage(path, e.error))?;
    sync_dir(dir)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    std::fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| Error::storage(dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
