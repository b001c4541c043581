use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures that end a command or session.
///
/// Conflicting commits and invalid label entries are not errors: they are
/// recovered locally and surface as `CommitOutcome::Conflict` and
/// `Parsed::Invalid` respectively.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration; the session never starts.
    #[error("usage error: {0}")]
    Usage(String),
    #[error("storage failure at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not lock {path} within {waited:?}; another session is holding it")]
    LockTimeout { path: PathBuf, waited: Duration },
    #[error("{path} is not a valid annotation file: {details}")]
    Corrupt { path: PathBuf, details: String },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn usage(msg: impl Into<String>) -> Self {
        Error::Usage(msg.into())
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Storage {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        Error::Corrupt {
            path: path.into(),
            details: details.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
