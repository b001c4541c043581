//! Collaborative corpus annotation over a shared CSV file.
//!
//! Independent sessions, one per human annotator and each its own process,
//! coordinate only through the persisted corpus: each takes a snapshot, picks
//! a row nobody has labelled in the current round, asks for a label and
//! commits it under an inter-process lock that re-checks the target slot.

pub mod config;
pub mod corpus;
pub mod error;
pub mod label;
pub mod logging;
pub mod select;
pub mod session;
pub mod status;
pub mod vote;
pub mod workspace;

pub use config::{RawConfig, RunConfig};
pub use corpus::{CommitOutcome, ConflictReason, Corpus, CorpusStore, Row, Slot};
pub use error::{Error, Result};
pub use label::{LabelFormat, Parsed, Value};
pub use session::{Outcome, Prompter, Session, SessionReport};
pub use status::Progress;
pub use workspace::{SetupRequest, Workspace};
