//! Corpus layer: the persisted table of rows and annotation slots.
//!
//! This module owns:
//! - slot column naming and the `pending` sentinel (part of the file format)
//! - the in-memory Corpus/Row/Slot model and its integrity audit
//! - the CSV table codec
//! - the store: point-in-time snapshots and lock-guarded commits

pub mod columns;
pub mod lock;
pub mod row;
pub mod store;
pub mod table;

pub use columns::{PENDING, annotation_column, annotator_column, is_slot_column};
pub use row::{Corpus, Finding, Row, RowId, Slot};
pub use store::{CommitOutcome, ConflictReason, CorpusStore};
