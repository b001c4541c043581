//! Slot column naming.
//!
//! Slot `i` (0-based) is persisted as two columns, `Annotation_{i+1}` and
//! `Annotator_{i+1}`, appended after the source columns in slot order. Other
//! tools read these names directly, so they must not change.

use regex::Regex;
use std::sync::OnceLock;

/// Cell value of an unfilled label or annotator.
pub const PENDING: &str = "pending";

pub fn annotation_column(slot: usize) -> String {
    format!("Annotation_{}", slot + 1)
}

pub fn annotator_column(slot: usize) -> String {
    format!("Annotator_{}", slot + 1)
}

/// True if `name` looks like a slot column for any slot index.
pub fn is_slot_column(name: &str) -> bool {
    static SLOT_COLUMN_RE: OnceLock<Regex> = OnceLock::new();
    SLOT_COLUMN_RE
        .get_or_init(|| {
            Regex::new(r"^Annotat(?:ion|or)_[0-9]+$").expect("slot column pattern is valid")
        })
        .is_match(name)
}
