//! Completion statistics over a corpus snapshot.

use crate::corpus::Corpus;

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "ProgressReport")]
pub struct Progress {
    pub rows: usize,
    pub complete_rows: usize,
    pub filled_slots: usize,
    pub total_slots: usize,
}

/// Serialized form of `Progress`: the counts plus the derived percentage.
#[derive(Serialize)]
struct ProgressReport {
    rows: usize,
    complete_rows: usize,
    filled_slots: usize,
    total_slots: usize,
    percentage: f64,
}

impl From<Progress> for ProgressReport {
    fn from(p: Progress) -> Self {
        Self {
            rows: p.rows,
            complete_rows: p.complete_rows,
            filled_slots: p.filled_slots,
            total_slots: p.total_slots,
            percentage: p.percentage(),
        }
    }
}

impl Progress {
    pub fn of(corpus: &Corpus) -> Self {
        let mut filled_slots = 0;
        let mut complete_rows = 0;
        for row in &corpus.rows {
            filled_slots += row.slots.iter().filter(|s| s.label.is_some()).count();
            if row.is_complete() {
                complete_rows += 1;
            }
        }
        Self {
            rows: corpus.rows.len(),
            complete_rows,
            filled_slots,
            total_slots: corpus.rows.len() * corpus.quota(),
        }
    }

    /// Share of filled label slots, in percent. An empty corpus counts as done.
    pub fn percentage(&self) -> f64 {
        if self.total_slots == 0 {
            return 100.0;
        }
        self.filled_slots as f64 / self.total_slots as f64 * 100.0
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The corpus is {:.1}% annotated ({} of {} annotations, {} of {} texts complete)",
            self.percentage(),
            self.filled_slots,
            self.total_slots,
            self.complete_rows,
            self.rows
        )
    }
}
