//! Voting policies: reduce a complete row's `k` labels to one consensus label.
//!
//! A policy is a capability chosen by name at setup and recorded in
//! config.json. Policies never see incomplete rows.

use crate::corpus::{Corpus, PENDING};
use crate::error::{Error, Result};
use crate::label::{LabelFormat, Value};
use std::io::Write;
use std::path::Path;

pub const CONSENSUS_COLUMN: &str = "Consensus";

pub trait VotingPolicy {
    fn name(&self) -> &'static str;

    /// Whether this policy can reduce values of `format`.
    fn supports(&self, _format: &LabelFormat) -> bool {
        true
    }

    /// Reduce labels (in slot order) to a consensus. None if no consensus is reachable.
    fn reduce(&self, labels: &[Value]) -> Option<Value>;
}

/// Most frequent label; ties go to the label that reached a slot first.
#[derive(Debug, Clone, Copy, Default)]
pub struct Majority;

impl VotingPolicy for Majority {
    fn name(&self) -> &'static str {
        "majority"
    }

    fn reduce(&self, labels: &[Value]) -> Option<Value> {
        let mut tally: Vec<(&Value, usize)> = Vec::new();
        for label in labels {
            match tally.iter_mut().find(|(v, _)| *v == label) {
                Some((_, count)) => *count += 1,
                None => tally.push((label, 1)),
            }
        }

        let mut best: Option<(&Value, usize)> = None;
        for (value, count) in tally {
            if best.is_none_or(|(_, c)| count > c) {
                best = Some((value, count));
            }
        }
        best.map(|(v, _)| v.clone())
    }
}

/// Arithmetic mean of numeric labels.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mean;

impl VotingPolicy for Mean {
    fn name(&self) -> &'static str {
        "mean"
    }

    fn supports(&self, format: &LabelFormat) -> bool {
        format.is_numeric()
    }

    fn reduce(&self, labels: &[Value]) -> Option<Value> {
        if labels.is_empty() {
            return None;
        }
        let mut sum = 0.0f64;
        for label in labels {
            sum += label.as_f64()?;
        }
        Some(Value::Real(sum / labels.len() as f64))
    }
}

/// The shared label when every annotator agrees.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unanimous;

impl VotingPolicy for Unanimous {
    fn name(&self) -> &'static str {
        "unanimous"
    }

    fn reduce(&self, labels: &[Value]) -> Option<Value> {
        let (first, rest) = labels.split_first()?;
        rest.iter().all(|v| v == first).then(|| first.clone())
    }
}

pub const POLICY_NAMES: [&str; 3] = ["majority", "mean", "unanimous"];

pub fn policy_by_name(name: &str) -> Option<Box<dyn VotingPolicy>> {
    match name {
        "majority" => Some(Box::new(Majority)),
        "mean" => Some(Box::new(Mean)),
        "unanimous" => Some(Box::new(Unanimous)),
        _ => None,
    }
}

/// Consensus state of one row.
#[derive(Debug, Clone, PartialEq)]
pub enum Consensus {
    /// Some slot is still pending.
    Incomplete,
    /// Complete, but the policy found no consensus.
    Undecided,
    Agreed(Value),
}

/// Apply `policy` to every row of `corpus`, in row order. `source` is the
/// file the corpus was read from, named when a cell does not decode.
pub fn consensus(
    source: &Path,
    corpus: &Corpus,
    format: &LabelFormat,
    policy: &dyn VotingPolicy,
) -> Result<Vec<Consensus>> {
    let mut out = Vec::with_capacity(corpus.rows.len());
    for row in &corpus.rows {
        let Some(cells) = row.labels() else {
            out.push(Consensus::Incomplete);
            continue;
        };

        let mut values = Vec::with_capacity(cells.len());
        for (slot, cell) in cells.iter().enumerate() {
            let value = Value::decode(format, cell).ok_or_else(|| {
                Error::corrupt(
                    source,
                    format!(
                        "row {} slot {} holds '{}', which is not a '{}' label",
                        row.id,
                        slot + 1,
                        cell,
                        format
                    ),
                )
            })?;
            values.push(value);
        }

        out.push(match policy.reduce(&values) {
            Some(value) => Consensus::Agreed(value),
            None => Consensus::Undecided,
        });
    }
    Ok(out)
}

/// Write the source columns plus a consensus column. Incomplete rows get
/// `pending`; complete rows without consensus get an empty cell.
pub fn write_consensus<W: Write>(corpus: &Corpus, consensus: &[Consensus], out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header: Vec<&str> = corpus.columns.iter().map(String::as_str).collect();
    header.push(CONSENSUS_COLUMN);
    writer.write_record(&header)?;

    for (row, state) in corpus.rows.iter().zip(consensus) {
        let cell = match state {
            Consensus::Incomplete => PENDING.to_string(),
            Consensus::Undecided => String::new(),
            Consensus::Agreed(value) => value.to_string(),
        };
        let mut record: Vec<&str> = row.fields.iter().map(String::as_str).collect();
        record.push(&cell);
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
