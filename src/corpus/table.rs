//! CSV codec for the source table and the annotated corpus.
//!
//! Annotated header layout for k = 2:
//!   <source columns...>, Annotation_1, Annotator_1, Annotation_2, Annotator_2
//!
//! Every cell is text. Unfilled cells hold the literal `pending`.

use crate::corpus::columns::{PENDING, annotation_column, annotator_column, is_slot_column};
use crate::corpus::row::{Corpus, Slot};
use crate::error::{Error, Result};

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// An unannotated source table, as given to setup.
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub columns: Vec<String>,
    pub records: Vec<Vec<String>>,
}

pub fn read_source(path: &Path) -> Result<SourceTable> {
    let file = File::open(path).map_err(|e| Error::storage(path, e))?;
    let mut reader = csv::Reader::from_reader(file);

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(record.iter().map(str::to_string).collect());
    }

    Ok(SourceTable { columns, records })
}

/// Read an annotated corpus with `quota` slots per row.
pub fn read_corpus(path: &Path, quota: usize) -> Result<Corpus> {
    let file = File::open(path).map_err(|e| Error::storage(path, e))?;
    let mut reader = csv::Reader::from_reader(file);
    let headers = reader.headers()?.clone();

    let mut index: BTreeMap<&str, usize> = BTreeMap::new();
    for (pos, name) in headers.iter().enumerate() {
        if index.insert(name, pos).is_some() {
            return Err(Error::corrupt(path, format!("duplicate column '{}'", name)));
        }
    }

    // Column positions of (label, annotator) for each slot.
    let mut slot_positions: Vec<(usize, usize)> = Vec::with_capacity(quota);
    for slot in 0..quota {
        let label_col = annotation_column(slot);
        let annotator_col = annotator_column(slot);
        match (index.get(label_col.as_str()), index.get(annotator_col.as_str())) {
            (Some(&l), Some(&a)) => slot_positions.push((l, a)),
            _ => {
                return Err(Error::corrupt(
                    path,
                    format!("missing column {} or {}", label_col, annotator_col),
                ));
            }
        }
    }

    let mut data_positions: Vec<usize> = Vec::new();
    let mut columns: Vec<String> = Vec::new();
    for (pos, name) in headers.iter().enumerate() {
        if slot_positions.iter().any(|&(l, a)| l == pos || a == pos) {
            continue;
        }
        if is_slot_column(name) {
            return Err(Error::corrupt(
                path,
                format!(
                    "column '{}' does not belong to any of the {} configured slots",
                    name, quota
                ),
            ));
        }
        data_positions.push(pos);
        columns.push(name.to_string());
    }

    let mut corpus = Corpus::new(columns, quota);
    for record in reader.records() {
        let record = record?;
        let fields = data_positions
            .iter()
            .map(|&pos| record.get(pos).unwrap_or_default().to_string())
            .collect();
        let id = corpus.push_pending(fields);
        if let Some(row) = corpus.row_mut(id) {
            for (slot, &(l, a)) in row.slots.iter_mut().zip(&slot_positions) {
                *slot = Slot {
                    label: cell(record.get(l)),
                    annotator: cell(record.get(a)),
                };
            }
        }
    }

    Ok(corpus)
}

fn cell(raw: Option<&str>) -> Option<String> {
    raw.filter(|s| *s != PENDING).map(str::to_string)
}

/// Serialize the whole corpus, header first.
pub fn write_corpus<W: Write>(corpus: &Corpus, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header: Vec<String> = corpus.columns.clone();
    for slot in 0..corpus.quota() {
        header.push(annotation_column(slot));
        header.push(annotator_column(slot));
    }
    writer.write_record(&header)?;

    for row in &corpus.rows {
        let mut record: Vec<&str> = row.fields.iter().map(String::as_str).collect();
        for slot in &row.slots {
            record.push(slot.label.as_deref().unwrap_or(PENDING));
            record.push(slot.annotator.as_deref().unwrap_or(PENDING));
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
