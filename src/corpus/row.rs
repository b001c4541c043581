use std::collections::BTreeMap;
use std::fmt;

/// Position of a row in the corpus. Stable for the lifetime of a corpus.
pub type RowId = usize;

/// One annotation slot. `None` stands for the `pending` sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slot {
    pub annotator: Option<String>,
    pub label: Option<String>,
}

impl Slot {
    pub fn filled(annotator: &str, label: &str) -> Self {
        Self {
            annotator: Some(annotator.to_string()),
            label: Some(label.to_string()),
        }
    }

    /// Both cells unfilled. Only pending slots may be written.
    pub fn is_pending(&self) -> bool {
        self.annotator.is_none() && self.label.is_none()
    }

    pub fn is_filled(&self) -> bool {
        self.annotator.is_some() && self.label.is_some()
    }

    pub fn annotated_by(&self, user: &str) -> bool {
        self.annotator.as_deref() == Some(user)
    }
}

/// A source row plus its `k` annotation slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: RowId,
    /// Source cells, aligned with `Corpus::columns`.
    pub fields: Vec<String>,
    pub slots: Vec<Slot>,
}

impl Row {
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Slot::is_filled)
    }

    /// Slot index already holding `user`, if any.
    pub fn slot_of(&self, user: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.annotated_by(user))
    }

    /// The `k` label cells in slot order, once every slot is filled.
    pub fn labels(&self) -> Option<Vec<&str>> {
        if !self.is_complete() {
            return None;
        }
        Some(self.slots.iter().filter_map(|s| s.label.as_deref()).collect())
    }
}

/// In-memory copy of the persisted table.
///
/// A Corpus held by a session is a disposable snapshot; only the store
/// writes rows back to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    quota: usize,
}

impl Corpus {
    pub fn new(columns: Vec<String>, quota: usize) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            quota,
        }
    }

    /// Append a source row with all `k` slots pending.
    pub fn push_pending(&mut self, fields: Vec<String>) -> RowId {
        let id = self.rows.len();
        self.rows.push(Row {
            id,
            fields,
            slots: vec![Slot::default(); self.quota],
        });
        id
    }

    /// Number of slots per row (`annotations_per_text`).
    pub fn quota(&self) -> usize {
        self.quota
    }

    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.rows.get(id)
    }

    pub(crate) fn row_mut(&mut self, id: RowId) -> Option<&mut Row> {
        self.rows.get_mut(id)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Check the per-row invariants a concurrent-write accident could break.
    pub fn audit(&self) -> Vec<Finding> {
        let mut findings = Vec::new();
        for row in &self.rows {
            let mut by_annotator: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
            for (idx, slot) in row.slots.iter().enumerate() {
                if !slot.is_pending() && !slot.is_filled() {
                    findings.push(Finding::HalfFilled {
                        row: row.id,
                        slot: idx,
                    });
                }
                if let Some(user) = slot.annotator.as_deref() {
                    by_annotator.entry(user).or_default().push(idx);
                }
            }
            for (user, slots) in by_annotator {
                if slots.len() > 1 {
                    findings.push(Finding::DuplicateAnnotator {
                        row: row.id,
                        annotator: user.to_string(),
                        slots,
                    });
                }
            }
        }
        findings
    }
}

/// An integrity problem found by `Corpus::audit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// The same user occupies several slots of one row.
    DuplicateAnnotator {
        row: RowId,
        annotator: String,
        slots: Vec<usize>,
    },
    /// Exactly one of the slot's two cells is `pending`.
    HalfFilled { row: RowId, slot: usize },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::DuplicateAnnotator {
                row,
                annotator,
                slots,
            } => {
                let slots: Vec<String> = slots.iter().map(|s| (s + 1).to_string()).collect();
                write!(
                    f,
                    "row {}: '{}' annotated slots {}",
                    row,
                    annotator,
                    slots.join(", ")
                )
            }
            Finding::HalfFilled { row, slot } => {
                write!(f, "row {}: slot {} is only half written", row, slot + 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn corpus_with_slots(slots: Vec<Slot>) -> Corpus {
        let mut corpus = Corpus::new(vec!["text".into()], slots.len());
        corpus.push_pending(vec!["hello".into()]);
        corpus.rows[0].slots = slots;
        corpus
    }

    #[test]
    fn new_rows_have_quota_pending_slots() {
        let mut corpus = Corpus::new(vec!["text".into()], 3);
        let id = corpus.push_pending(vec!["a".into()]);
        let row = corpus.row(id).unwrap();
        assert_eq!(row.slots.len(), 3);
        assert!(row.slots.iter().all(Slot::is_pending));
        assert!(!row.is_complete());
        assert_eq!(row.labels(), None);
    }

    #[test]
    fn complete_row_exposes_labels_in_slot_order() {
        let corpus = corpus_with_slots(vec![Slot::filled("ana", "yes"), Slot::filled("bo", "no")]);
        let row = &corpus.rows[0];
        assert!(row.is_complete());
        assert_eq!(row.labels(), Some(vec!["yes", "no"]));
        assert_eq!(row.slot_of("bo"), Some(1));
        assert!(corpus.audit().is_empty());
    }

    #[test]
    fn audit_reports_duplicates_and_half_written_slots() {
        let corpus = corpus_with_slots(vec![
            Slot::filled("ana", "yes"),
            Slot::filled("ana", "no"),
            Slot {
                annotator: Some("bo".into()),
                label: None,
            },
        ]);
        assert_eq!(
            corpus.audit(),
            vec![
                Finding::HalfFilled { row: 0, slot: 2 },
                Finding::DuplicateAnnotator {
                    row: 0,
                    annotator: "ana".into(),
                    slots: vec![0, 1],
                },
            ]
        );
    }
}
