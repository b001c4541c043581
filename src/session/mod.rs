//! One user's annotation session.
//!
//! States:
//!   START -> instructions -> Snapshot -> Select -> Prompt -> Commit -> Snapshot ...
//!
//! - Select with nothing left for the user ends the session (`Exhausted`).
//! - An invalid entry re-prompts for the same task; no new snapshot.
//! - The empty entry ends the session (`Exited`) without committing.
//! - A conflicting commit goes back to Snapshot and selects again. It is
//!   counted and logged, never reported to the user as an error.
//!
//! Terminal I/O lives behind `Prompter` so the machine can be driven by a
//! script in tests.

pub mod console;

pub use console::ConsolePrompter;

use crate::config::RunConfig;
use crate::corpus::{CommitOutcome, Corpus, CorpusStore, PENDING, RowId};
use crate::error::{Error, Result};
use crate::label::{self, LabelFormat, Parsed, Value};
use crate::select::{self, Assignment};

use rand::Rng;
use tracing::{debug, info, warn};

/// What the annotator is shown for one assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub row: RowId,
    pub slot: usize,
    /// (column, text) for every target column, in configured order.
    pub fields: Vec<(String, String)>,
}

/// Terminal side of a session.
pub trait Prompter {
    fn instructions(&mut self, text: &str) -> Result<()>;
    fn present(&mut self, task: &Task) -> Result<()>;
    /// One raw entry, without its line terminator.
    fn read_entry(&mut self, format: &LabelFormat) -> Result<String>;
    fn invalid(&mut self, format: &LabelFormat) -> Result<()>;
    fn finished(&mut self, report: &SessionReport) -> Result<()>;
}

impl<P: Prompter + ?Sized> Prompter for &mut P {
    fn instructions(&mut self, text: &str) -> Result<()> {
        (**self).instructions(text)
    }

    fn present(&mut self, task: &Task) -> Result<()> {
        (**self).present(task)
    }

    fn read_entry(&mut self, format: &LabelFormat) -> Result<String> {
        (**self).read_entry(format)
    }

    fn invalid(&mut self, format: &LabelFormat) -> Result<()> {
        (**self).invalid(format)
    }

    fn finished(&mut self, report: &SessionReport) -> Result<()> {
        (**self).finished(report)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The user entered the empty label.
    Exited,
    /// Every row the user can still contribute to is done.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub user: String,
    pub committed: usize,
    pub conflicts: usize,
    pub invalid_entries: usize,
    pub outcome: Outcome,
}

enum State {
    Snapshot,
    Select(Corpus),
    Prompt(Corpus, Assignment),
    Commit(Assignment, Value),
    Done(Outcome),
}

pub struct Session<'a, P, R> {
    user: String,
    config: &'a RunConfig,
    store: &'a CorpusStore,
    instructions: String,
    prompter: P,
    rng: R,
}

impl<'a, P: Prompter, R: Rng> Session<'a, P, R> {
    /// Validates the user identity; a missing one is a usage error.
    pub fn new(
        user: &str,
        config: &'a RunConfig,
        store: &'a CorpusStore,
        prompter: P,
        rng: R,
    ) -> Result<Self> {
        let user = user.trim();
        if user.is_empty() {
            return Err(Error::usage(
                "please say who you are with '--user YOUR_NAME'",
            ));
        }
        if user == PENDING {
            return Err(Error::usage(format!("'{}' cannot be used as a user name", PENDING)));
        }
        Ok(Self {
            user: user.to_string(),
            config,
            store,
            instructions: String::new(),
            prompter,
            rng,
        })
    }

    pub fn with_instructions(mut self, text: impl Into<String>) -> Self {
        self.instructions = text.into();
        self
    }

    pub fn run(mut self) -> Result<SessionReport> {
        let mut report = SessionReport {
            user: self.user.clone(),
            committed: 0,
            conflicts: 0,
            invalid_entries: 0,
            outcome: Outcome::Exited,
        };
        info!(user = %self.user, "annotation session started");
        self.prompter.instructions(&self.instructions)?;

        let mut state = State::Snapshot;
        loop {
            state = match state {
                State::Snapshot => State::Select(self.store.snapshot()?),
                State::Select(corpus) => {
                    match select::select(&corpus, &self.user, &mut self.rng) {
                        Some(assignment) => State::Prompt(corpus, assignment),
                        None => State::Done(Outcome::Exhausted),
                    }
                }
                State::Prompt(corpus, assignment) => {
                    let task = self.task(&corpus, assignment)?;
                    self.ask(&task, &mut report)?
                        .map(|value| State::Commit(assignment, value))
                        .unwrap_or(State::Done(Outcome::Exited))
                }
                State::Commit(assignment, value) => {
                    match self.store.commit(
                        assignment.row,
                        assignment.slot,
                        &self.user,
                        &value,
                    )? {
                        CommitOutcome::Committed => report.committed += 1,
                        CommitOutcome::Conflict(reason) => {
                            report.conflicts += 1;
                            warn!(
                                user = %self.user,
                                row = assignment.row,
                                slot = assignment.slot + 1,
                                ?reason,
                                "commit conflict; selecting again"
                            );
                        }
                    }
                    State::Snapshot
                }
                State::Done(outcome) => {
                    report.outcome = outcome;
                    break;
                }
            };
        }

        info!(
            user = %report.user,
            committed = report.committed,
            conflicts = report.conflicts,
            outcome = ?report.outcome,
            "annotation session finished"
        );
        self.prompter.finished(&report)?;
        Ok(report)
    }

    /// Present the task until the entry parses. None means the user left.
    fn ask(&mut self, task: &Task, report: &mut SessionReport) -> Result<Option<Value>> {
        let format = &self.config.label_format;
        loop {
            self.prompter.present(task)?;
            let raw = self.prompter.read_entry(format)?;
            match label::parse(format, &raw) {
                Parsed::Value(value) => return Ok(Some(value)),
                Parsed::Exit => return Ok(None),
                Parsed::Invalid => {
                    report.invalid_entries += 1;
                    debug!(user = %self.user, entry = %raw, "invalid label entry");
                    self.prompter.invalid(format)?;
                }
            }
        }
    }

    fn task(&self, corpus: &Corpus, assignment: Assignment) -> Result<Task> {
        let row = corpus.row(assignment.row).ok_or_else(|| {
            Error::corrupt(
                self.store.corpus_path(),
                format!("selected row {} is missing", assignment.row),
            )
        })?;

        let mut fields = Vec::with_capacity(self.config.target_columns.len());
        for column in &self.config.target_columns {
            let idx = corpus.column_index(column).ok_or_else(|| {
                Error::corrupt(
                    self.store.corpus_path(),
                    format!("target column '{}' is missing", column),
                )
            })?;
            fields.push((column.clone(), row.fields[idx].clone()));
        }

        Ok(Task {
            row: assignment.row,
            slot: assignment.slot,
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawConfig;
    use crate::corpus::Slot;
    use crate::workspace::{SetupRequest, Workspace};
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::VecDeque;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    /// Replays canned entries and records what was shown.
    #[derive(Default)]
    struct Script {
        entries: VecDeque<String>,
        presented: Vec<Task>,
        invalid_notices: usize,
        /// Runs right before the entry at this index is handed out.
        before_entry: Option<(usize, Box<dyn FnMut(&Task)>)>,
        reads: usize,
    }

    impl Script {
        fn new(entries: &[&str]) -> Self {
            Self {
                entries: entries.iter().map(|e| e.to_string()).collect(),
                ..Self::default()
            }
        }
    }

    impl Prompter for Script {
        fn instructions(&mut self, _text: &str) -> Result<()> {
            Ok(())
        }

        fn present(&mut self, task: &Task) -> Result<()> {
            self.presented.push(task.clone());
            Ok(())
        }

        fn read_entry(&mut self, _format: &LabelFormat) -> Result<String> {
            if let Some((at, hook)) = self.before_entry.as_mut() {
                if *at == self.reads {
                    let task = self.presented.last().cloned().expect("task presented");
                    hook(&task);
                }
            }
            self.reads += 1;
            Ok(self.entries.pop_front().unwrap_or_default())
        }

        fn invalid(&mut self, _format: &LabelFormat) -> Result<()> {
            self.invalid_notices += 1;
            Ok(())
        }

        fn finished(&mut self, _report: &SessionReport) -> Result<()> {
            Ok(())
        }
    }

    fn setup(rows: &[&str], format: &str, k: usize) -> (TempDir, RunConfig, CorpusStore) {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source.csv");
        let instructions = dir.path().join("instructions.txt");
        let mut csv = String::from("text\n");
        for row in rows {
            csv.push_str(row);
            csv.push('\n');
        }
        fs::write(&source, csv).unwrap();
        fs::write(&instructions, "Be kind.").unwrap();

        let workspace = Workspace::new(dir.path());
        let config = workspace
            .setup(&SetupRequest {
                source,
                config: RawConfig {
                    target_columns: "text".into(),
                    label_format: format.into(),
                    annotations_per_text: k,
                    voting_policy: "majority".into(),
                },
                instructions,
                force: false,
            })
            .unwrap();
        let store = workspace.store(&config);
        (dir, config, store)
    }

    fn run(user: &str, config: &RunConfig, store: &CorpusStore, script: &mut Script) -> SessionReport {
        Session::new(user, config, store, script, StdRng::seed_from_u64(3))
            .unwrap()
            .run()
            .unwrap()
    }

    #[test]
    fn two_users_complete_a_row_then_nothing_is_left() {
        let (_dir, config, store) = setup(&["is this good?"], "yes/no", 2);

        let a = run("A", &config, &store, &mut Script::new(&["yes"]));
        assert_eq!(a.committed, 1);
        assert_eq!(a.outcome, Outcome::Exhausted);
        assert_eq!(
            store.snapshot().unwrap().rows[0].slots[0],
            Slot::filled("A", "yes")
        );

        let b = run("B", &config, &store, &mut Script::new(&["no"]));
        assert_eq!(b.committed, 1);
        let row = store.snapshot().unwrap().rows[0].clone();
        assert_eq!(row.slots[1], Slot::filled("B", "no"));
        assert!(row.is_complete());

        let mut again = Script::new(&["yes"]);
        let a2 = run("A", &config, &store, &mut again);
        assert_eq!(a2.outcome, Outcome::Exhausted);
        assert_eq!(a2.committed, 0);
        assert!(again.presented.is_empty());
    }

    #[test]
    fn empty_entry_ends_the_session_without_writing() {
        for format in ["str", "int", "float", "bool", "pos/neg"] {
            let (_dir, config, store) = setup(&["a", "b"], format, 1);
            let before = store.snapshot().unwrap();

            let report = run("A", &config, &store, &mut Script::new(&[""]));
            assert_eq!(report.outcome, Outcome::Exited);
            assert_eq!(report.committed, 0);
            assert_eq!(store.snapshot().unwrap(), before);
        }
    }

    #[test]
    fn invalid_entries_reprompt_the_same_task() {
        let (_dir, config, store) = setup(&["a", "b", "c"], "pos/neg/neu", 1);

        let mut script = Script::new(&["positive", "meh", "POS", ""]);
        let report = run("A", &config, &store, &mut script);

        assert_eq!(report.invalid_entries, 2);
        assert_eq!(script.invalid_notices, 2);
        assert_eq!(report.committed, 1);
        assert_eq!(report.outcome, Outcome::Exited);
        // Three presentations of one task, then a fresh one.
        assert_eq!(script.presented[0], script.presented[1]);
        assert_eq!(script.presented[1], script.presented[2]);

        let labelled = store.snapshot().unwrap().rows[script.presented[0].row].clone();
        assert_eq!(labelled.slots[0], Slot::filled("A", "pos"));
    }

    #[test]
    fn conflicting_commit_reselects_another_row() {
        let (_dir, config, store) = setup(&["a", "b"], "yes/no", 1);
        let rival = store.clone();

        // Another session fills the very slot A is looking at.
        let mut script = Script::new(&["yes", ""]);
        script.before_entry = Some((
            0,
            Box::new(move |task: &Task| {
                let outcome = rival
                    .commit(task.row, task.slot, "B", &Value::Category("no".into()))
                    .unwrap();
                assert_eq!(outcome, CommitOutcome::Committed);
            }),
        ));

        let report = run("A", &config, &store, &mut script);
        assert_eq!(report.conflicts, 1);
        assert_eq!(report.committed, 0);

        let first = script.presented[0].row;
        let second = script.presented[1].row;
        assert_ne!(first, second);

        let corpus = store.snapshot().unwrap();
        assert_eq!(corpus.rows[first].slots[0], Slot::filled("B", "no"));
        assert!(corpus.rows[second].slots[0].is_pending());
    }

    #[test]
    fn target_fields_are_presented() {
        let (_dir, config, store) = setup(&["only text"], "str", 1);
        let mut script = Script::new(&["Fine"]);
        run("A", &config, &store, &mut script);

        assert_eq!(
            script.presented,
            vec![Task {
                row: 0,
                slot: 0,
                fields: vec![("text".into(), "only text".into())],
            }]
        );
        assert_eq!(
            store.snapshot().unwrap().rows[0].slots[0],
            Slot::filled("A", "fine")
        );
    }

    #[test]
    fn missing_user_is_a_usage_error() {
        let (_dir, config, store) = setup(&["a"], "str", 1);
        for user in ["", "   ", "pending"] {
            let err = Session::new(
                user,
                &config,
                &store,
                Script::new(&[]),
                StdRng::seed_from_u64(1),
            )
            .err()
            .unwrap();
            assert!(matches!(err, Error::Usage(_)));
        }
    }
}
