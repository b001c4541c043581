//! Working directory layout and one-time setup.
//!
//! <root>/
//!   annotated_corpus.csv                 shared corpus, read by other tools
//!   .annotation_files/
//!     config.json                        immutable run configuration
//!     instructions.txt                   shown before every session
//!     annotated_corpus_backup.csv        refreshed on every commit
//!     corpus.lock                        commit lock

use crate::config::{RawConfig, RunConfig};
use crate::corpus::table::{self, SourceTable};
use crate::corpus::{Corpus, CorpusStore, is_slot_column};
use crate::error::{Error, Result};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CORPUS_FILE: &str = "annotated_corpus.csv";
pub const PRIVATE_DIR: &str = ".annotation_files";
const CONFIG_FILE: &str = "config.json";
const INSTRUCTIONS_FILE: &str = "instructions.txt";
const BACKUP_FILE: &str = "annotated_corpus_backup.csv";
const LOCK_FILE: &str = "corpus.lock";

/// Inputs of `Workspace::setup`.
#[derive(Debug, Clone)]
pub struct SetupRequest {
    pub source: PathBuf,
    pub config: RawConfig,
    pub instructions: PathBuf,
    /// Replace an existing setup and discard its annotations.
    pub force: bool,
}

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn corpus_path(&self) -> PathBuf {
        self.root.join(CORPUS_FILE)
    }

    pub fn private_dir(&self) -> PathBuf {
        self.root.join(PRIVATE_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.private_dir().join(CONFIG_FILE)
    }

    pub fn instructions_path(&self) -> PathBuf {
        self.private_dir().join(INSTRUCTIONS_FILE)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.private_dir().join(BACKUP_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.private_dir().join(LOCK_FILE)
    }

    pub fn is_initialized(&self) -> bool {
        self.private_dir().exists() || self.corpus_path().exists()
    }

    pub fn load_config(&self) -> Result<RunConfig> {
        let path = self.config_path();
        if !path.exists() {
            return Err(Error::usage(format!(
                "no setup found in {} (run the setup command first)",
                self.root.display()
            )));
        }
        RunConfig::load(&path)
    }

    pub fn instructions(&self) -> Result<String> {
        let path = self.instructions_path();
        fs::read_to_string(&path).map_err(|e| Error::storage(path, e))
    }

    pub fn store(&self, config: &RunConfig) -> CorpusStore {
        CorpusStore::new(
            self.corpus_path(),
            self.backup_path(),
            self.lock_path(),
            config.quota,
        )
    }

    /// Create the private area and an all-pending corpus from a source table.
    pub fn setup(&self, request: &SetupRequest) -> Result<RunConfig> {
        let config = request.config.validate_and_build()?;
        let source = table::read_source(&request.source)?;
        check_source_columns(&source, &config)?;

        if self.is_initialized() {
            if !request.force {
                return Err(Error::usage(format!(
                    "{} already holds an annotation setup; repeat with --force to erase it \
                     and every annotation made so far",
                    self.root.display()
                )));
            }
            let private = self.private_dir();
            if private.exists() {
                fs::remove_dir_all(&private).map_err(|e| Error::storage(&private, e))?;
            }
        }

        let private = self.private_dir();
        fs::create_dir_all(&private).map_err(|e| Error::storage(&private, e))?;
        fs::copy(&request.instructions, self.instructions_path())
            .map_err(|e| Error::storage(&request.instructions, e))?;
        config.save(&self.config_path())?;

        let mut corpus = Corpus::new(source.columns, config.quota);
        for record in source.records {
            corpus.push_pending(record);
        }
        self.store(&config).initialize(&corpus)?;

        info!(
            rows = corpus.rows.len(),
            quota = config.quota,
            format = %config.label_format,
            "annotation setup completed"
        );
        Ok(config)
    }
}

fn check_source_columns(source: &SourceTable, config: &RunConfig) -> Result<()> {
    let mut seen = BTreeSet::new();
    if let Some(repeated) = source.columns.iter().find(|c| !seen.insert(c.as_str())) {
        return Err(Error::usage(format!(
            "source column '{}' appears more than once",
            repeated
        )));
    }
    for column in &config.target_columns {
        if !source.columns.contains(column) {
            return Err(Error::usage(format!(
                "target column '{}' is not in the source (columns: {})",
                column,
                source.columns.join(", ")
            )));
        }
    }
    if let Some(clash) = source.columns.iter().find(|c| is_slot_column(c)) {
        return Err(Error::usage(format!(
            "source column '{}' clashes with the annotation slot columns",
            clash
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Slot;
    use pretty_assertions::assert_eq;
    use tempfile::{TempDir, tempdir};

    fn fixture(source_csv: &str) -> (TempDir, Workspace, SetupRequest) {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source.csv");
        let instructions = dir.path().join("instructions.txt");
        fs::write(&source, source_csv).unwrap();
        fs::write(&instructions, "Label the sentiment.").unwrap();

        let workspace = Workspace::new(dir.path().join("work"));
        fs::create_dir_all(workspace.root()).unwrap();
        let request = SetupRequest {
            source,
            config: RawConfig {
                target_columns: "text".into(),
                label_format: "pos/neg".into(),
                annotations_per_text: 2,
                voting_policy: "majority".into(),
            },
            instructions,
            force: false,
        };
        (dir, workspace, request)
    }

    #[test]
    fn setup_writes_config_instructions_corpus_and_backup() {
        let (_dir, workspace, request) = fixture("id,text\n1,great\n2,awful\n");
        let config = workspace.setup(&request).unwrap();

        assert_eq!(workspace.load_config().unwrap(), config);
        assert_eq!(workspace.instructions().unwrap(), "Label the sentiment.");

        let corpus = workspace.store(&config).snapshot().unwrap();
        assert_eq!(corpus.columns, vec!["id", "text"]);
        assert_eq!(corpus.rows.len(), 2);
        assert!(
            corpus
                .rows
                .iter()
                .all(|r| r.slots.iter().all(Slot::is_pending))
        );
        assert!(workspace.backup_path().exists());
    }

    #[test]
    fn second_setup_needs_force() {
        let (_dir, workspace, mut request) = fixture("text\nhello\n");
        let config = workspace.setup(&request).unwrap();
        let store = workspace.store(&config);
        store
            .commit(0, 0, "ana", &crate::label::Value::Category("pos".into()))
            .unwrap();

        assert!(matches!(workspace.setup(&request), Err(Error::Usage(_))));
        assert!(store.snapshot().unwrap().rows[0].slots[0].is_filled());

        request.force = true;
        workspace.setup(&request).unwrap();
        assert!(store.snapshot().unwrap().rows[0].slots[0].is_pending());
    }

    #[test]
    fn setup_validates_source_columns() {
        let (_dir, workspace, request) = fixture("body\nhello\n");
        assert!(matches!(workspace.setup(&request), Err(Error::Usage(_))));
        assert!(!workspace.is_initialized());

        let (_dir, workspace, request) = fixture("text,Annotation_1\nhello,x\n");
        assert!(matches!(workspace.setup(&request), Err(Error::Usage(_))));

        let (_dir, workspace, request) = fixture("text,text\nhello,world\n");
        assert!(matches!(workspace.setup(&request), Err(Error::Usage(_))));
        assert!(!workspace.is_initialized());
    }

    #[test]
    fn missing_setup_is_a_usage_error() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::new(dir.path());
        assert!(matches!(workspace.load_config(), Err(Error::Usage(_))));
    }
}
