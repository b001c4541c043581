//! Run configuration (config.json in the private working area).
//!
//! JSON shape:
//! {
//!   "target_columns": "title/body",    // '/'-separated source columns shown to annotators
//!   "label_format": "pos/neg/neu",     // label-format grammar
//!   "annotations_per_text": 2,         // slots per row (k)
//!   "voting_policy": "majority"        // optional, defaults to majority
//! }
//!
//! Written once at setup and never changed afterwards. Sessions load it into
//! an immutable `RunConfig`.

use crate::error::{Error, Result};
use crate::label::LabelFormat;
use crate::vote::{self, POLICY_NAMES, VotingPolicy};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_policy() -> String {
    "majority".to_string()
}

/// config.json as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawConfig {
    pub target_columns: String,
    pub label_format: String,
    pub annotations_per_text: usize,
    #[serde(default = "default_policy")]
    pub voting_policy: String,
}

/// Validated, immutable run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub target_columns: Vec<String>,
    pub label_format: LabelFormat,
    /// Slots per row (`annotations_per_text`).
    pub quota: usize,
    pub voting_policy: String,
}

impl RawConfig {
    pub fn validate_and_build(&self) -> Result<RunConfig> {
        let target_columns: Vec<String> = self
            .target_columns
            .split('/')
            .map(str::to_string)
            .collect();
        if target_columns.iter().any(|c| c.is_empty()) {
            return Err(Error::usage(format!(
                "target columns '{}' contain an empty column name",
                self.target_columns
            )));
        }

        let label_format = LabelFormat::from_grammar(&self.label_format)?;

        if self.annotations_per_text < 1 {
            return Err(Error::usage("annotations per text must be at least 1"));
        }

        let policy = vote::policy_by_name(&self.voting_policy).ok_or_else(|| {
            Error::usage(format!(
                "unknown voting policy '{}' (known: {})",
                self.voting_policy,
                POLICY_NAMES.join(", ")
            ))
        })?;
        if !policy.supports(&label_format) {
            return Err(Error::usage(format!(
                "voting policy '{}' cannot reduce '{}' labels",
                policy.name(),
                label_format
            )));
        }

        Ok(RunConfig {
            target_columns,
            label_format,
            quota: self.annotations_per_text,
            voting_policy: self.voting_policy.clone(),
        })
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::storage(path, e))?;
        let raw: RawConfig = serde_json::from_str(&text)
            .map_err(|e| Error::corrupt(path, format!("unreadable config: {}", e)))?;
        raw.validate_and_build()
    }

    pub fn to_raw(&self) -> RawConfig {
        RawConfig {
            target_columns: self.target_columns.join("/"),
            label_format: self.label_format.to_string(),
            annotations_per_text: self.quota,
            voting_policy: self.voting_policy.clone(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.to_raw())?;
        fs::write(path, text).map_err(|e| Error::storage(path, e))
    }

    /// The configured policy. Validated at build time, so always known.
    pub fn policy(&self) -> Box<dyn VotingPolicy> {
        vote::policy_by_name(&self.voting_policy).unwrap_or_else(|| Box::new(vote::Majority))
    }
}
