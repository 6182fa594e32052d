// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::validate::{load_policy_from_root, validate_policy, PolicyError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
#[non_exhaustive]
pub enum PolicySchemaVersion {
    #[default]
    V1,
}

impl TryFrom<u32> for PolicySchemaVersion {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::V1),
            other => Err(format!("unsupported schema_version {other}, expected 1")),
        }
    }
}

impl From<PolicySchemaVersion> for u32 {
    fn from(value: PolicySchemaVersion) -> Self {
        match value {
            PolicySchemaVersion::V1 => 1,
        }
    }
}

/// Layout of the corpus and tunables of the passes, read from
/// `coursecheck.toml` at the corpus root. Every field has a default that
/// matches the course repository layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorpusPolicy {
    pub schema_version: PolicySchemaVersion,
    /// Directory holding the lesson documents.
    pub book_dir: String,
    /// Directory holding the workflow JSON assets.
    pub workflows_dir: String,
    pub toc_file: String,
    /// Document holding the summary table; defaults to the TOC root.
    pub summary_document: Option<String>,
    /// Text that marks a sticky note as the workflow's documentation link.
    pub doc_link_marker: String,
    pub publish_url_pattern: String,
    /// Code fence languages that mark a block as a documented prompt.
    pub prompt_languages: Vec<String>,
    pub live_url_workers: usize,
    pub live_url_timeout_secs: u64,
    /// URL prefixes the live check never probes.
    pub live_url_allowlist: Vec<String>,
    /// Document id to the workflow file names it presents as examples. A
    /// `[examples]` table in the config replaces the course defaults.
    pub examples: BTreeMap<String, Vec<String>>,
}

/// Lessons of the course that walk through specific workflow exports.
fn course_examples() -> BTreeMap<String, Vec<String>> {
    [
        (
            "04_workflow_examples",
            &[
                "01_prompt_chaining.json",
                "02_routing.json",
                "03_parallelization.json",
            ][..],
        ),
        (
            "05_first_ai_agent",
            &[
                "05_ai_agent_basics_calculator_memory.json",
                "06_ai_agent_tools_wikipedia_calculator.json",
                "07_ai_agent_chat_trigger_memory.json",
            ][..],
        ),
        (
            "appendix_prompt_engineering",
            &["08_prompt_engineering_comparison.json"][..],
        ),
    ]
    .into_iter()
    .map(|(doc, workflows)| {
        (
            doc.to_string(),
            workflows
                .iter()
                .map(|name| (*name).to_string())
                .collect::<Vec<_>>(),
        )
    })
    .collect()
}

impl Default for CorpusPolicy {
    fn default() -> Self {
        Self {
            schema_version: PolicySchemaVersion::V1,
            book_dir: "book".to_string(),
            workflows_dir: "book/_static/workflows".to_string(),
            toc_file: "book/_toc.yml".to_string(),
            summary_document: None,
            doc_link_marker: "Documentation:".to_string(),
            publish_url_pattern: r"^https://[A-Za-z0-9.-]+\.github\.io/".to_string(),
            prompt_languages: vec!["prompt".to_string(), "system-prompt".to_string()],
            live_url_workers: 8,
            live_url_timeout_secs: 10,
            live_url_allowlist: Vec::new(),
            examples: course_examples(),
        }
    }
}

impl CorpusPolicy {
    /// Reads `explicit` when given, else `<root>/coursecheck.toml` when it
    /// exists, else the defaults.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, PolicyError> {
        let policy = load_policy_from_root(root, explicit)?;
        validate_policy(&policy)?;
        Ok(policy)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, PolicyError> {
        let policy: Self = toml::from_str(text).map_err(|err| PolicyError::Parse {
            path: "<inline>".to_string(),
            detail: err.to_string(),
        })?;
        validate_policy(&policy)?;
        Ok(policy)
    }

    pub fn publish_url_regex(&self) -> Result<Regex, PolicyError> {
        Regex::new(&self.publish_url_pattern).map_err(|err| PolicyError::Invalid {
            field: "publish_url_pattern",
            detail: err.to_string(),
        })
    }

    pub fn live_url_timeout(&self) -> Duration {
        Duration::from_secs(self.live_url_timeout_secs)
    }

    pub fn is_prompt_language(&self, language: &str) -> bool {
        self.prompt_languages.iter().any(|lang| lang == language)
    }
}
