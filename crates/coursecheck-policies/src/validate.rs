// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::path::{Path, PathBuf};

use crate::schema::CorpusPolicy;

pub const CONFIG_FILE_NAME: &str = "coursecheck.toml";

const MAX_LIVE_URL_WORKERS: usize = 64;
const MAX_LIVE_URL_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("read config {path} failed: {detail}")]
    Read { path: String, detail: String },
    #[error("parse config {path} failed: {detail}")]
    Parse { path: String, detail: String },
    #[error("invalid config field `{field}`: {detail}")]
    Invalid { field: &'static str, detail: String },
}

#[must_use]
pub fn policy_config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

pub(crate) fn load_policy_from_root(
    root: &Path,
    explicit: Option<&Path>,
) -> Result<CorpusPolicy, PolicyError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default_path = policy_config_path(root);
            if !default_path.is_file() {
                return Ok(CorpusPolicy::default());
            }
            default_path
        }
    };
    let text = fs::read_to_string(&path).map_err(|err| PolicyError::Read {
        path: path.display().to_string(),
        detail: err.to_string(),
    })?;
    toml::from_str(&text).map_err(|err| PolicyError::Parse {
        path: path.display().to_string(),
        detail: err.to_string(),
    })
}

fn require_relative(field: &'static str, value: &str) -> Result<(), PolicyError> {
    if value.trim().is_empty() {
        return Err(PolicyError::Invalid {
            field,
            detail: "must not be empty".to_string(),
        });
    }
    if value.starts_with('/') || value.split('/').any(|segment| segment == "..") {
        return Err(PolicyError::Invalid {
            field,
            detail: format!("`{value}` must be a path below the corpus root"),
        });
    }
    Ok(())
}

pub(crate) fn validate_policy(policy: &CorpusPolicy) -> Result<(), PolicyError> {
    require_relative("book_dir", &policy.book_dir)?;
    require_relative("workflows_dir", &policy.workflows_dir)?;
    require_relative("toc_file", &policy.toc_file)?;
    policy.publish_url_regex()?;
    if !(1..=MAX_LIVE_URL_WORKERS).contains(&policy.live_url_workers) {
        return Err(PolicyError::Invalid {
            field: "live_url_workers",
            detail: format!("must be within 1..={MAX_LIVE_URL_WORKERS}"),
        });
    }
    if !(1..=MAX_LIVE_URL_TIMEOUT_SECS).contains(&policy.live_url_timeout_secs) {
        return Err(PolicyError::Invalid {
            field: "live_url_timeout_secs",
            detail: format!("must be within 1..={MAX_LIVE_URL_TIMEOUT_SECS}"),
        });
    }
    if policy.prompt_languages.iter().any(|lang| lang.trim().is_empty()) {
        return Err(PolicyError::Invalid {
            field: "prompt_languages",
            detail: "entries must not be empty".to_string(),
        });
    }
    if policy.doc_link_marker.trim().is_empty() {
        return Err(PolicyError::Invalid {
            field: "doc_link_marker",
            detail: "must not be empty".to_string(),
        });
    }
    Ok(())
}
