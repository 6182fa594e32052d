// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    EffectDenied {
        effect: &'static str,
        detail: String,
    },
    PathViolation {
        path: PathBuf,
        detail: String,
    },
    Io {
        op: &'static str,
        path: PathBuf,
        detail: String,
    },
    Network {
        url: String,
        detail: String,
    },
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EffectDenied { effect, detail } => {
                write!(f, "effect denied: {effect} ({detail})")
            }
            Self::PathViolation { path, detail } => {
                write!(f, "path violation: {} ({detail})", path.display())
            }
            Self::Io { op, path, detail } => {
                write!(f, "io error: {op} {} ({detail})", path.display())
            }
            Self::Network { url, detail } => write!(f, "network error: {url} ({detail})"),
        }
    }
}

impl std::error::Error for AdapterError {}

/// Joins `target` onto the corpus-relative directory `base_dir` and resolves
/// `.` and `..` lexically. Returns `None` when the result escapes the root.
/// A leading `/` makes `target` relative to the root itself.
pub fn resolve_relative(base_dir: &str, target: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    let joined = if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_string()
    } else if base_dir.is_empty() {
        target.to_string()
    } else {
        format!("{base_dir}/{target}")
    };
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

fn to_corpus_relative(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts = rel
        .components()
        .map(|c| c.as_os_str().to_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

pub trait Fs: Send + Sync {
    fn read_text(&self, root: &Path, path: &Path) -> Result<String, AdapterError>;
    fn exists(&self, root: &Path, path: &Path) -> bool;
    fn is_dir(&self, root: &Path, path: &Path) -> bool;
    /// Every file below `dir`, as sorted corpus-relative paths with forward
    /// slashes. Hidden directories are not entered. A missing `dir` yields
    /// an empty list.
    fn walk_files(&self, root: &Path, dir: &Path) -> Result<Vec<String>, AdapterError>;
}

pub trait Network: Send + Sync {
    /// Issues a liveness probe and returns the final HTTP status code.
    fn probe(&self, url: &str, timeout: Duration) -> Result<u16, AdapterError>;
}

#[derive(Debug, Default)]
pub struct RealFs;

impl Fs for RealFs {
    fn read_text(&self, root: &Path, path: &Path) -> Result<String, AdapterError> {
        let target = root.join(path);
        fs::read_to_string(&target).map_err(|err| AdapterError::Io {
            op: "read_to_string",
            path: target,
            detail: err.to_string(),
        })
    }

    fn exists(&self, root: &Path, path: &Path) -> bool {
        root.join(path).exists()
    }

    fn is_dir(&self, root: &Path, path: &Path) -> bool {
        root.join(path).is_dir()
    }

    fn walk_files(&self, root: &Path, dir: &Path) -> Result<Vec<String>, AdapterError> {
        let start = root.join(dir);
        if !start.is_dir() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        let mut stack = vec![start.clone()];
        while let Some(current) = stack.pop() {
            let entries = match fs::read_dir(&current) {
                Ok(entries) => entries,
                Err(err) if current == start => {
                    return Err(AdapterError::Io {
                        op: "read_dir",
                        path: current,
                        detail: err.to_string(),
                    })
                }
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let hidden = entry.file_name().to_str().is_some_and(|n| n.starts_with('.'));
                if path.is_dir() {
                    if !hidden {
                        stack.push(path);
                    }
                } else if path.is_file() {
                    match to_corpus_relative(root, &path) {
                        Some(rel) => out.push(rel),
                        None => {
                            return Err(AdapterError::PathViolation {
                                path,
                                detail: "path is not valid UTF-8 below the corpus root".to_string(),
                            })
                        }
                    }
                }
            }
        }
        out.sort();
        Ok(out)
    }
}

/// Blocking HTTP probe: `HEAD` first, `GET` when the server rejects or
/// fails the `HEAD` request.
#[derive(Debug)]
pub struct RealNetwork {
    client: reqwest::blocking::Client,
}

impl RealNetwork {
    pub fn new() -> Result<Self, AdapterError> {
        let client = reqwest::blocking::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(concat!("coursecheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| AdapterError::Network {
                url: String::new(),
                detail: format!("client build failed: {err}"),
            })?;
        Ok(Self { client })
    }
}

impl Network for RealNetwork {
    fn probe(&self, url: &str, timeout: Duration) -> Result<u16, AdapterError> {
        let head = self.client.head(url).timeout(timeout).send();
        match head {
            Ok(response) if response.status().as_u16() != 405 => Ok(response.status().as_u16()),
            head_outcome => {
                let head_detail = match head_outcome {
                    Ok(response) => format!("status {}", response.status().as_u16()),
                    Err(err) => err.to_string(),
                };
                let response = self
                    .client
                    .get(url)
                    .timeout(timeout)
                    .send()
                    .map_err(|get_err| AdapterError::Network {
                        url: url.to_string(),
                        detail: format!("HEAD failed: {head_detail}; GET failed: {get_err}"),
                    })?;
                Ok(response.status().as_u16())
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct DeniedNetwork;

impl Network for DeniedNetwork {
    fn probe(&self, url: &str, _timeout: Duration) -> Result<u16, AdapterError> {
        Err(AdapterError::EffectDenied {
            effect: "network",
            detail: format!("attempted to probe `{url}`"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub network: bool,
}

impl Capabilities {
    pub fn deny_all() -> Self {
        Self { network: false }
    }

    pub fn from_cli_flags(allow_network: bool) -> Self {
        Self {
            network: allow_network,
        }
    }
}
