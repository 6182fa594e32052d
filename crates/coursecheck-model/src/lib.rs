// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

mod corpus;

pub use corpus::{
    heading_slug, AssetFile, AssetNode, Block, BlockEntry, Document, LoadError, LoadErrorKind,
    NodeCapability, Ordinal, OrdinalKind, SummaryRow, SummaryTable, TocConfig,
};

pub const REPORT_SCHEMA_VERSION: u64 = 1;

fn is_lower_kebab(input: &str) -> bool {
    !input.is_empty()
        && !input.starts_with('-')
        && !input.ends_with('-')
        && input
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Identifier of one validation pass, as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassId {
    References,
    Assets,
    Prompts,
    Naming,
    Toc,
    Anchors,
    Downloads,
    Inventory,
    LiveUrls,
}

impl PassId {
    pub const ALL: [PassId; 9] = [
        PassId::References,
        PassId::Assets,
        PassId::Prompts,
        PassId::Naming,
        PassId::Toc,
        PassId::Anchors,
        PassId::Downloads,
        PassId::Inventory,
        PassId::LiveUrls,
    ];

    pub fn parse(value: &str) -> Result<Self, String> {
        let raw = value.trim();
        if raw.is_empty() {
            return Err("pass id cannot be empty".to_string());
        }
        if !is_lower_kebab(raw) {
            return Err(format!("invalid pass id `{raw}`: expected lowercase kebab-case"));
        }
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == raw)
            .ok_or_else(|| format!("unknown pass id `{raw}`"))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::References => "references",
            Self::Assets => "assets",
            Self::Prompts => "prompts",
            Self::Naming => "naming",
            Self::Toc => "toc",
            Self::Anchors => "anchors",
            Self::Downloads => "downloads",
            Self::Inventory => "inventory",
            Self::LiveUrls => "live-urls",
        }
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    FsRead,
    Network,
}

/// Declaration order is report order: errors first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable rule identifiers. The textual form is part of the report contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RuleId {
    LoadFailure,
    InvalidAsset,
    MissingReference,
    BrokenAnchor,
    EmptyWorkflow,
    OrphanAsset,
    MissingAsset,
    PromptDrift,
    SequenceGap,
    TitleMismatch,
    TocDrift,
    MisplacedDocAnnotation,
    MissingDownloadTarget,
    UnreferencedAsset,
    UnreferencedDocument,
    DeadLink,
    PassFailure,
}

impl RuleId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LoadFailure => "LoadFailure",
            Self::InvalidAsset => "InvalidAsset",
            Self::MissingReference => "MissingReference",
            Self::BrokenAnchor => "BrokenAnchor",
            Self::EmptyWorkflow => "EmptyWorkflow",
            Self::OrphanAsset => "OrphanAsset",
            Self::MissingAsset => "MissingAsset",
            Self::PromptDrift => "PromptDrift",
            Self::SequenceGap => "SequenceGap",
            Self::TitleMismatch => "TitleMismatch",
            Self::TocDrift => "TocDrift",
            Self::MisplacedDocAnnotation => "MisplacedDocAnnotation",
            Self::MissingDownloadTarget => "MissingDownloadTarget",
            Self::UnreferencedAsset => "UnreferencedAsset",
            Self::UnreferencedDocument => "UnreferencedDocument",
            Self::DeadLink => "DeadLink",
            Self::PassFailure => "PassFailure",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a finding inside its subject file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Location {
    /// Zero-based cell index, one-based line inside the cell source.
    Cell { cell: u32, line: u32 },
    /// Zero-based node index in creation order.
    Node { index: u32, name: String },
}

impl Location {
    pub fn cell(cell: u32, line: u32) -> Self {
        Self::Cell { cell, line }
    }

    pub fn node(index: usize, name: &str) -> Self {
        Self::Node {
            index: u32::try_from(index).unwrap_or(u32::MAX),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cell { cell, line } => write!(f, "cell {cell}, line {line}"),
            Self::Node { index, name } => write!(f, "node {index} `{name}`"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub rule: RuleId,
    /// Corpus-relative path of the document, asset or config file concerned.
    pub subject: String,
    pub location: Option<Location>,
    pub message: String,
}

impl Finding {
    pub fn new(
        severity: Severity,
        rule: RuleId,
        subject: impl Into<String>,
        location: Option<Location>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            rule,
            subject: subject.into(),
            location,
            message: message.into(),
        }
    }

    pub fn error(
        rule: RuleId,
        subject: impl Into<String>,
        location: Option<Location>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Error, rule, subject, location, message)
    }

    pub fn warning(
        rule: RuleId,
        subject: impl Into<String>,
        location: Option<Location>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Warning, rule, subject, location, message)
    }

    pub fn info(
        rule: RuleId,
        subject: impl Into<String>,
        location: Option<Location>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Info, rule, subject, location, message)
    }
}

impl Ord for Finding {
    fn cmp(&self, other: &Self) -> Ordering {
        self.severity
            .cmp(&other.severity)
            .then_with(|| self.subject.cmp(&other.subject))
            .then_with(|| self.location.cmp(&other.location))
            .then_with(|| self.rule.cmp(&other.rule))
            .then_with(|| self.message.cmp(&other.message))
    }
}

impl PartialOrd for Finding {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub errors: u64,
    pub warnings: u64,
    pub infos: u64,
}

impl ReportSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let count = |severity: Severity| {
            findings
                .iter()
                .filter(|finding| finding.severity == severity)
                .count() as u64
        };
        Self {
            errors: count(Severity::Error),
            warnings: count(Severity::Warning),
            infos: count(Severity::Info),
        }
    }
}
