// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Location;

/// Lower-cases heading text and joins words with single hyphens.
pub fn heading_slug(text: &str) -> String {
    let mut out = String::new();
    let mut prev_dash = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            out.push(c);
            prev_dash = false;
        } else if (c.is_whitespace() || c == '-' || c == '_') && !prev_dash {
            out.push('-');
            prev_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrdinalKind {
    Chapter,
    Appendix,
    Project,
}

impl OrdinalKind {
    pub fn noun(self) -> &'static str {
        match self {
            Self::Chapter => "Chapter",
            Self::Appendix => "Appendix",
            Self::Project => "Project",
        }
    }
}

/// Slot of a document in its category sequence. Appendix letters are stored
/// as their alphabet position (`A` is 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ordinal {
    pub kind: OrdinalKind,
    pub value: u32,
}

fn leading_number(raw: &str) -> Option<(u32, &str)> {
    let digits = raw.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let (number, rest) = raw.split_at(digits);
    if !(rest.is_empty() || rest.starts_with('_') || rest.starts_with('-')) {
        return None;
    }
    number.parse().ok().map(|n| (n, rest))
}

impl Ordinal {
    pub const ORIGIN: u32 = 1;

    /// Infers the slot from a filename stem: `04_agents` is chapter 4,
    /// `appendix_b_tools` is appendix B, `project_02_bot` is project 2.
    /// `00_` stems are front matter and carry no ordinal.
    pub fn infer(stem: &str) -> Option<Self> {
        if let Some(rest) = stem.strip_prefix("appendix_") {
            let mut chars = rest.chars();
            let letter = chars.next()?;
            let tail = chars.as_str();
            if !letter.is_ascii_alphabetic() || !(tail.is_empty() || tail.starts_with('_')) {
                return None;
            }
            let value = u32::from(letter.to_ascii_uppercase()) - u32::from('A') + 1;
            return Some(Self {
                kind: OrdinalKind::Appendix,
                value,
            });
        }
        if let Some(rest) = stem.strip_prefix("project_") {
            let (value, _) = leading_number(rest)?;
            return Some(Self {
                kind: OrdinalKind::Project,
                value,
            });
        }
        let (value, _) = leading_number(stem)?;
        if value == 0 {
            return None;
        }
        Some(Self {
            kind: OrdinalKind::Chapter,
            value,
        })
    }

    pub fn label(self) -> String {
        label_for(self.kind, self.value)
    }

    /// Title prefix a document in this slot must start with, e.g. `Chapter 4:`.
    pub fn title_prefix(self) -> String {
        format!("{} {}:", self.kind.noun(), self.label())
    }
}

pub(crate) fn label_for(kind: OrdinalKind, value: u32) -> String {
    match kind {
        OrdinalKind::Appendix if (1..=26).contains(&value) => {
            char::from_u32(u32::from('A') + value - 1)
                .map(String::from)
                .unwrap_or_else(|| value.to_string())
        }
        _ => value.to_string(),
    }
}

impl fmt::Display for Ordinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.noun().to_lowercase(), self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Prose {
        text: String,
    },
    CodeSample {
        language: String,
        info: BTreeMap<String, String>,
        text: String,
    },
    Link {
        display_text: String,
        target: String,
    },
    DownloadDirective {
        asset_path: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEntry {
    pub location: Location,
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Filename stem.
    pub id: String,
    /// Corpus-relative path with forward slashes.
    pub path: String,
    pub title: Option<String>,
    pub ordinal: Option<Ordinal>,
    pub blocks: Vec<BlockEntry>,
    /// Slugs of every heading in the document.
    pub headings: BTreeSet<String>,
}

impl Document {
    /// Directory of the document relative to the corpus root (empty at the root).
    pub fn dir(&self) -> &str {
        self.path.rsplit_once('/').map_or("", |(dir, _)| dir)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCapability {
    Functional,
    Annotation,
    /// The annotation carrying the documentation link of the workflow.
    DocumentationAnnotation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetNode {
    pub name: String,
    /// Raw node type tag, e.g. `n8n-nodes-base.stickyNote`.
    pub kind: String,
    pub parameters: BTreeMap<String, Value>,
    pub position: Option<[f64; 2]>,
}

impl AssetNode {
    pub fn is_annotation(&self) -> bool {
        self.kind.ends_with("stickyNote")
    }

    pub fn text_parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).and_then(Value::as_str)
    }

    pub fn classify(&self, documentation_marker: &str) -> NodeCapability {
        if !self.is_annotation() {
            return NodeCapability::Functional;
        }
        match self.text_parameter("content") {
            Some(content) if !documentation_marker.is_empty() && content.contains(documentation_marker) => {
                NodeCapability::DocumentationAnnotation
            }
            _ => NodeCapability::Annotation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetFile {
    /// Corpus-relative path with forward slashes.
    pub path: String,
    pub name: String,
    pub workflow_name: Option<String>,
    pub nodes: Vec<AssetNode>,
}

impl AssetFile {
    pub fn functional_nodes(&self) -> impl Iterator<Item = (usize, &AssetNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !node.is_annotation())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocConfig {
    pub path: String,
    /// Document identifiers in display order, root first.
    pub entries: Vec<String>,
}

impl TocConfig {
    pub fn root(&self) -> Option<&str> {
        self.entries.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryTable {
    /// Identifier of the document holding the table.
    pub document: String,
    pub rows: Vec<SummaryRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadErrorKind {
    Document,
    Asset,
    Toc,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoadError {
    pub path: String,
    pub kind: LoadErrorKind,
    pub detail: String,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slug_matches_rendered_anchor_ids() {
        assert_eq!(heading_slug("Chapter 5: Your First AI Agent"), "chapter-5-your-first-ai-agent");
        assert_eq!(heading_slug("  Tools & Memory  "), "tools-memory");
        assert_eq!(heading_slug("snake_case heading"), "snake-case-heading");
    }

    #[test]
    fn ordinal_inference_per_category() {
        assert_eq!(
            Ordinal::infer("04_workflow_examples"),
            Some(Ordinal {
                kind: OrdinalKind::Chapter,
                value: 4
            })
        );
        assert_eq!(Ordinal::infer("00_index"), None);
        assert_eq!(Ordinal::infer("intro"), None);
        assert_eq!(Ordinal::infer("2024notes"), None);
        assert_eq!(
            Ordinal::infer("appendix_c_glossary"),
            Some(Ordinal {
                kind: OrdinalKind::Appendix,
                value: 3
            })
        );
        assert_eq!(Ordinal::infer("appendix_prompt_engineering"), None);
        assert_eq!(
            Ordinal::infer("project_02_support_bot"),
            Some(Ordinal {
                kind: OrdinalKind::Project,
                value: 2
            })
        );
    }

    #[test]
    fn ordinal_title_prefixes() {
        let appendix = Ordinal {
            kind: OrdinalKind::Appendix,
            value: 2,
        };
        assert_eq!(appendix.title_prefix(), "Appendix B:");
        let chapter = Ordinal {
            kind: OrdinalKind::Chapter,
            value: 12,
        };
        assert_eq!(chapter.title_prefix(), "Chapter 12:");
        assert_eq!(chapter.to_string(), "chapter 12");
    }

    #[test]
    fn node_classification_uses_marker() {
        let mut parameters = BTreeMap::new();
        parameters.insert(
            "content".to_string(),
            json!("## Notes\nDocumentation: https://example.github.io/course/05.html"),
        );
        let note = AssetNode {
            name: "Sticky".to_string(),
            kind: "n8n-nodes-base.stickyNote".to_string(),
            parameters,
            position: None,
        };
        assert_eq!(note.classify("Documentation:"), NodeCapability::DocumentationAnnotation);
        assert_eq!(note.classify("Docs link:"), NodeCapability::Annotation);
        let agent = AssetNode {
            name: "AI Agent".to_string(),
            kind: "@n8n/n8n-nodes-langchain.agent".to_string(),
            parameters: BTreeMap::new(),
            position: Some([0.0, 0.0]),
        };
        assert_eq!(agent.classify("Documentation:"), NodeCapability::Functional);
    }
}
