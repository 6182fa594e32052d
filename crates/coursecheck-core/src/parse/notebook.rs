// SPDX-License-Identifier: Apache-2.0

use serde::Deserialize;

use coursecheck_model::{Block, BlockEntry, Document, Location, Ordinal};

use super::markdown::{scan_markdown, MarkdownScan};
use crate::patterns::Patterns;

/// Cell source as stored by Jupyter: one string or a list of line strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CellSource {
    Text(String),
    Lines(Vec<String>),
}

impl CellSource {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Lines(lines) => lines.concat(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCell {
    cell_type: String,
    #[serde(default)]
    source: Option<CellSource>,
}

#[derive(Debug, Default, Deserialize)]
struct RawKernelSpec {
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    kernelspec: Option<RawKernelSpec>,
    #[serde(default)]
    language_info: Option<RawKernelSpec>,
}

#[derive(Debug, Deserialize)]
struct RawNotebook {
    cells: Vec<RawCell>,
    #[serde(default)]
    metadata: RawMetadata,
}

/// A parsed document plus the raw markdown of each markdown cell, kept for
/// the summary table parser.
#[derive(Debug, Clone)]
pub(crate) struct ParsedDocument {
    pub(crate) document: Document,
    pub(crate) markdown_cells: Vec<(u32, String)>,
}

pub(crate) fn file_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}

fn assemble(path: &str, scan: MarkdownScan, markdown_cells: Vec<(u32, String)>) -> ParsedDocument {
    let id = file_stem(path).to_string();
    ParsedDocument {
        document: Document {
            ordinal: Ordinal::infer(&id),
            id,
            path: path.to_string(),
            title: scan.title,
            blocks: scan.blocks,
            headings: scan.headings,
        },
        markdown_cells,
    }
}

pub(crate) fn parse_notebook(
    path: &str,
    text: &str,
    patterns: &Patterns,
) -> Result<ParsedDocument, String> {
    let raw: RawNotebook =
        serde_json::from_str(text).map_err(|err| format!("invalid notebook JSON: {err}"))?;
    let kernel_language = raw
        .metadata
        .kernelspec
        .and_then(|spec| spec.language)
        .or_else(|| raw.metadata.language_info.and_then(|info| info.language))
        .unwrap_or_else(|| "python".to_string());

    let mut scan = MarkdownScan::default();
    let mut markdown_cells = Vec::new();
    for (index, cell) in raw.cells.into_iter().enumerate() {
        let cell_index = u32::try_from(index).map_err(|_| "too many cells".to_string())?;
        let source = cell.source.map(CellSource::into_text).unwrap_or_default();
        match cell.cell_type.as_str() {
            "markdown" => {
                scan_markdown(cell_index, &source, patterns, &mut scan);
                markdown_cells.push((cell_index, source));
            }
            "code" => scan.blocks.push(BlockEntry {
                location: Location::cell(cell_index, 1),
                block: Block::CodeSample {
                    language: kernel_language.clone(),
                    info: Default::default(),
                    text: source,
                },
            }),
            _ => {}
        }
    }
    Ok(assemble(path, scan, markdown_cells))
}

/// Blanks a leading `---` front-matter block so line numbers stay aligned
/// with the file.
fn blank_front_matter(text: &str) -> String {
    let mut lines = text.lines();
    if lines.next().map(str::trim_end) != Some("---") {
        return text.to_string();
    }
    let Some(close) = text.lines().skip(1).position(|line| line.trim_end() == "---") else {
        return text.to_string();
    };
    text.lines()
        .enumerate()
        .map(|(idx, line)| if idx <= close + 1 { "" } else { line })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Plain markdown files are a single markdown cell with index 0.
pub(crate) fn parse_markdown_file(path: &str, text: &str, patterns: &Patterns) -> ParsedDocument {
    let source = blank_front_matter(text);
    let mut scan = MarkdownScan::default();
    scan_markdown(0, &source, patterns, &mut scan);
    assemble(path, scan, vec![(0, source)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursecheck_model::OrdinalKind;

    fn patterns() -> Patterns {
        Patterns::compile().expect("patterns")
    }

    #[test]
    fn notebook_cells_keep_their_indices() {
        let text = r###"{
  "cells": [
    {"cell_type": "markdown", "source": ["# Chapter 2: Prompts\n", "\n", "See [flow](_static/workflows/02_x.json).\n"]},
    {"cell_type": "code", "source": "print('hi')"},
    {"cell_type": "raw", "source": "ignored"},
    {"cell_type": "markdown", "source": "## Next steps"}
  ],
  "metadata": {"kernelspec": {"language": "python", "name": "python3"}},
  "nbformat": 4
}"###;
        let parsed = parse_notebook("book/02_prompts.ipynb", text, &patterns()).expect("parse");
        let doc = parsed.document;
        assert_eq!(doc.id, "02_prompts");
        assert_eq!(doc.title.as_deref(), Some("Chapter 2: Prompts"));
        assert_eq!(
            doc.ordinal,
            Some(Ordinal {
                kind: OrdinalKind::Chapter,
                value: 2
            })
        );
        assert!(doc.headings.contains("next-steps"));
        let link = doc
            .blocks
            .iter()
            .find(|entry| matches!(entry.block, Block::Link { .. }))
            .expect("link");
        assert_eq!(link.location, Location::cell(0, 3));
        let code = doc
            .blocks
            .iter()
            .find(|entry| matches!(entry.block, Block::CodeSample { .. }))
            .expect("code");
        assert_eq!(code.location, Location::cell(1, 1));
        assert_eq!(parsed.markdown_cells.len(), 2);
        assert_eq!(parsed.markdown_cells[1].0, 3);
    }

    #[test]
    fn malformed_notebook_is_an_error() {
        assert!(parse_notebook("book/x.ipynb", "{\"cells\": 3}", &patterns()).is_err());
        assert!(parse_notebook("book/x.ipynb", "not json", &patterns()).is_err());
    }

    #[test]
    fn markdown_front_matter_is_blanked_in_place() {
        let parsed = parse_markdown_file(
            "book/appendix_a_tools.md",
            "---\ntitle: x\n---\n# Appendix A: Tools\n",
            &patterns(),
        );
        assert_eq!(parsed.document.title.as_deref(), Some("Appendix A: Tools"));
        assert_eq!(parsed.document.blocks[0].location, Location::cell(0, 4));
    }

    #[test]
    fn stems_drop_directories_and_extension() {
        assert_eq!(file_stem("book/part/03_x.ipynb"), "03_x");
        assert_eq!(file_stem("intro"), "intro");
    }
}
