// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use coursecheck_model::{heading_slug, Block, BlockEntry, Location};

use crate::patterns::Patterns;

/// Blocks, title and heading slugs accumulated across the markdown cells of
/// one document.
#[derive(Debug, Default)]
pub(crate) struct MarkdownScan {
    pub(crate) blocks: Vec<BlockEntry>,
    pub(crate) title: Option<String>,
    pub(crate) headings: BTreeSet<String>,
}

struct Paragraph {
    start_line: u32,
    insert_at: usize,
    lines: Vec<String>,
}

struct Fence {
    marker: char,
    width: usize,
    start_line: u32,
    language: String,
    info: BTreeMap<String, String>,
    lines: Vec<String>,
}

impl Fence {
    fn open(trimmed: &str, line: u32, patterns: &Patterns) -> Option<Self> {
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let width = trimmed.chars().take_while(|c| *c == marker).count();
        if width < 3 {
            return None;
        }
        let rest = trimmed[width..].trim();
        let (language, attrs) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, ""), |(lang, attrs)| (lang, attrs));
        let info = patterns
            .info_attr
            .captures_iter(attrs)
            .filter_map(|cap| {
                let key = cap.get(1)?.as_str().to_string();
                let value = cap.get(2).or_else(|| cap.get(3))?.as_str().to_string();
                Some((key, value))
            })
            .collect();
        Some(Self {
            marker,
            width,
            start_line: line,
            language: if language.is_empty() {
                "text".to_string()
            } else {
                language.to_string()
            },
            info,
            lines: Vec::new(),
        })
    }

    fn closes(&self, raw_line: &str) -> bool {
        let trimmed = raw_line.trim();
        let run = trimmed.chars().take_while(|c| *c == self.marker).count();
        run >= self.width && run == trimmed.chars().count()
    }

    fn finish(self, cell: u32) -> BlockEntry {
        BlockEntry {
            location: Location::cell(cell, self.start_line),
            block: Block::CodeSample {
                language: self.language,
                info: self.info,
                text: self.lines.join("\n"),
            },
        }
    }
}

fn heading_level(trimmed: &str) -> Option<usize> {
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &trimmed[level..];
    (rest.is_empty() || rest.starts_with(char::is_whitespace)).then_some(level)
}

fn split_download(inner: &str) -> (String, String) {
    let inner = inner.trim();
    if let Some(body) = inner.strip_suffix('>') {
        if let Some((label, path)) = body.rsplit_once('<') {
            let label = label.trim();
            let path = path.trim().to_string();
            let label = if label.is_empty() { path.clone() } else { label.to_string() };
            return (label, path);
        }
    }
    (inner.to_string(), inner.to_string())
}

/// Pushes the download and link blocks found on one line, in source order,
/// and returns the line with their markup replaced by the display text.
fn extract_inline(
    cell: u32,
    line: u32,
    raw_line: &str,
    patterns: &Patterns,
    blocks: &mut Vec<BlockEntry>,
) -> String {
    let mut found: Vec<(usize, usize, String, Block)> = Vec::new();
    for cap in patterns.download.captures_iter(raw_line) {
        let (Some(whole), Some(inner)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let (label, asset_path) = split_download(inner.as_str());
        found.push((
            whole.start(),
            whole.end(),
            label,
            Block::DownloadDirective { asset_path },
        ));
    }
    let roles = found
        .iter()
        .map(|(start, end, _, _)| (*start, *end))
        .collect::<Vec<_>>();
    for cap in patterns.link.captures_iter(raw_line) {
        let (Some(whole), Some(display), Some(target)) = (cap.get(0), cap.get(1), cap.get(2))
        else {
            continue;
        };
        if roles
            .iter()
            .any(|(start, end)| whole.start() < *end && *start < whole.end())
        {
            continue;
        }
        found.push((
            whole.start(),
            whole.end(),
            display.as_str().to_string(),
            Block::Link {
                display_text: display.as_str().to_string(),
                target: target.as_str().to_string(),
            },
        ));
    }
    found.sort_by_key(|(start, _, _, _)| *start);

    let mut out = String::with_capacity(raw_line.len());
    let mut last = 0usize;
    for (start, end, shown, block) in found {
        blocks.push(BlockEntry {
            location: Location::cell(cell, line),
            block,
        });
        out.push_str(&raw_line[last..start]);
        out.push_str(&shown);
        last = end;
    }
    out.push_str(&raw_line[last..]);
    out
}

fn flush(paragraph: &mut Option<Paragraph>, cell: u32, blocks: &mut Vec<BlockEntry>) {
    if let Some(done) = paragraph.take() {
        let entry = BlockEntry {
            location: Location::cell(cell, done.start_line),
            block: Block::Prose {
                text: done.lines.join("\n"),
            },
        };
        blocks.insert(done.insert_at, entry);
    }
}

/// Splits one markdown cell into blocks. Lines are numbered from 1 within
/// the cell; a block is located at its first line.
pub(crate) fn scan_markdown(cell: u32, source: &str, patterns: &Patterns, scan: &mut MarkdownScan) {
    let mut paragraph: Option<Paragraph> = None;
    let mut fence: Option<Fence> = None;

    for (idx, raw_line) in source.lines().enumerate() {
        let line = u32::try_from(idx + 1).unwrap_or(u32::MAX);
        if let Some(open) = fence.as_mut() {
            if open.closes(raw_line) {
                if let Some(done) = fence.take() {
                    scan.blocks.push(done.finish(cell));
                }
            } else {
                open.lines.push(raw_line.to_string());
            }
            continue;
        }

        let trimmed = raw_line.trim_start();
        if let Some(open) = Fence::open(trimmed, line, patterns) {
            flush(&mut paragraph, cell, &mut scan.blocks);
            fence = Some(open);
            continue;
        }
        if trimmed.is_empty() {
            flush(&mut paragraph, cell, &mut scan.blocks);
            continue;
        }

        if let Some(level) = heading_level(trimmed) {
            flush(&mut paragraph, cell, &mut scan.blocks);
            let insert_at = scan.blocks.len();
            let replaced = extract_inline(cell, line, trimmed, patterns, &mut scan.blocks);
            let text = replaced
                .trim_start_matches('#')
                .trim()
                .trim_end_matches('#')
                .trim()
                .to_string();
            if text.is_empty() {
                continue;
            }
            scan.headings.insert(heading_slug(&text));
            if level == 1 && scan.title.is_none() {
                scan.title = Some(text.clone());
            }
            scan.blocks.insert(
                insert_at,
                BlockEntry {
                    location: Location::cell(cell, line),
                    block: Block::Prose { text },
                },
            );
            continue;
        }

        let insert_at = scan.blocks.len();
        let replaced = extract_inline(cell, line, raw_line, patterns, &mut scan.blocks);
        match paragraph.as_mut() {
            Some(open) => open.lines.push(replaced),
            None => {
                paragraph = Some(Paragraph {
                    start_line: line,
                    insert_at,
                    lines: vec![replaced],
                })
            }
        }
    }

    flush(&mut paragraph, cell, &mut scan.blocks);
    if let Some(open) = fence.take() {
        scan.blocks.push(open.finish(cell));
    }
}
