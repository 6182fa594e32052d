// SPDX-License-Identifier: Apache-2.0

use coursecheck_model::{SummaryRow, SummaryTable};

use super::notebook::file_stem;
use crate::patterns::Patterns;

fn table_cells(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim();
    if !trimmed.starts_with('|') {
        return None;
    }
    let inner = trimmed.trim_start_matches('|');
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    Some(inner.split('|').map(|cell| cell.trim().to_string()).collect())
}

fn is_separator(cells: &[String]) -> bool {
    !cells.is_empty()
        && cells.iter().all(|cell| {
            let core = cell.trim_matches(':');
            !core.is_empty() && core.chars().all(|c| c == '-')
        })
}

fn plain(cell: &str) -> String {
    cell.trim_matches(|c| c == '`' || c == '*' || c == '_' || c == ' ')
        .to_string()
}

fn row_from_cells(cells: &[String], patterns: &Patterns) -> Option<SummaryRow> {
    let linked = cells.iter().find_map(|cell| {
        patterns.link.captures_iter(cell).find_map(|cap| {
            let target = cap.get(2)?.as_str();
            if target.contains("://") || target.starts_with('#') {
                return None;
            }
            let path = target.split('#').next().unwrap_or(target);
            Some(SummaryRow {
                id: file_stem(path).to_string(),
                title: plain(cap.get(1)?.as_str()),
            })
        })
    });
    if linked.is_some() {
        return linked;
    }
    let id = plain(cells.first()?);
    if id.is_empty() {
        return None;
    }
    Some(SummaryRow {
        id,
        title: cells.get(1).map(|cell| plain(cell)).unwrap_or_default(),
    })
}

/// Reads the first markdown table found in `cells`. Returns `None` when the
/// document has no table.
pub(crate) fn parse_summary(
    document: &str,
    cells: &[(u32, String)],
    patterns: &Patterns,
) -> Option<SummaryTable> {
    for (_, source) in cells {
        let lines = source.lines().collect::<Vec<_>>();
        for start in 0..lines.len().saturating_sub(1) {
            let (Some(header), Some(separator)) =
                (table_cells(lines[start]), table_cells(lines[start + 1]))
            else {
                continue;
            };
            if header.is_empty() || !is_separator(&separator) {
                continue;
            }
            let rows = lines[start + 2..]
                .iter()
                .map_while(|line| table_cells(line))
                .filter_map(|cells| row_from_cells(&cells, patterns))
                .collect();
            return Some(SummaryTable {
                document: document.to_string(),
                rows,
            });
        }
    }
    None
}
