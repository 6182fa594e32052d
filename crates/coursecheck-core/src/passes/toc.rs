// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;

use coursecheck_model::{Finding, RuleId};

use super::PassContext;

/// The table of contents and the summary table must list the same
/// documents in the same order. The summary document itself is not
/// expected in its own table.
pub(super) fn check_toc(ctx: &PassContext<'_>) -> Vec<Finding> {
    let (Some(toc), Some(summary)) = (&ctx.corpus.toc, &ctx.corpus.summary) else {
        tracing::debug!("table of contents or summary table unavailable");
        return Vec::new();
    };
    let toc_ids = toc
        .entries
        .iter()
        .filter(|id| **id != summary.document)
        .map(String::as_str)
        .collect::<Vec<_>>();
    let summary_ids = summary.rows.iter().map(|row| row.id.as_str()).collect::<Vec<_>>();
    let in_toc = toc_ids.iter().copied().collect::<BTreeSet<_>>();
    let in_summary = summary_ids.iter().copied().collect::<BTreeSet<_>>();

    let drift = |message: String| Finding::error(RuleId::TocDrift, &toc.path, None, message);
    let mut findings = Vec::new();
    for id in in_toc.difference(&in_summary) {
        findings.push(drift(format!(
            "`{id}` is in the table of contents but missing from the summary table in `{}`",
            summary.document
        )));
    }
    for id in in_summary.difference(&in_toc) {
        findings.push(drift(format!(
            "`{id}` is in the summary table of `{}` but missing from the table of contents",
            summary.document
        )));
    }

    let common_toc = toc_ids.iter().filter(|id| in_summary.contains(*id));
    let common_summary = summary_ids.iter().filter(|id| in_toc.contains(*id));
    if let Some((position, (left, right))) = common_toc
        .zip(common_summary)
        .enumerate()
        .find(|(_, (left, right))| left != right)
    {
        findings.push(drift(format!(
            "order differs at shared entry {}: table of contents has `{left}`, summary table has `{right}`",
            position + 1
        )));
    }
    findings
}
