// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use coursecheck_model::{Document, Finding, Ordinal, OrdinalKind, RuleId};

use super::PassContext;

fn sequence_findings(kind: OrdinalKind, mut docs: Vec<(u32, &Document)>) -> Vec<Finding> {
    docs.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.path.cmp(&b.1.path)));
    let mut findings = Vec::new();
    let mut expected = Ordinal::ORIGIN;
    let mut previous: Option<(u32, &Document)> = None;
    for (value, doc) in docs {
        let found = Ordinal { kind, value };
        match previous {
            Some((prev_value, prev_doc)) if prev_value == value => {
                findings.push(Finding::error(
                    RuleId::SequenceGap,
                    &doc.path,
                    None,
                    format!("duplicate {found}, already used by {}", prev_doc.path),
                ));
            }
            _ => {
                if value != expected {
                    let missing = Ordinal {
                        kind,
                        value: expected,
                    };
                    findings.push(Finding::error(
                        RuleId::SequenceGap,
                        &doc.path,
                        None,
                        format!("expected {missing}, found {found}"),
                    ));
                }
                expected = value.saturating_add(1);
            }
        }
        previous = Some((value, doc));
    }
    findings
}

fn title_finding(doc: &Document, ordinal: Ordinal) -> Option<Finding> {
    let prefix = ordinal.title_prefix();
    let message = match doc.title.as_deref() {
        Some(title) if title.starts_with(&prefix) => return None,
        Some(title) => format!("title `{title}` does not start with `{prefix}`"),
        None => format!("document has no level-one title; expected one starting with `{prefix}`"),
    };
    Some(Finding::error(RuleId::TitleMismatch, &doc.path, None, message))
}

/// Chapter, appendix and project numbering must run contiguously from the
/// origin and each title must carry its own number.
pub(super) fn check_naming(ctx: &PassContext<'_>) -> Vec<Finding> {
    let mut groups: BTreeMap<OrdinalKind, Vec<(u32, &Document)>> = BTreeMap::new();
    let mut findings = Vec::new();
    for doc in &ctx.corpus.documents {
        let Some(ordinal) = doc.ordinal else {
            continue;
        };
        groups.entry(ordinal.kind).or_default().push((ordinal.value, doc));
        findings.extend(title_finding(doc, ordinal));
    }
    for (kind, docs) in groups {
        findings.extend(sequence_findings(kind, docs));
    }
    findings
}
