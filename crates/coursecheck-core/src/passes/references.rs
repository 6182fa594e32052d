// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use coursecheck_model::{Finding, RuleId};

use super::PassContext;
use crate::index::{RefOrigin, RefTarget, Reference};

fn missing(reference: &Reference, what: &str) -> Finding {
    Finding::error(
        RuleId::MissingReference,
        &reference.source_path,
        Some(reference.location.clone()),
        format!("{what} `{}` does not exist", reference.raw),
    )
}

/// Links and mentions must resolve to a loaded asset, a loaded document or a
/// file that exists on disk; document anchors must name a heading of the
/// target.
pub(super) fn check_references(ctx: &PassContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();
    for reference in ctx.index.references() {
        if reference.origin == RefOrigin::Download {
            continue;
        }
        match &reference.target {
            RefTarget::Asset { path } => {
                if ctx.index.asset(path).is_none() && !ctx.index.is_failed_asset(path) {
                    findings.push(missing(reference, "workflow asset"));
                }
            }
            RefTarget::File { path } => {
                if !ctx.adapters.fs.exists(&ctx.corpus.root, Path::new(path)) {
                    findings.push(missing(reference, "file"));
                }
            }
            RefTarget::Document { id, path, anchor } => match ctx.index.document(id) {
                Some(target) => {
                    if let Some(anchor) = anchor {
                        if !target.headings.contains(anchor) {
                            findings.push(Finding::error(
                                RuleId::BrokenAnchor,
                                &reference.source_path,
                                Some(reference.location.clone()),
                                format!("`{}` has no heading `#{anchor}`", target.path),
                            ));
                        }
                    }
                }
                None if ctx.index.is_failed_document(id) => {}
                None if ctx.adapters.fs.exists(&ctx.corpus.root, Path::new(path)) => {}
                None => findings.push(missing(reference, "document")),
            },
            RefTarget::OutsideRoot => findings.push(Finding::error(
                RuleId::MissingReference,
                &reference.source_path,
                Some(reference.location.clone()),
                format!("`{}` points outside the corpus root", reference.raw),
            )),
            RefTarget::External { .. } => {}
        }
    }
    findings
}
