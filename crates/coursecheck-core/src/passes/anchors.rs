// SPDX-License-Identifier: Apache-2.0

use coursecheck_model::{AssetFile, AssetNode, Finding, Location, NodeCapability, RuleId};

use super::PassContext;
use crate::parse::file_stem;
use crate::patterns::trim_url;

fn documentation_url<'t>(ctx: &PassContext<'_>, note: &'t AssetNode) -> Option<&'t str> {
    let content = note.text_parameter("content")?;
    let (_, after) = content.split_once(ctx.policy.doc_link_marker.as_str())?;
    ctx.patterns
        .bare_url
        .find(after)
        .map(|found| trim_url(found.as_str()))
}

fn check_url(ctx: &PassContext<'_>, asset: &AssetFile, index: usize, note: &AssetNode) -> Option<Finding> {
    let broken = |message: String| {
        Some(Finding::error(
            RuleId::BrokenAnchor,
            &asset.path,
            Some(Location::node(index, &note.name)),
            message,
        ))
    };
    let Some(url) = documentation_url(ctx, note) else {
        return broken(format!(
            "documentation note has no URL after `{}`",
            ctx.policy.doc_link_marker
        ));
    };
    if !ctx.publish_url.is_match(url) {
        return broken(format!(
            "documentation URL `{url}` does not match `{}`",
            ctx.policy.publish_url_pattern
        ));
    }
    let (page, fragment) = url.split_once('#')?;
    if fragment.is_empty() {
        return None;
    }
    let page = page.split('?').next().unwrap_or(page);
    let doc_id = file_stem(page.trim_end_matches('/'));
    match ctx.index.document(doc_id) {
        Some(doc) if doc.headings.contains(fragment) => None,
        Some(doc) => broken(format!("`{}` has no heading `#{fragment}` linked from `{url}`", doc.path)),
        None => broken(format!("documentation URL `{url}` names no known document `{doc_id}`")),
    }
}

/// Each workflow carries at most one documentation note, placed before any
/// other note, whose link points at a published heading.
pub(super) fn check_anchors(ctx: &PassContext<'_>) -> Vec<Finding> {
    let marker = ctx.policy.doc_link_marker.as_str();
    let mut findings = Vec::new();
    for asset in &ctx.corpus.assets {
        let annotations = asset
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_annotation())
            .collect::<Vec<_>>();
        let documentation = annotations
            .iter()
            .enumerate()
            .filter(|(_, (_, node))| node.classify(marker) == NodeCapability::DocumentationAnnotation)
            .map(|(rank, (index, node))| (rank, *index, *node))
            .collect::<Vec<_>>();
        let Some(&(rank, index, note)) = documentation.first() else {
            continue;
        };
        if rank != 0 {
            findings.push(Finding::error(
                RuleId::MisplacedDocAnnotation,
                &asset.path,
                Some(Location::node(index, &note.name)),
                format!("documentation note is annotation {} of {}; it must be the first", rank + 1, annotations.len()),
            ));
        }
        for &(_, extra_index, extra) in &documentation[1..] {
            findings.push(Finding::error(
                RuleId::MisplacedDocAnnotation,
                &asset.path,
                Some(Location::node(extra_index, &extra.name)),
                format!("second documentation note; `{}` is already designated", note.name),
            ));
        }
        findings.extend(check_url(ctx, asset, index, note));
    }
    findings
}
