// SPDX-License-Identifier: Apache-2.0

use coursecheck_adapters::resolve_relative;
use coursecheck_model::{Finding, LoadErrorKind, RuleId};

use super::PassContext;
use crate::index::RefTarget;

fn load_error_findings(ctx: &PassContext<'_>) -> Vec<Finding> {
    ctx.corpus
        .load_errors
        .iter()
        .map(|err| {
            let rule = match err.kind {
                LoadErrorKind::Asset => RuleId::InvalidAsset,
                LoadErrorKind::Document | LoadErrorKind::Toc => RuleId::LoadFailure,
            };
            Finding::error(rule, &err.path, None, err.detail.clone())
        })
        .collect()
}

fn example_findings(ctx: &PassContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (doc_id, declared) in &ctx.policy.examples {
        let Some(doc) = ctx.index.document(doc_id) else {
            tracing::debug!(document = %doc_id, "examples entry names no loaded document");
            continue;
        };
        let references_asset = ctx
            .index
            .references_from(&doc.id)
            .any(|reference| matches!(reference.target, RefTarget::Asset { .. }));
        if !references_asset {
            findings.push(Finding::warning(
                RuleId::MissingAsset,
                &doc.path,
                None,
                "document presents workflow examples but references no workflow asset",
            ));
        }
        for name in declared {
            let path = resolve_relative(&ctx.policy.workflows_dir, name);
            let present = path
                .as_deref()
                .is_some_and(|path| ctx.index.asset(path).is_some() || ctx.index.is_failed_asset(path));
            if !present {
                findings.push(Finding::warning(
                    RuleId::MissingAsset,
                    &doc.path,
                    None,
                    format!("example workflow `{name}` is not in {}", ctx.policy.workflows_dir),
                ));
            }
        }
    }
    findings
}

/// Load failures, empty or orphaned workflows, and example documents
/// without their workflows.
pub(super) fn check_assets(ctx: &PassContext<'_>) -> Vec<Finding> {
    let mut findings = load_error_findings(ctx);
    for asset in &ctx.corpus.assets {
        let inbound = ctx.index.inbound_assets(&asset.path);
        if inbound == 0 {
            findings.push(Finding::warning(
                RuleId::OrphanAsset,
                &asset.path,
                None,
                "no document references this workflow",
            ));
        } else if asset.functional_nodes().next().is_none() {
            findings.push(Finding::error(
                RuleId::EmptyWorkflow,
                &asset.path,
                None,
                format!("workflow is referenced {inbound} time(s) but has no functional nodes"),
            ));
        }
    }
    findings.extend(example_findings(ctx));
    findings
}
