// SPDX-License-Identifier: Apache-2.0

use coursecheck_model::{Finding, RuleId};

use super::PassContext;

/// Lists assets nothing points at and documents no other document links.
pub(super) fn check_inventory(ctx: &PassContext<'_>) -> Vec<Finding> {
    let assets = ctx
        .corpus
        .assets
        .iter()
        .filter(|asset| ctx.index.inbound_assets(&asset.path) == 0)
        .map(|asset| {
            Finding::info(
                RuleId::UnreferencedAsset,
                &asset.path,
                None,
                "workflow is not referenced by any document",
            )
        });
    let documents = ctx
        .corpus
        .documents
        .iter()
        .filter(|doc| ctx.index.inbound_documents(&doc.id) == 0)
        .map(|doc| {
            Finding::info(
                RuleId::UnreferencedDocument,
                &doc.path,
                None,
                "document is not linked from any other document",
            )
        });
    assets.chain(documents).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::fixture::{asset, corpus, md, run};
    use coursecheck_model::Severity;

    #[test]
    fn unreferenced_files_are_listed_as_info() {
        let docs = vec![
            md("book/index.md", "# Course\n\n[Start](01_a.ipynb) with 01_flow.json.\n"),
            md("book/01_a.md", "# Chapter 1: A\n\n[Back](#chapter-1-a)\n"),
        ];
        let assets = vec![
            asset("book/_static/workflows/01_flow.json", r#"{"nodes":[]}"#),
            asset("book/_static/workflows/02_unused.json", r#"{"nodes":[]}"#),
        ];
        let findings = run(check_inventory, &corpus(docs, assets));
        let rows = findings
            .iter()
            .map(|f| (f.severity, f.rule, f.subject.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            rows,
            vec![
                (Severity::Info, RuleId::UnreferencedAsset, "book/_static/workflows/02_unused.json"),
                (Severity::Info, RuleId::UnreferencedDocument, "book/index.md"),
            ]
        );
    }
}
