// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use coursecheck_model::{Finding, RuleId};

use super::PassContext;
use crate::index::{RefOrigin, RefTarget};

pub(super) fn check_downloads(ctx: &PassContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();
    for reference in ctx.index.references() {
        if reference.origin != RefOrigin::Download {
            continue;
        }
        let problem = match &reference.target {
            RefTarget::Asset { path } | RefTarget::File { path } => {
                if ctx.adapters.fs.exists(&ctx.corpus.root, Path::new(path)) {
                    continue;
                }
                format!("download target `{}` does not exist", reference.raw)
            }
            RefTarget::OutsideRoot => {
                format!("download target `{}` points outside the corpus root", reference.raw)
            }
            RefTarget::Document { .. } | RefTarget::External { .. } => continue,
        };
        findings.push(Finding::error(
            RuleId::MissingDownloadTarget,
            &reference.source_path,
            Some(reference.location.clone()),
            problem,
        ));
    }
    findings
}
