// SPDX-License-Identifier: Apache-2.0

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use coursecheck_adapters::{Capabilities, Fs, Network};
use coursecheck_model::{Effect, Finding, PassId, RuleId};
use coursecheck_policies::{CorpusPolicy, PolicyError};

use crate::index::ReferenceIndex;
use crate::loader::{load_corpus, CorpusError};
use crate::passes::{builtin_pass_fn, catalog, AdapterSet, PassContext, PassFn, PassSpec};
use crate::patterns::Patterns;
use crate::report::{aggregate, Report};

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub corpus_root: PathBuf,
    /// Explicit config file; `<root>/coursecheck.toml` is used when absent.
    pub config_path: Option<PathBuf>,
    pub capabilities: Capabilities,
}

#[derive(Debug, Clone, Default)]
pub struct Selectors {
    /// When non-empty, exactly these passes run.
    pub only: Vec<PassId>,
    /// Adds opt-in passes to the default set.
    pub include_opt_in: bool,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: Report,
    pub passes_run: Vec<PassId>,
    pub passes_skipped: Vec<(PassId, String)>,
    pub interrupted: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error("pattern compilation failed: {0}")]
    Pattern(#[from] regex::Error),
}

fn effect_allowed(effect: Effect, caps: Capabilities) -> bool {
    match effect {
        Effect::FsRead => true,
        Effect::Network => caps.network,
    }
}

fn effect_name(effect: Effect) -> &'static str {
    match effect {
        Effect::FsRead => "fs_read",
        Effect::Network => "network",
    }
}

pub fn select_passes(selectors: &Selectors) -> Vec<PassSpec> {
    catalog()
        .into_iter()
        .filter(|spec| {
            if selectors.only.is_empty() {
                spec.default_enabled || selectors.include_opt_in
            } else {
                selectors.only.contains(&spec.id)
            }
        })
        .collect()
}

fn panic_detail(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|msg| (*msg).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

/// Runs one pass; a panic becomes a single `PassFailure` finding.
fn execute(id: PassId, func: PassFn, ctx: &PassContext<'_>) -> Vec<Finding> {
    let start = Instant::now();
    tracing::debug!(pass = %id, "pass started");
    let findings = catch_unwind(AssertUnwindSafe(|| func(ctx))).unwrap_or_else(|payload| {
        let detail = panic_detail(payload.as_ref());
        tracing::error!(pass = %id, detail = %detail, "pass panicked");
        vec![Finding::error(
            RuleId::PassFailure,
            id.as_str(),
            None,
            format!("pass aborted: {detail}"),
        )]
    });
    tracing::debug!(
        pass = %id,
        findings = findings.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "pass finished"
    );
    findings
}

pub fn run_passes(
    fs: &dyn Fs,
    network: &dyn Network,
    request: &RunRequest,
    selectors: &Selectors,
    cancel: &AtomicBool,
) -> Result<RunOutcome, RunError> {
    let policy = CorpusPolicy::load(&request.corpus_root, request.config_path.as_deref())?;
    let patterns = Patterns::compile()?;
    let publish_url = policy.publish_url_regex()?;
    let corpus = load_corpus(fs, &request.corpus_root, &policy, &patterns)?;
    let index = ReferenceIndex::build(&corpus, &policy, &patterns);
    let ctx = PassContext {
        corpus: &corpus,
        index: &index,
        policy: &policy,
        publish_url: &publish_url,
        patterns: &patterns,
        adapters: AdapterSet { fs, network },
        cancel,
    };

    let mut passes_skipped = Vec::new();
    let mut runnable = Vec::new();
    for spec in select_passes(selectors) {
        let denied = spec
            .effects_required
            .iter()
            .find(|effect| !effect_allowed(**effect, request.capabilities));
        match denied {
            Some(effect) => passes_skipped.push((spec.id, format!("effect denied: {}", effect_name(*effect)))),
            None => runnable.push(spec.id),
        }
    }

    let results = runnable
        .par_iter()
        .map(|id| {
            if cancel.load(Ordering::Relaxed) {
                return (*id, None);
            }
            (*id, Some(execute(*id, builtin_pass_fn(*id), &ctx)))
        })
        .collect::<Vec<_>>();

    let mut passes_run = Vec::new();
    let mut findings = Vec::new();
    for (id, outcome) in results {
        match outcome {
            Some(rows) => {
                passes_run.push(id);
                findings.extend(rows);
            }
            None => passes_skipped.push((id, "interrupted".to_string())),
        }
    }
    passes_skipped.sort();
    let interrupted = cancel.load(Ordering::Relaxed);
    let report = aggregate(findings);
    tracing::info!(
        passes_run = passes_run.len(),
        passes_skipped = passes_skipped.len(),
        errors = report.summary.errors,
        warnings = report.summary.warnings,
        infos = report.summary.infos,
        interrupted,
        "run finished"
    );
    Ok(RunOutcome {
        report,
        passes_run,
        passes_skipped,
        interrupted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::fixture::{corpus, run};

    fn exploding(_ctx: &PassContext<'_>) -> Vec<Finding> {
        panic!("index out of range")
    }

    #[test]
    fn default_selection_excludes_opt_in() {
        let ids = select_passes(&Selectors::default())
            .iter()
            .map(|spec| spec.id)
            .collect::<Vec<_>>();
        assert_eq!(ids.len(), 8);
        assert!(!ids.contains(&PassId::LiveUrls));

        let all = select_passes(&Selectors {
            only: Vec::new(),
            include_opt_in: true,
        });
        assert_eq!(all.len(), 9);

        let only = select_passes(&Selectors {
            only: vec![PassId::LiveUrls, PassId::Toc],
            include_opt_in: false,
        });
        let ids = only.iter().map(|spec| spec.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![PassId::Toc, PassId::LiveUrls]);
    }

    #[test]
    fn panicking_pass_becomes_a_finding() {
        let findings = run(
            |ctx| execute(PassId::Naming, exploding, ctx),
            &corpus(Vec::new(), Vec::new()),
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, RuleId::PassFailure);
        assert_eq!(findings[0].subject, "naming");
        assert!(findings[0].message.contains("index out of range"));
    }

    #[test]
    fn panic_payloads_are_described() {
        let owned: Box<dyn std::any::Any + Send> = Box::new("boom".to_string());
        assert_eq!(panic_detail(owned.as_ref()), "boom");
        let other: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_detail(other.as_ref()), "unknown panic payload");
    }
}
