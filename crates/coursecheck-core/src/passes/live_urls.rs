// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::sync::atomic::Ordering;

use rayon::prelude::*;

use coursecheck_model::{Finding, Location, RuleId};

use super::PassContext;
use crate::index::RefTarget;

/// Every referencing document of each distinct URL, with its first location.
fn url_sources(ctx: &PassContext<'_>) -> BTreeMap<String, BTreeMap<String, Location>> {
    let mut out: BTreeMap<String, BTreeMap<String, Location>> = BTreeMap::new();
    for reference in ctx.index.references() {
        let RefTarget::External { url } = &reference.target else {
            continue;
        };
        if ctx
            .policy
            .live_url_allowlist
            .iter()
            .any(|prefix| url.starts_with(prefix.as_str()))
        {
            continue;
        }
        out.entry(url.clone())
            .or_default()
            .entry(reference.source_path.clone())
            .or_insert_with(|| reference.location.clone());
    }
    out
}

/// `None` when alive or skipped after cancellation, else the failure detail.
fn probe(ctx: &PassContext<'_>, url: &str) -> Option<String> {
    if ctx.cancel.load(Ordering::Relaxed) {
        return None;
    }
    match ctx.adapters.network.probe(url, ctx.policy.live_url_timeout()) {
        Ok(status) if (200..400).contains(&status) => None,
        Ok(status) => Some(format!("HTTP status {status}")),
        Err(err) => Some(err.to_string()),
    }
}

pub(super) fn check_live_urls(ctx: &PassContext<'_>) -> Vec<Finding> {
    let sources = url_sources(ctx);
    let urls = sources.keys().map(String::as_str).collect::<Vec<_>>();
    tracing::debug!(urls = urls.len(), workers = ctx.policy.live_url_workers, "probing external urls");

    let outcomes = match rayon::ThreadPoolBuilder::new()
        .num_threads(ctx.policy.live_url_workers)
        .thread_name(|i| format!("coursecheck-url-{i}"))
        .build()
    {
        Ok(pool) => pool.install(|| urls.par_iter().map(|url| probe(ctx, url)).collect::<Vec<_>>()),
        Err(err) => {
            tracing::warn!(error = %err, "url worker pool unavailable; probing sequentially");
            urls.iter().map(|url| probe(ctx, url)).collect()
        }
    };

    let mut findings = Vec::new();
    for (url, outcome) in urls.iter().zip(outcomes) {
        let Some(detail) = outcome else {
            continue;
        };
        for (source_path, location) in sources.get(*url).into_iter().flatten() {
            findings.push(Finding::warning(
                RuleId::DeadLink,
                source_path,
                Some(location.clone()),
                format!("`{url}` is unreachable: {detail}"),
            ));
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::fixture::{corpus, md, run_cancellable, run_with, ListedFs};
    use coursecheck_adapters::{AdapterError, Network};
    use coursecheck_model::Severity;
    use coursecheck_policies::CorpusPolicy;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::sync::Arc;
    use std::time::Duration;

    struct FakeNetwork {
        calls: AtomicUsize,
    }

    impl Network for FakeNetwork {
        fn probe(&self, url: &str, _timeout: Duration) -> Result<u16, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.contains("gone") {
                Ok(404)
            } else if url.contains("slow") {
                Err(AdapterError::Network {
                    url: url.to_string(),
                    detail: "operation timed out".to_string(),
                })
            } else if url.contains("moved") {
                Ok(301)
            } else {
                Ok(200)
            }
        }
    }

    /// Raises the run's cancel flag during its first probe.
    struct InterruptingNetwork {
        calls: AtomicUsize,
        cancel: Arc<AtomicBool>,
    }

    impl Network for InterruptingNetwork {
        fn probe(&self, _url: &str, _timeout: Duration) -> Result<u16, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.cancel.store(true, Ordering::SeqCst);
            Ok(200)
        }
    }

    #[test]
    fn cancellation_stops_remaining_probes() {
        let docs = vec![md(
            "book/01_a.md",
            "# Chapter 1: A\n\nhttps://x.io/one https://x.io/two https://x.io/three https://x.io/four\n",
        )];
        let cancel = Arc::new(AtomicBool::new(false));
        let network = InterruptingNetwork {
            calls: AtomicUsize::new(0),
            cancel: Arc::clone(&cancel),
        };
        let policy = CorpusPolicy::from_toml_str("live_url_workers = 1\n").expect("policy");
        let findings = run_cancellable(
            check_live_urls,
            &corpus(docs, Vec::new()),
            &policy,
            &ListedFs(Vec::new()),
            &network,
            &cancel,
        );
        assert_eq!(network.calls.load(Ordering::SeqCst), 1);
        assert!(findings.is_empty(), "{findings:?}");
    }

    #[test]
    fn dead_urls_are_reported_per_referencing_document() {
        let docs = vec![
            md(
                "book/01_a.md",
                "# Chapter 1: A\n\n[ok](https://n8n.io/) [gone](https://x.io/gone) see https://x.io/gone again.\nAlso https://x.io/moved and https://x.io/slow.\n",
            ),
            md("book/02_b.md", "# Chapter 2: B\n\n[gone](https://x.io/gone)\n"),
            md("book/03_c.md", "# Chapter 3: C\n\nhttps://internal.example/gone\n"),
        ];
        let network = FakeNetwork {
            calls: AtomicUsize::new(0),
        };
        let policy = CorpusPolicy::from_toml_str(
            "live_url_workers = 2\nlive_url_allowlist = [\"https://internal.example/\"]\n",
        )
        .expect("policy");
        let findings = run_with(
            check_live_urls,
            &corpus(docs, Vec::new()),
            &policy,
            &ListedFs(Vec::new()),
            &network,
        );
        assert_eq!(network.calls.load(Ordering::SeqCst), 4);
        let rows = findings
            .iter()
            .map(|f| (f.severity, f.subject.as_str(), f.message.contains("timed out")))
            .collect::<Vec<_>>();
        assert_eq!(
            rows,
            vec![
                (Severity::Warning, "book/01_a.md", false),
                (Severity::Warning, "book/01_a.md", true),
                (Severity::Warning, "book/02_b.md", false),
            ]
        );
        assert_eq!(findings[0].location, Some(Location::cell(0, 3)));
    }
}
