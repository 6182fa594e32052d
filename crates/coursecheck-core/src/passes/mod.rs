// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::AtomicBool;

use regex::Regex;

use coursecheck_adapters::{Fs, Network};
use coursecheck_model::{Effect, Finding, PassId};
use coursecheck_policies::CorpusPolicy;

use crate::index::ReferenceIndex;
use crate::loader::Corpus;
use crate::patterns::Patterns;

mod anchors;
mod assets;
mod downloads;
mod inventory;
mod live_urls;
mod naming;
mod prompts;
mod references;
mod toc;

pub struct AdapterSet<'a> {
    pub fs: &'a dyn Fs,
    pub network: &'a dyn Network,
}

/// Read-only view handed to every pass.
pub struct PassContext<'a> {
    pub corpus: &'a Corpus,
    pub index: &'a ReferenceIndex<'a>,
    pub policy: &'a CorpusPolicy,
    pub publish_url: &'a Regex,
    pub patterns: &'a Patterns,
    pub adapters: AdapterSet<'a>,
    pub cancel: &'a AtomicBool,
}

pub type PassFn = fn(&PassContext<'_>) -> Vec<Finding>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSpec {
    pub id: PassId,
    pub title: &'static str,
    /// Opt-in passes run only when named or explicitly enabled.
    pub default_enabled: bool,
    pub effects_required: &'static [Effect],
}

const FS_ONLY: &[Effect] = &[Effect::FsRead];

/// Every pass in execution order.
pub fn catalog() -> Vec<PassSpec> {
    PassId::ALL
        .into_iter()
        .map(|id| {
            let (title, default_enabled, effects_required): (&'static str, bool, &'static [Effect]) =
                match id {
                    PassId::References => ("links and mentions resolve", true, FS_ONLY),
                    PassId::Assets => ("workflow assets load and are used", true, FS_ONLY),
                    PassId::Prompts => ("documented prompts match workflows", true, FS_ONLY),
                    PassId::Naming => ("chapter sequence and titles", true, FS_ONLY),
                    PassId::Toc => ("table of contents matches summary", true, FS_ONLY),
                    PassId::Anchors => ("workflow documentation notes", true, FS_ONLY),
                    PassId::Downloads => ("download targets exist", true, FS_ONLY),
                    PassId::Inventory => ("unreferenced files", true, FS_ONLY),
                    PassId::LiveUrls => (
                        "external URLs respond",
                        false,
                        &[Effect::FsRead, Effect::Network],
                    ),
                };
            PassSpec {
                id,
                title,
                default_enabled,
                effects_required,
            }
        })
        .collect()
}

pub fn builtin_pass_fn(id: PassId) -> PassFn {
    match id {
        PassId::References => references::check_references,
        PassId::Assets => assets::check_assets,
        PassId::Prompts => prompts::check_prompts,
        PassId::Naming => naming::check_naming,
        PassId::Toc => toc::check_toc,
        PassId::Anchors => anchors::check_anchors,
        PassId::Downloads => downloads::check_downloads,
        PassId::Inventory => inventory::check_inventory,
        PassId::LiveUrls => live_urls::check_live_urls,
    }
}
