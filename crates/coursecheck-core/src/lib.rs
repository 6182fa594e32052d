// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! Loads a course corpus (lesson notebooks, workflow exports, the table of
//! contents), indexes every reference between them and runs the
//! consistency passes that produce a [`Report`].

mod index;
mod loader;
mod parse;
pub mod passes;
mod patterns;
mod report;
mod runner;

pub use index::{RefOrigin, RefTarget, Reference, ReferenceIndex};
pub use loader::{load_corpus, Corpus, CorpusError};
pub use passes::{builtin_pass_fn, catalog, AdapterSet, PassContext, PassFn, PassSpec};
pub use patterns::Patterns;
pub use report::{
    aggregate, exit_code_for_report, fingerprint, render_json, render_text, render_text_summary,
    Report,
};
pub use runner::{run_passes, select_passes, RunError, RunOutcome, RunRequest, Selectors};
