// SPDX-License-Identifier: Apache-2.0

//! Format readers for the corpus: notebooks and markdown lessons, workflow
//! exports, the Jupyter Book table of contents and the summary table.

mod asset;
mod markdown;
mod notebook;
mod summary;
mod toc;

pub(crate) use asset::{parse_asset, runtime_prompts};
pub(crate) use notebook::{file_stem, parse_markdown_file, parse_notebook, ParsedDocument};
pub(crate) use summary::parse_summary;
pub(crate) use toc::parse_toc;
