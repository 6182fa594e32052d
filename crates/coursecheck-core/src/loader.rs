// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use coursecheck_adapters::Fs;
use coursecheck_model::{AssetFile, Document, LoadError, LoadErrorKind, SummaryTable, TocConfig};
use coursecheck_policies::CorpusPolicy;

use crate::parse::{
    parse_asset, parse_markdown_file, parse_notebook, parse_summary, parse_toc, ParsedDocument,
};
use crate::patterns::Patterns;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorpusError {
    #[error("corpus root {0} does not exist or is not a directory")]
    RootMissing(PathBuf),
    #[error("corpus directory {path} is unreadable: {detail}")]
    Unreadable { path: String, detail: String },
}

/// Everything read from disk for one run. Documents and assets are sorted
/// by path; files that failed to parse appear only in `load_errors`.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub root: PathBuf,
    pub documents: Vec<Document>,
    pub assets: Vec<AssetFile>,
    pub toc: Option<TocConfig>,
    /// Id of the document expected to hold the summary table.
    pub summary_document: Option<String>,
    pub summary: Option<SummaryTable>,
    pub load_errors: Vec<LoadError>,
}

impl Corpus {
    pub fn failed(&self, kind: LoadErrorKind, path: &str) -> bool {
        self.load_errors
            .iter()
            .any(|err| err.kind == kind && err.path == path)
    }
}

fn below(dir: &str, path: &str) -> Option<String> {
    let dir = dir.trim_end_matches('/');
    path.strip_prefix(dir)
        .and_then(|rest| rest.strip_prefix('/'))
        .map(str::to_string)
}

fn is_document_path(book_dir: &str, path: &str) -> bool {
    let Some(rel) = below(book_dir, path) else {
        return false;
    };
    let skipped = rel
        .split('/')
        .any(|part| part.starts_with('_') || part.starts_with('.'));
    !skipped && (path.ends_with(".ipynb") || path.ends_with(".md"))
}

fn is_asset_path(path: &str) -> bool {
    path.ends_with(".json") && !path.split('/').any(|part| part == "_archive")
}

/// True for paths the loader treats as workflow assets: JSON files below
/// `workflows_dir`, outside any `_archive` directory.
pub(crate) fn is_workflow_asset(workflows_dir: &str, path: &str) -> bool {
    below(workflows_dir, path).is_some() && is_asset_path(path)
}

fn walk(fs: &dyn Fs, root: &Path, dir: &str) -> Result<Vec<String>, CorpusError> {
    fs.walk_files(root, Path::new(dir))
        .map_err(|err| CorpusError::Unreadable {
            path: dir.to_string(),
            detail: err.to_string(),
        })
}

fn load_document(
    fs: &dyn Fs,
    root: &Path,
    path: &str,
    patterns: &Patterns,
) -> Result<ParsedDocument, LoadError> {
    let fail = |detail: String| LoadError {
        path: path.to_string(),
        kind: LoadErrorKind::Document,
        detail,
    };
    let text = fs
        .read_text(root, Path::new(path))
        .map_err(|err| fail(err.to_string()))?;
    if path.ends_with(".ipynb") {
        parse_notebook(path, &text, patterns).map_err(fail)
    } else {
        Ok(parse_markdown_file(path, &text, patterns))
    }
}

fn load_asset(fs: &dyn Fs, root: &Path, path: &str) -> Result<AssetFile, LoadError> {
    let fail = |detail: String| LoadError {
        path: path.to_string(),
        kind: LoadErrorKind::Asset,
        detail,
    };
    let text = fs
        .read_text(root, Path::new(path))
        .map_err(|err| fail(err.to_string()))?;
    parse_asset(path, &text).map_err(fail)
}

fn load_toc(
    fs: &dyn Fs,
    root: &Path,
    policy: &CorpusPolicy,
) -> Result<Option<TocConfig>, LoadError> {
    let path = policy.toc_file.as_str();
    if !fs.exists(root, Path::new(path)) {
        return Ok(None);
    }
    let fail = |detail: String| LoadError {
        path: path.to_string(),
        kind: LoadErrorKind::Toc,
        detail,
    };
    let text = fs
        .read_text(root, Path::new(path))
        .map_err(|err| fail(err.to_string()))?;
    parse_toc(path, &text).map(Some).map_err(fail)
}

/// Reads and parses the whole corpus. Only a missing or unreadable root is
/// fatal; every per-file problem is recorded in `load_errors`.
pub fn load_corpus(
    fs: &dyn Fs,
    root: &Path,
    policy: &CorpusPolicy,
    patterns: &Patterns,
) -> Result<Corpus, CorpusError> {
    if !fs.is_dir(root, Path::new(".")) {
        return Err(CorpusError::RootMissing(root.to_path_buf()));
    }

    let mut load_errors = Vec::new();
    let toc = load_toc(fs, root, policy).unwrap_or_else(|err| {
        load_errors.push(err);
        None
    });
    let summary_document = policy
        .summary_document
        .clone()
        .or_else(|| toc.as_ref().and_then(TocConfig::root).map(str::to_string));

    let document_paths = walk(fs, root, &policy.book_dir)?
        .into_iter()
        .filter(|path| is_document_path(&policy.book_dir, path))
        .collect::<Vec<_>>();
    let asset_paths = walk(fs, root, &policy.workflows_dir)?
        .into_iter()
        .filter(|path| is_workflow_asset(&policy.workflows_dir, path))
        .collect::<Vec<_>>();

    let parsed_documents = document_paths
        .par_iter()
        .map(|path| load_document(fs, root, path, patterns))
        .collect::<Vec<_>>();
    let parsed_assets = asset_paths
        .par_iter()
        .map(|path| load_asset(fs, root, path))
        .collect::<Vec<_>>();

    let mut parsed = Vec::new();
    for outcome in parsed_documents {
        match outcome {
            Ok(doc) => parsed.push(doc),
            Err(err) => load_errors.push(err),
        }
    }
    let mut assets = Vec::new();
    for outcome in parsed_assets {
        match outcome {
            Ok(asset) => assets.push(asset),
            Err(err) => load_errors.push(err),
        }
    }

    let summary = summary_document.as_deref().and_then(|id| {
        parsed
            .iter()
            .find(|doc| doc.document.id == id)
            .and_then(|doc| parse_summary(id, &doc.markdown_cells, patterns))
    });

    let mut documents = parsed.into_iter().map(|doc| doc.document).collect::<Vec<_>>();
    documents.sort_by(|a, b| a.path.cmp(&b.path));
    assets.sort_by(|a, b| a.path.cmp(&b.path));
    load_errors.sort();
    for err in &load_errors {
        tracing::warn!(path = %err.path, kind = ?err.kind, detail = %err.detail, "corpus file failed to load");
    }
    tracing::debug!(
        documents = documents.len(),
        assets = assets.len(),
        load_errors = load_errors.len(),
        "corpus loaded"
    );

    Ok(Corpus {
        root: root.to_path_buf(),
        documents,
        assets,
        toc,
        summary_document,
        summary,
        load_errors,
    })
}
