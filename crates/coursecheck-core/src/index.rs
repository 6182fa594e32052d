// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use coursecheck_adapters::resolve_relative;
use coursecheck_model::{AssetFile, Block, Document, LoadErrorKind, Location};
use coursecheck_policies::CorpusPolicy;

use crate::loader::{is_workflow_asset, Corpus};
use crate::parse::file_stem;
use crate::patterns::{trim_url, Patterns};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RefOrigin {
    Link,
    Download,
    /// A workflow file name or a bare URL written in running text or code.
    Mention,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTarget {
    Asset { path: String },
    /// Any other corpus file, e.g. an image or a zip archive.
    File { path: String },
    /// `path` is the corpus-relative file the link resolves to.
    Document {
        id: String,
        path: String,
        anchor: Option<String>,
    },
    External { url: String },
    /// A relative path that climbs above the corpus root.
    OutsideRoot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub source_id: String,
    pub source_path: String,
    pub location: Location,
    pub origin: RefOrigin,
    /// Target text as written in the document.
    pub raw: String,
    pub target: RefTarget,
}

fn extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rsplit_once('.').map(|(_, ext)| ext)
}

fn ignored_scheme(target: &str) -> bool {
    ["mailto:", "tel:", "data:", "javascript:"]
        .iter()
        .any(|scheme| target.starts_with(scheme))
}

fn external(target: &str) -> Option<RefTarget> {
    (target.starts_with("http://") || target.starts_with("https://")).then(|| RefTarget::External {
        url: target.to_string(),
    })
}

/// JSON files count as workflow assets only below the workflows directory.
fn file_target(base_dir: &str, path: &str, workflows_dir: &str) -> RefTarget {
    match resolve_relative(base_dir, path) {
        Some(resolved) if is_workflow_asset(workflows_dir, &resolved) => {
            RefTarget::Asset { path: resolved }
        }
        Some(resolved) => RefTarget::File { path: resolved },
        None => RefTarget::OutsideRoot,
    }
}

/// Classifies a link target written in `doc`. `None` for targets that name
/// nothing checkable.
pub(crate) fn classify_link(
    doc: &Document,
    target: &str,
    workflows_dir: &str,
) -> Option<RefTarget> {
    let target = target.trim();
    if target.is_empty() || ignored_scheme(target) {
        return None;
    }
    if target.contains("://") {
        return external(target);
    }
    if let Some(anchor) = target.strip_prefix('#') {
        return Some(RefTarget::Document {
            id: doc.id.clone(),
            path: doc.path.clone(),
            anchor: Some(anchor.to_string()).filter(|a| !a.is_empty()),
        });
    }
    let (path, anchor) = match target.split_once('#') {
        Some((path, anchor)) => (path, Some(anchor.to_string()).filter(|a| !a.is_empty())),
        None => (target, None),
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.ends_with('/') {
        return Some(file_target(doc.dir(), path.trim_end_matches('/'), workflows_dir));
    }
    match extension(path) {
        None | Some("ipynb" | "md" | "html") => {
            let Some(resolved) = resolve_relative(doc.dir(), path) else {
                return Some(RefTarget::OutsideRoot);
            };
            Some(RefTarget::Document {
                id: file_stem(path).to_string(),
                path: resolved,
                anchor,
            })
        }
        Some(_) => Some(file_target(doc.dir(), path, workflows_dir)),
    }
}

fn classify_download(doc: &Document, asset_path: &str, workflows_dir: &str) -> Option<RefTarget> {
    let asset_path = asset_path.trim();
    if asset_path.is_empty() {
        return None;
    }
    if asset_path.contains("://") {
        return external(asset_path);
    }
    Some(file_target(doc.dir(), asset_path, workflows_dir))
}

fn prose_and_code(block: &Block) -> Option<&str> {
    match block {
        Block::Prose { text } | Block::CodeSample { text, .. } => Some(text),
        Block::Link { .. } | Block::DownloadDirective { .. } => None,
    }
}

fn document_references(
    doc: &Document,
    workflows_dir: &str,
    patterns: &Patterns,
) -> Vec<Reference> {
    let make = |location: &Location, origin: RefOrigin, raw: &str, target: RefTarget| Reference {
        source_id: doc.id.clone(),
        source_path: doc.path.clone(),
        location: location.clone(),
        origin,
        raw: raw.to_string(),
        target,
    };

    let mut out = Vec::new();
    for entry in &doc.blocks {
        match &entry.block {
            Block::Link { target, .. } => {
                if let Some(resolved) = classify_link(doc, target, workflows_dir) {
                    out.push(make(&entry.location, RefOrigin::Link, target, resolved));
                }
            }
            Block::DownloadDirective { asset_path } => {
                if let Some(resolved) = classify_download(doc, asset_path, workflows_dir) {
                    out.push(make(&entry.location, RefOrigin::Download, asset_path, resolved));
                }
            }
            Block::Prose { .. } | Block::CodeSample { .. } => {}
        }
    }

    let explicit_assets = out
        .iter()
        .filter_map(|reference| match &reference.target {
            RefTarget::Asset { path } => Some(path.clone()),
            _ => None,
        })
        .collect::<BTreeSet<_>>();
    let explicit_urls = out
        .iter()
        .filter_map(|reference| match &reference.target {
            RefTarget::External { url } => Some(url.clone()),
            _ => None,
        })
        .collect::<BTreeSet<_>>();

    let mut mentioned_assets = BTreeSet::new();
    let mut mentioned_urls = BTreeSet::new();
    for entry in &doc.blocks {
        let Some(text) = prose_and_code(&entry.block) else {
            continue;
        };
        for found in patterns.asset_mention.find_iter(text) {
            let Some(path) = resolve_relative(workflows_dir, found.as_str()) else {
                continue;
            };
            if explicit_assets.contains(&path) || !mentioned_assets.insert(path.clone()) {
                continue;
            }
            out.push(make(
                &entry.location,
                RefOrigin::Mention,
                found.as_str(),
                RefTarget::Asset { path },
            ));
        }
        if matches!(entry.block, Block::Prose { .. }) {
            for found in patterns.bare_url.find_iter(text) {
                let url = trim_url(found.as_str()).to_string();
                if explicit_urls.contains(&url) || !mentioned_urls.insert(url.clone()) {
                    continue;
                }
                out.push(make(
                    &entry.location,
                    RefOrigin::Mention,
                    found.as_str(),
                    RefTarget::External { url },
                ));
            }
        }
    }
    out
}

/// Lookup tables over a loaded corpus and every reference its documents
/// make. Built once per run; passes only read it.
#[derive(Debug)]
pub struct ReferenceIndex<'a> {
    assets: BTreeMap<&'a str, &'a AssetFile>,
    documents: BTreeMap<&'a str, &'a Document>,
    failed_assets: BTreeSet<&'a str>,
    failed_documents: BTreeSet<String>,
    references: Vec<Reference>,
    inbound_assets: BTreeMap<String, usize>,
    inbound_documents: BTreeMap<String, BTreeSet<String>>,
}

impl<'a> ReferenceIndex<'a> {
    pub fn build(corpus: &'a Corpus, policy: &CorpusPolicy, patterns: &Patterns) -> Self {
        let assets = corpus
            .assets
            .iter()
            .map(|asset| (asset.path.as_str(), asset))
            .collect();
        let mut documents = BTreeMap::new();
        for doc in &corpus.documents {
            documents.entry(doc.id.as_str()).or_insert(doc);
        }
        let failed_assets = corpus
            .load_errors
            .iter()
            .filter(|err| err.kind == LoadErrorKind::Asset)
            .map(|err| err.path.as_str())
            .collect();
        let failed_documents = corpus
            .load_errors
            .iter()
            .filter(|err| err.kind == LoadErrorKind::Document)
            .map(|err| file_stem(&err.path).to_string())
            .collect();

        let references = corpus
            .documents
            .iter()
            .flat_map(|doc| document_references(doc, &policy.workflows_dir, patterns))
            .collect::<Vec<_>>();

        let mut inbound_assets = BTreeMap::new();
        let mut inbound_documents: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for reference in &references {
            match &reference.target {
                RefTarget::Asset { path } => *inbound_assets.entry(path.clone()).or_insert(0) += 1,
                RefTarget::Document { id, .. } if *id != reference.source_id => {
                    inbound_documents
                        .entry(id.clone())
                        .or_default()
                        .insert(reference.source_id.clone());
                }
                _ => {}
            }
        }

        Self {
            assets,
            documents,
            failed_assets,
            failed_documents,
            references,
            inbound_assets,
            inbound_documents,
        }
    }

    pub fn asset(&self, path: &str) -> Option<&'a AssetFile> {
        self.assets.get(path).copied()
    }

    pub fn document(&self, id: &str) -> Option<&'a Document> {
        self.documents.get(id).copied()
    }

    pub fn is_failed_asset(&self, path: &str) -> bool {
        self.failed_assets.contains(path)
    }

    pub fn is_failed_document(&self, id: &str) -> bool {
        self.failed_documents.contains(id)
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    pub fn references_from<'s>(&'s self, doc_id: &'s str) -> impl Iterator<Item = &'s Reference> {
        self.references
            .iter()
            .filter(move |reference| reference.source_id == doc_id)
    }

    pub fn inbound_assets(&self, path: &str) -> usize {
        self.inbound_assets.get(path).copied().unwrap_or(0)
    }

    /// Number of distinct other documents referencing `id`.
    pub fn inbound_documents(&self, id: &str) -> usize {
        self.inbound_documents.get(id).map_or(0, BTreeSet::len)
    }
}
