// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use coursecheck_adapters::resolve_relative;
use coursecheck_model::{AssetFile, Block, BlockEntry, Document, Finding, Location, RuleId};

use super::PassContext;
use crate::index::RefTarget;
use crate::parse::runtime_prompts;

/// Trims every line and drops leading and trailing blank lines.
pub(crate) fn normalize_prompt(text: &str) -> String {
    let lines = text.lines().map(str::trim).collect::<Vec<_>>();
    let start = lines.iter().position(|line| !line.is_empty());
    let end = lines.iter().rposition(|line| !line.is_empty());
    match (start, end) {
        (Some(start), Some(end)) => lines[start..=end].join("\n"),
        _ => String::new(),
    }
}

fn cell_of(location: &Location) -> Option<u32> {
    match location {
        Location::Cell { cell, .. } => Some(*cell),
        Location::Node { .. } => None,
    }
}

/// Name from the closest `**Name:**` label above `position` in the same cell.
fn labelled_node(ctx: &PassContext<'_>, blocks: &[BlockEntry], position: usize) -> Option<String> {
    let cell = cell_of(&blocks[position].location)?;
    blocks[..position]
        .iter()
        .rev()
        .take_while(|entry| cell_of(&entry.location) == Some(cell))
        .find_map(|entry| match &entry.block {
            Block::Prose { text } => ctx
                .patterns
                .bold_label
                .captures_iter(text)
                .filter_map(|cap| cap.get(1))
                .last()
                .map(|name| name.as_str().trim().to_string()),
            _ => None,
        })
}

fn candidate_assets<'a>(
    ctx: &PassContext<'a>,
    doc: &Document,
    explicit: Option<&String>,
) -> Vec<&'a AssetFile> {
    let workflows_dir = ctx.policy.workflows_dir.as_str();
    let paths: BTreeSet<String> = match explicit {
        Some(name) => resolve_relative(workflows_dir, name).into_iter().collect(),
        None => ctx
            .index
            .references_from(&doc.id)
            .filter_map(|reference| match &reference.target {
                RefTarget::Asset { path } => Some(path.clone()),
                _ => None,
            })
            .chain(
                ctx.policy
                    .examples
                    .get(&doc.id)
                    .into_iter()
                    .flatten()
                    .filter_map(|name| resolve_relative(workflows_dir, name)),
            )
            .collect(),
    };
    paths
        .iter()
        .filter_map(|path| ctx.index.asset(path))
        .collect()
}

struct Candidate<'a> {
    asset: &'a str,
    node: &'a str,
    prompt: String,
}

fn check_block(
    ctx: &PassContext<'_>,
    doc: &Document,
    position: usize,
    info: &BTreeMap<String, String>,
    text: &str,
) -> Option<Finding> {
    let documented = normalize_prompt(text);
    if documented.is_empty() {
        return None;
    }
    let node_name = info
        .get("node")
        .cloned()
        .or_else(|| labelled_node(ctx, &doc.blocks, position));
    let assets = candidate_assets(ctx, doc, info.get("asset"));
    if assets.is_empty() {
        return None;
    }
    let location = doc.blocks[position].location.clone();

    let mut candidates = Vec::new();
    for asset in &assets {
        for (_, node) in asset.functional_nodes() {
            if node_name.as_deref().is_some_and(|name| node.name != name) {
                continue;
            }
            for prompt in runtime_prompts(node) {
                candidates.push(Candidate {
                    asset: asset.path.as_str(),
                    node: node.name.as_str(),
                    prompt: normalize_prompt(&prompt),
                });
            }
        }
    }

    if candidates.is_empty() {
        let name = node_name?;
        let searched = assets
            .iter()
            .map(|asset| asset.path.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let has_node = assets
            .iter()
            .any(|asset| asset.functional_nodes().any(|(_, node)| node.name == name));
        if has_node {
            return None;
        }
        return Some(Finding::warning(
            RuleId::PromptDrift,
            &doc.path,
            Some(location),
            format!("documented prompt names node `{name}` which is not in {searched}"),
        ));
    }
    if candidates
        .iter()
        .any(|candidate| candidate.prompt.contains(&documented))
    {
        return None;
    }
    let first = &candidates[0];
    Some(Finding::warning(
        RuleId::PromptDrift,
        &doc.path,
        Some(location),
        format!(
            "documented prompt differs from the runtime prompt of node `{}` in {}",
            first.node, first.asset
        ),
    ))
}

/// Documented prompt blocks must appear verbatim, modulo indentation and
/// surrounding blank lines, in the workflow node they describe.
pub(super) fn check_prompts(ctx: &PassContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();
    for doc in &ctx.corpus.documents {
        for (position, entry) in doc.blocks.iter().enumerate() {
            let Block::CodeSample {
                language,
                info,
                text,
            } = &entry.block
            else {
                continue;
            };
            if !ctx.policy.is_prompt_language(language) {
                continue;
            }
            findings.extend(check_block(ctx, doc, position, info, text));
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::fixture::{asset, corpus, md, run};
    use coursecheck_model::Severity;

    const WORKFLOW: &str = r#"{"nodes":[
      {"name":"Note","type":"n8n-nodes-base.stickyNote","parameters":{"content":"You are a careful planner."}},
      {"name":"AI Agent","type":"@n8n/n8n-nodes-langchain.agent","parameters":{"options":{"systemMessage":"=You are a careful planner.\nAlways answer in bullet points.\nKeep it short."}}},
      {"name":"Writer","type":"@n8n/n8n-nodes-langchain.chainLlm","parameters":{"messages":{"messageValues":[{"message":"Write a haiku."}]}}}
    ]}"#;

    fn doc(body: &str) -> Document {
        md(
            "book/05_agents.md",
            &format!("# Chapter 5: Agents\n\nImport 05_agent.json.\n\n{body}"),
        )
    }

    fn check(body: &str) -> Vec<Finding> {
        let assets = vec![asset("book/_static/workflows/05_agent.json", WORKFLOW)];
        run(check_prompts, &corpus(vec![doc(body)], assets))
    }

    #[test]
    fn normalization_trims_lines_and_outer_blank_lines() {
        assert_eq!(normalize_prompt("\n\n  a  \n\n b\n \n"), "a\n\nb");
        assert_eq!(normalize_prompt(" \n "), "");
    }

    #[test]
    fn labelled_substring_matches() {
        let findings = check(
            "**AI Agent:**\n```prompt\n  Always answer in bullet points.\n  Keep it short.\n```\n",
        );
        assert!(findings.is_empty(), "{findings:?}");
    }

    #[test]
    fn one_changed_word_is_one_drift_naming_both_sides() {
        let findings = check(
            "**AI Agent (Tools Agent):**\n```prompt\nAlways answer in numbered points.\n```\n",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].rule, RuleId::PromptDrift);
        assert_eq!(findings[0].subject, "book/05_agents.md");
        assert_eq!(findings[0].location, Some(Location::cell(0, 6)));
        assert!(findings[0].message.contains("`AI Agent`"));
        assert!(findings[0].message.contains("book/_static/workflows/05_agent.json"));
    }

    #[test]
    fn info_string_selects_node_and_asset() {
        let findings = check("```prompt node=\"Writer\" asset=05_agent.json\nWrite a haiku.\n```\n");
        assert!(findings.is_empty(), "{findings:?}");
        let findings = check("```prompt node=\"Critic\"\nBe harsh.\n```\n");
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("`Critic`"));
    }

    #[test]
    fn annotations_are_not_prompt_sources() {
        let findings = check("**Note:**\n```prompt\nYou are a careful planner.\n```\n");
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn prompts_without_loaded_assets_are_skipped() {
        let docs = vec![md(
            "book/06_x.md",
            "# Chapter 6: X\n\n**AI Agent:**\n```prompt\nanything\n```\n",
        )];
        assert!(run(check_prompts, &corpus(docs, Vec::new())).is_empty());
    }
}
