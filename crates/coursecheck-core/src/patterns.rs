// SPDX-License-Identifier: Apache-2.0

use regex::Regex;

/// Regular expressions shared by the parsers, the index and the passes,
/// compiled once per run.
#[derive(Debug, Clone)]
pub struct Patterns {
    /// `[text](target)` and `![alt](target)`, with an optional title.
    pub(crate) link: Regex,
    /// MyST role ``{download}`label <path>` `` or ``{download}`path` ``.
    pub(crate) download: Regex,
    /// `**Node Name:**` labels preceding documented prompts. A trailing
    /// dash clause or parenthetical inside the label is not part of the name.
    pub(crate) bold_label: Regex,
    /// Workflow file names mentioned in running text, e.g. `05_ai_agent.json`.
    pub(crate) asset_mention: Regex,
    pub(crate) bare_url: Regex,
    /// `key=value` / `key="value"` attributes after a fence language.
    pub(crate) info_attr: Regex,
}

impl Patterns {
    pub fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            link: Regex::new(r#"!?\[([^\]]*)\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#)?,
            download: Regex::new(r"\{download\}`([^`]+)`")?,
            bold_label: Regex::new(
                r"\*\*([^*]+?)(?:(?:\s*[\x{2014}\x{2013}]|\s+-)\s*[^*]+)?(?:\s*\([^)]+\))?:\*\*",
            )?,
            asset_mention: Regex::new(r"\b\d{2}_[A-Za-z0-9_]+\.json\b")?,
            bare_url: Regex::new(r#"https?://[^\s)\]>"'<`]+"#)?,
            info_attr: Regex::new(r#"([A-Za-z][\w-]*)=(?:"([^"]*)"|(\S+))"#)?,
        })
    }
}

/// Strips punctuation that commonly trails a URL in prose.
pub(crate) fn trim_url(raw: &str) -> &str {
    raw.trim_end_matches(['.', ',', ';', ':', '!', '?', '*', '_'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_patterns_compile() {
        assert!(Patterns::compile().is_ok());
    }

    #[test]
    fn bold_label_drops_dash_clause_and_parenthetical() {
        let patterns = Patterns::compile().expect("patterns");
        let names = [
            "**AI Agent:**",
            "**Step 1 \u{2014} Create Outline:**",
            "**Classifier (Basic LLM Chain):**",
            "**Follow-up Agent:**",
        ]
        .iter()
        .filter_map(|text| {
            patterns
                .bold_label
                .captures(text)
                .and_then(|cap| cap.get(1))
                .map(|m| m.as_str().to_string())
        })
        .collect::<Vec<_>>();
        assert_eq!(names, vec!["AI Agent", "Step 1", "Classifier", "Follow-up Agent"]);
    }

    #[test]
    fn url_trimming() {
        assert_eq!(trim_url("https://a.io/x."), "https://a.io/x");
        assert_eq!(trim_url("https://a.io/x"), "https://a.io/x");
    }
}
