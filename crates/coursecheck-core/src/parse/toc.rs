// SPDX-License-Identifier: Apache-2.0

use serde_yaml::Value;

use coursecheck_model::TocConfig;

use super::notebook::file_stem;

fn entry_id(raw: &str) -> String {
    file_stem(raw.trim()).to_string()
}

fn collect_entries(entries: &Value, out: &mut Vec<String>) {
    let Some(list) = entries.as_sequence() else {
        return;
    };
    for entry in list {
        if let Some(file) = entry.get("file").and_then(Value::as_str) {
            out.push(entry_id(file));
        }
        for nested in ["chapters", "sections"] {
            if let Some(children) = entry.get(nested) {
                collect_entries(children, out);
            }
        }
    }
}

/// Flattens a Jupyter Book `_toc.yml` into document ids in reading order.
/// `url` and `glob` entries name no document and are skipped.
pub(crate) fn parse_toc(path: &str, text: &str) -> Result<TocConfig, String> {
    let root: Value = serde_yaml::from_str(text).map_err(|err| format!("invalid YAML: {err}"))?;
    if !root.is_mapping() {
        return Err("table of contents is not a mapping".to_string());
    }
    let root_file = root
        .get("root")
        .and_then(Value::as_str)
        .ok_or_else(|| "table of contents has no `root` entry".to_string())?;

    let mut entries = vec![entry_id(root_file)];
    if let Some(chapters) = root.get("chapters") {
        collect_entries(chapters, &mut entries);
    }
    if let Some(parts) = root.get("parts").and_then(Value::as_sequence) {
        for part in parts {
            if let Some(chapters) = part.get("chapters") {
                collect_entries(chapters, &mut entries);
            }
        }
    }
    Ok(TocConfig {
        path: path.to_string(),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_parts_chapters_and_sections_in_order() {
        let toc = parse_toc(
            "book/_toc.yml",
            r#"
format: jb-book
root: index
parts:
  - caption: Foundations
    chapters:
      - file: 01_intro
      - file: 02_prompts.ipynb
        sections:
          - file: part/02a_deep_dive
  - caption: Reference
    chapters:
      - file: appendix_a_tools
      - url: https://docs.n8n.io
"#,
        )
        .expect("toc");
        assert_eq!(toc.root(), Some("index"));
        assert_eq!(
            toc.entries,
            vec!["index", "01_intro", "02_prompts", "02a_deep_dive", "appendix_a_tools"]
        );
    }

    #[test]
    fn top_level_chapters_are_read() {
        let toc = parse_toc("t.yml", "root: intro\nchapters:\n  - file: 01_a\n").expect("toc");
        assert_eq!(toc.entries, vec!["intro", "01_a"]);
    }

    #[test]
    fn missing_root_or_bad_yaml_is_an_error() {
        assert!(parse_toc("t.yml", "chapters: []\n").is_err());
        assert!(parse_toc("t.yml", "- a\n- b\n").is_err());
        assert!(parse_toc("t.yml", "root: [unclosed\n").is_err());
    }
}
