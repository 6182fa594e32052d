// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde_json::Value;

use coursecheck_model::{AssetFile, AssetNode};

fn parse_node(index: usize, raw: &Value) -> Result<AssetNode, String> {
    let object = raw
        .as_object()
        .ok_or_else(|| format!("node {index} is not an object"))?;
    let name = object
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("node {index} has no string `name`"))?;
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("node {index} `{name}` has no string `type`"))?;
    let parameters = match object.get("parameters") {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(map)) => map.clone().into_iter().collect(),
        Some(_) => return Err(format!("node {index} `{name}` has non-object `parameters`")),
    };
    let position = match object.get("position").and_then(Value::as_array) {
        Some(pair) if pair.len() == 2 => match (pair[0].as_f64(), pair[1].as_f64()) {
            (Some(x), Some(y)) => Some([x, y]),
            _ => return Err(format!("node {index} `{name}` has non-numeric `position`")),
        },
        Some(_) => return Err(format!("node {index} `{name}` has malformed `position`")),
        None => None,
    };
    Ok(AssetNode {
        name: name.to_string(),
        kind: kind.to_string(),
        parameters,
        position,
    })
}

/// Parses an exported workflow. The root must be an object with a `nodes`
/// array; every node needs a string `name` and `type`.
pub(crate) fn parse_asset(path: &str, text: &str) -> Result<AssetFile, String> {
    let root: Value = serde_json::from_str(text).map_err(|err| format!("invalid JSON: {err}"))?;
    let object = root
        .as_object()
        .ok_or_else(|| "workflow root is not an object".to_string())?;
    let nodes = object
        .get("nodes")
        .and_then(Value::as_array)
        .ok_or_else(|| "workflow has no `nodes` array".to_string())?
        .iter()
        .enumerate()
        .map(|(index, raw)| parse_node(index, raw))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(AssetFile {
        path: path.to_string(),
        name: path.rsplit('/').next().unwrap_or(path).to_string(),
        workflow_name: object
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string),
        nodes,
    })
}

fn expression_text(value: &Value) -> Option<String> {
    let text = value.as_str()?;
    let text = text.strip_prefix('=').unwrap_or(text);
    (!text.trim().is_empty()).then(|| text.to_string())
}

/// Prompt texts a node sends at runtime, in a fixed parameter order.
pub(crate) fn runtime_prompts(node: &AssetNode) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(text) = node
        .parameters
        .get("options")
        .and_then(|options| options.get("systemMessage"))
        .and_then(expression_text)
    {
        out.push(text);
    }
    for key in ["systemMessage", "text"] {
        if let Some(text) = node.parameters.get(key).and_then(expression_text) {
            out.push(text);
        }
    }
    if let Some(values) = node
        .parameters
        .get("messages")
        .and_then(|messages| messages.get("messageValues"))
        .and_then(Value::as_array)
    {
        out.extend(
            values
                .iter()
                .filter_map(|entry| entry.get("message"))
                .filter_map(expression_text),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKFLOW: &str = r#"{
  "name": "Prompt chaining",
  "nodes": [
    {"name": "Note", "type": "n8n-nodes-base.stickyNote", "parameters": {"content": "Documentation: https://x.github.io/c/02.html"}, "position": [0, 0]},
    {"name": "AI Agent", "type": "@n8n/n8n-nodes-langchain.agent", "parameters": {"text": "={{ $json.input }}", "options": {"systemMessage": "=You are a planner."}}, "position": [200, 0]},
    {"name": "Chain", "type": "@n8n/n8n-nodes-langchain.chainLlm", "parameters": {"messages": {"messageValues": [{"message": "Summarize."}, {"type": "HumanMessagePromptTemplate"}]}}},
    {"name": "Trigger", "type": "n8n-nodes-base.manualTrigger"}
  ],
  "connections": {}
}"#;

    #[test]
    fn parses_nodes_in_creation_order() {
        let asset = parse_asset("book/_static/workflows/02_chain.json", WORKFLOW).expect("asset");
        assert_eq!(asset.name, "02_chain.json");
        assert_eq!(asset.workflow_name.as_deref(), Some("Prompt chaining"));
        let names = asset.nodes.iter().map(|n| n.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Note", "AI Agent", "Chain", "Trigger"]);
        assert_eq!(asset.functional_nodes().count(), 3);
        assert_eq!(asset.nodes[1].position, Some([200.0, 0.0]));
        assert!(asset.nodes[3].parameters.is_empty());
    }

    #[test]
    fn runtime_prompts_strip_expression_marker() {
        let asset = parse_asset("w.json", WORKFLOW).expect("asset");
        assert_eq!(
            runtime_prompts(&asset.nodes[1]),
            vec!["You are a planner.".to_string(), "{{ $json.input }}".to_string()]
        );
        assert_eq!(runtime_prompts(&asset.nodes[2]), vec!["Summarize.".to_string()]);
        assert!(runtime_prompts(&asset.nodes[3]).is_empty());
    }

    #[test]
    fn structural_problems_are_reported() {
        assert!(parse_asset("w.json", "[]").is_err());
        assert!(parse_asset("w.json", "{\"name\": \"x\"}").is_err());
        assert!(parse_asset("w.json", "{\"nodes\": [{\"name\": \"a\"}]}").is_err());
        assert!(parse_asset("w.json", "{\"nodes\": [{\"name\": \"a\", \"type\": \"t\", \"parameters\": 3}]}").is_err());
        assert!(parse_asset("w.json", "{\"nodes\": [}").is_err());
        let empty = parse_asset("w.json", "{\"nodes\": []}").expect("empty");
        assert!(empty.nodes.is_empty());
    }
}
