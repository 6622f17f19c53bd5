use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;
use vcontrol_xml::{Descendants, Document, NodeKind};

use crate::common;

#[derive(Serialize, Debug, PartialEq)]
struct TreeLine {
    depth: usize,
    line: usize,
    kind: &'static str,
    name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attributes: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

fn flatten(doc: &Document) -> Vec<TreeLine> {
    let Some(root) = doc.root() else {
        return Vec::new();
    };
    Descendants::new(root)
        .map(|(depth, node)| {
            let (kind, text) = match node.kind() {
                NodeKind::Element => ("element", None),
                NodeKind::Text => ("text", Some(node.content().trim().to_string())),
                NodeKind::Comment => ("comment", Some(node.content().trim().to_string())),
            };
            TreeLine {
                depth,
                line: node.line(),
                kind,
                name: node.name().to_string(),
                attributes: node
                    .attributes()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                text,
            }
        })
        .collect()
}

fn render(line: &TreeLine) -> String {
    let indent = "  ".repeat(line.depth);
    match (line.kind, &line.text) {
        ("element", _) => {
            let attrs: String = line
                .attributes
                .iter()
                .map(|(k, v)| format!(" {k}=\"{v}\""))
                .collect();
            format!("{indent}<{}{attrs}>", line.name)
        }
        ("comment", Some(text)) => format!("{indent}<!-- {text} -->"),
        (_, Some(text)) => format!("{indent}\"{text}\""),
        (_, None) => indent,
    }
}

/// Load, expand and strip the document the way the catalog sees it.
fn prepare(path: &Path) -> Result<Document> {
    let mut doc = Document::load(path).with_context(|| format!("read {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let includes = doc
        .expand_includes(base)
        .with_context(|| format!("expand includes of {}", path.display()))?;
    let comments = doc.strip_comments();
    info!(includes, comments, "document prepared");
    Ok(doc)
}

pub fn run(path: &Path, json: bool) -> Result<()> {
    let doc = prepare(path)?;
    let lines = flatten(&doc);
    if json {
        return common::print_json(&lines);
    }
    for line in &lines {
        println!("{:>5}  {}", line.line, render(line));
    }
    Ok(())
}
