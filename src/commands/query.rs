use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::QueryArgs;
use crate::model::{HeadingNode, HeadingTree, SectionArtifact};

#[derive(Debug, Serialize)]
struct QueryResponse {
    artifact: String,
    doc_id: String,
    matched: bool,
    key: Option<String>,
    title: Option<String>,
    section_key: Option<String>,
    section: Option<Value>,
}

pub fn run(args: QueryArgs) -> Result<()> {
    if args.key.is_none() && args.title.is_none() {
        bail!("either --key or --title is required");
    }

    let raw = fs::read(&args.artifact)
        .with_context(|| format!("failed to read {}", args.artifact.display()))?;
    let artifact: SectionArtifact = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", args.artifact.display()))?;
    let tree = HeadingTree::from_wire(&artifact.tree, artifact.is_numbered).with_context(|| {
        format!(
            "artifact {} carries a malformed tree",
            args.artifact.display()
        )
    })?;

    let found = if let Some(key) = &args.key {
        find_by_key(&tree.roots, key)
    } else {
        args.title
            .as_deref()
            .and_then(|title| find_by_title(&tree.roots, title))
    };

    match found {
        Some(node) => info!(key = %node.key, title = %node.title, "section found"),
        None => warn!("section not found"),
    }

    let response = QueryResponse {
        artifact: args.artifact.display().to_string(),
        doc_id: artifact.doc_id.clone(),
        matched: found.is_some(),
        key: args.key.clone(),
        title: args.title.clone(),
        section_key: found.map(|node| node.key.clone()),
        section: found.map(|node| node.to_wire(artifact.is_numbered)),
    };

    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, &response)
        .context("failed to serialize query output")?;
    writeln!(output)?;
    output.flush()?;

    Ok(())
}

fn find_by_key<'a>(nodes: &'a [HeadingNode], key: &str) -> Option<&'a HeadingNode> {
    for node in nodes {
        if node.key == key {
            return Some(node);
        }
        if let Some(found) = find_by_key(&node.children, key) {
            return Some(found);
        }
    }
    None
}

fn find_by_title<'a>(nodes: &'a [HeadingNode], title: &str) -> Option<&'a HeadingNode> {
    let target = title.trim().to_lowercase();
    for node in nodes {
        if node.title.trim().to_lowercase() == target {
            return Some(node);
        }
        if let Some(found) = find_by_title(&node.children, title) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_tree() -> HeadingTree {
        let wire = json!({
            "1": { "title": "Introduction", "content": "intro text", "subsections": {
                "1.1": { "title": "Scope", "content": "scope text", "subsections": {} }
            }},
            "2": { "title": "Methods", "content": "methods text", "subsections": {
                "2.1": { "title": "Apparatus", "content": "", "subsections": {
                    "2.1.1": { "title": "Calibration", "content": "cal text", "subsections": {} }
                }}
            }}
        });
        HeadingTree::from_wire(&wire, true).unwrap()
    }

    #[test]
    fn find_by_key_descends_to_any_depth() {
        let tree = sample_tree();

        let node = find_by_key(&tree.roots, "2.1.1").unwrap();
        assert_eq!(node.title, "Calibration");
        assert_eq!(node.content, "cal text");

        assert!(find_by_key(&tree.roots, "9.9").is_none());
    }

    #[test]
    fn find_by_title_ignores_case_and_surrounding_whitespace() {
        let tree = sample_tree();

        let node = find_by_title(&tree.roots, "  scope ").unwrap();
        assert_eq!(node.key, "1.1");

        let node = find_by_title(&tree.roots, "METHODS").unwrap();
        assert_eq!(node.key, "2");

        assert!(find_by_title(&tree.roots, "Unknown Section").is_none());
    }
}
