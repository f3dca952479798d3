use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `content` stays empty until the attribution pass writes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingNode {
    pub key: String,
    pub title: String,
    pub content: String,
    pub children: Vec<HeadingNode>,
}

impl HeadingNode {
    /// Wire form of this node's body (title, content, subsections), in the
    /// numbered or unnumbered shape.
    pub fn to_wire(&self, numbered: bool) -> Value {
        node_body_to_wire(self, numbered)
    }
}

/// Numbered trees travel as JSON objects keyed by heading number, unnumbered
/// trees as JSON arrays. Key order in the object form is the document order
/// and must survive parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingTree {
    pub numbered: bool,
    pub roots: Vec<HeadingNode>,
}

impl HeadingTree {
    pub fn empty(numbered: bool) -> Self {
        Self {
            numbered,
            roots: Vec::new(),
        }
    }

    pub fn from_wire(value: &Value, numbered: bool) -> Result<Self> {
        let roots = nodes_from_wire(value, "")?;
        Ok(Self { numbered, roots })
    }

    pub fn to_wire(&self) -> Value {
        if self.numbered {
            let mut map = Map::new();
            for node in &self.roots {
                map.insert(node.key.clone(), node_body_to_wire(node, true));
            }
            Value::Object(map)
        } else {
            Value::Array(
                self.roots
                    .iter()
                    .map(|node| node_body_to_wire(node, false))
                    .collect(),
            )
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn node(&self, path: &[usize]) -> Option<&HeadingNode> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.roots.get(first)?;
        for &index in rest {
            node = node.children.get(index)?;
        }
        Some(node)
    }

    pub fn node_mut(&mut self, path: &[usize]) -> Option<&mut HeadingNode> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.roots.get_mut(first)?;
        for &index in rest {
            node = node.children.get_mut(index)?;
        }
        Some(node)
    }
}

fn nodes_from_wire(value: &Value, parent_key: &str) -> Result<Vec<HeadingNode>> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, entry)| node_from_wire_body(key.clone(), entry))
            .collect(),
        Value::Array(entries) => entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let key = if parent_key.is_empty() {
                    (index + 1).to_string()
                } else {
                    format!("{}.{}", parent_key, index + 1)
                };
                node_from_wire_body(key, entry)
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        other => bail!("outline tree must be a JSON object or array, got {other}"),
    }
}

fn node_from_wire_body(key: String, entry: &Value) -> Result<HeadingNode> {
    let Some(body) = entry.as_object() else {
        bail!("outline entry '{key}' must be a JSON object");
    };

    let title = body
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let content = body
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let children = match body.get("subsections") {
        Some(subsections) => nodes_from_wire(subsections, &key)?,
        None => Vec::new(),
    };

    Ok(HeadingNode {
        key,
        title,
        content,
        children,
    })
}

fn node_body_to_wire(node: &HeadingNode, numbered: bool) -> Value {
    let subsections = if numbered {
        let mut map = Map::new();
        for child in &node.children {
            map.insert(child.key.clone(), node_body_to_wire(child, true));
        }
        Value::Object(map)
    } else {
        Value::Array(
            node.children
                .iter()
                .map(|child| node_body_to_wire(child, false))
                .collect(),
        )
    };

    let mut body = Map::new();
    body.insert("title".to_string(), Value::String(node.title.clone()));
    body.insert("content".to_string(), Value::String(node.content.clone()));
    body.insert("subsections".to_string(), subsections);
    Value::Object(body)
}

#[derive(Debug, Clone)]
pub struct OutlineResponse {
    pub tree: HeadingTree,
    pub last_toc_page: i64,
    pub stop_heading: Option<String>,
}

impl OutlineResponse {
    /// Substitute used when the oracle payload cannot be parsed.
    pub fn safe_empty() -> Self {
        Self {
            tree: HeadingTree::empty(false),
            last_toc_page: -1,
            stop_heading: None,
        }
    }

    pub fn is_numbered(&self) -> bool {
        self.tree.numbered
    }
}

/// Pages identified as the table of contents, 0-based. `from_toc` is false
/// when the fallback window was used instead of a detected TOC run.
#[derive(Debug, Clone, Serialize)]
pub struct TocPageSet {
    pub pages: Vec<usize>,
    pub from_toc: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionArtifact {
    pub artifact_version: u32,
    pub doc_id: String,
    pub source_pdf: String,
    pub generated_at: String,
    pub from_toc: bool,
    pub toc_pages: Vec<usize>,
    pub is_numbered: bool,
    pub stop_heading: Option<String>,
    pub tree: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolVersions {
    pub pdftotext: String,
    pub pdfseparate: Option<String>,
    pub pdfunite: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractPaths {
    pub cache_root: String,
    pub manifest_dir: String,
    pub db_path: String,
    pub toc_pdf_path: String,
    pub artifact_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractCounts {
    pub page_count: usize,
    pub toc_page_count: usize,
    pub from_toc: bool,
    pub is_numbered: bool,
    pub start_page: usize,
    pub document_line_count: usize,
    pub header_footer_line_count: usize,
    pub headings_total: usize,
    pub headings_matched: usize,
    pub headings_unmatched: usize,
    pub content_char_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub tool_versions: ToolVersions,
    pub paths: ExtractPaths,
    pub counts: ExtractCounts,
    pub warnings: Vec<String>,
}
