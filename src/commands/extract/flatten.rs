use super::*;

/// `path` is the child-index path from the tree roots back to the owning
/// node; the attribution pass uses it for its single content write.
#[derive(Debug, Clone)]
pub struct FlatEntry {
    pub key: String,
    pub title: String,
    pub path: Vec<usize>,
}

/// Pre-order linearization: parent before children, siblings in insertion
/// order. This is the order the document body is assumed to follow.
pub fn flatten_headings(nodes: &[HeadingNode]) -> Vec<FlatEntry> {
    let mut entries = Vec::new();
    let mut path = Vec::new();
    walk(nodes, &mut path, &mut entries);
    entries
}

fn walk(nodes: &[HeadingNode], path: &mut Vec<usize>, entries: &mut Vec<FlatEntry>) {
    for (index, node) in nodes.iter().enumerate() {
        path.push(index);
        entries.push(FlatEntry {
            key: node.key.clone(),
            title: node.title.clone(),
            path: path.clone(),
        });
        walk(&node.children, path, entries);
        path.pop();
    }
}
