//! Shared builders for in-memory vault snapshots

use crate::{
    metadata::MarkerPredicate,
    tree::{Document, Folder, Metadata, TreeNode},
};
use serde_json::Value;

/// Initialize logging for tests
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

pub fn predicate() -> MarkerPredicate {
    MarkerPredicate::new("type", "moc")
}

fn marked() -> Metadata {
    let mut map = Metadata::new();
    map.insert("type".to_string(), Value::String("moc".to_string()));
    map
}

/// A plain document without metadata.
pub fn doc(path: &str) -> TreeNode {
    TreeNode::Document(Document::new(path, None))
}

/// A document marked as index file.
pub fn index(path: &str) -> TreeNode {
    TreeNode::Document(Document::new(path, Some(marked())))
}

pub fn folder(path: &str, children: Vec<TreeNode>) -> TreeNode {
    TreeNode::Folder(Folder {
        path: path.to_string(),
        children,
    })
}

pub fn root(children: Vec<TreeNode>) -> Folder {
    Folder {
        path: String::new(),
        children,
    }
}

/// `Projects/` with an index file, a plain note, and two marked sub-folders.
pub fn projects_vault() -> Folder {
    root(vec![folder(
        "Projects",
        vec![
            folder("Projects/A", vec![index("Projects/A/Index.md")]),
            folder("Projects/B", vec![index("Projects/B/Index.md")]),
            index("Projects/Index.md"),
            doc("Projects/notes.md"),
        ],
    )])
}

pub fn paths<'a>(docs: Option<Vec<&'a Document>>) -> Option<Vec<&'a str>> {
    docs.map(|docs| docs.iter().map(|doc| doc.path.as_str()).collect())
}
